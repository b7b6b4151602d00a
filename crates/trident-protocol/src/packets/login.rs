//! Login protocol packets.
//!
//! Only the offline-mode subset is defined: the client announces itself,
//! and the server either accepts it (moving to play) or disconnects it.

use bytes::{Bytes, BytesMut};
use md5::{Digest, Md5};
use uuid::{Builder, Uuid};

use crate::codec::{read_string, write_string};
use crate::error::Result;
use crate::packets::traits::Packet;
use crate::stage::Direction;

/// Maximum username length (16 characters).
const MAX_USERNAME_LENGTH: usize = 16;

/// UUID an offline-mode server assigns to `name`.
///
/// This is a version 3 UUID over the MD5 of `"OfflinePlayer:<name>"`, the
/// same value vanilla servers derive, so player data keyed by UUID carries
/// over between them.
#[must_use]
pub fn offline_uuid(name: &str) -> Uuid {
    let mut hasher = Md5::new();
    hasher.update(b"OfflinePlayer:");
    hasher.update(name.as_bytes());

    let mut digest = [0u8; 16];
    digest.copy_from_slice(&hasher.finalize());
    Builder::from_md5_bytes(digest).into_uuid()
}

// =============================================================================
// LoginStart (Client -> Server, ID: 0x00)
// =============================================================================

/// Login Start packet (client -> server).
///
/// Sent by the client to begin the login process. Protocol 47 carries the
/// username only.
#[derive(Debug, Clone, Default)]
pub struct LoginStart {
    /// The player's username.
    pub name: String,
}

impl Packet for LoginStart {
    fn id(&self) -> i32 {
        0x00
    }

    fn direction(&self) -> Direction {
        Direction::Inbound
    }

    fn name(&self) -> &'static str {
        "LoginStart"
    }

    fn decode(&mut self, buf: &mut Bytes) -> Result<()> {
        self.name = read_string(buf, MAX_USERNAME_LENGTH)?;
        Ok(())
    }
}

// =============================================================================
// LoginSuccess (Server -> Client, ID: 0x02)
// =============================================================================

/// Login Success packet (server -> client).
///
/// Sent when login is complete. Client should transition to Play state.
/// The UUID goes on the wire as a hyphenated string.
#[derive(Debug, Clone, Default)]
pub struct LoginSuccess {
    /// The player's UUID.
    pub uuid: Uuid,
    /// The player's username.
    pub username: String,
}

impl LoginSuccess {
    /// Create a new login success packet.
    #[must_use]
    pub fn new(uuid: Uuid, username: impl Into<String>) -> Self {
        Self {
            uuid,
            username: username.into(),
        }
    }
}

impl Packet for LoginSuccess {
    fn id(&self) -> i32 {
        0x02
    }

    fn direction(&self) -> Direction {
        Direction::Outbound
    }

    fn name(&self) -> &'static str {
        "LoginSuccess"
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        let mut text = Uuid::encode_buffer();
        write_string(buf, self.uuid.hyphenated().encode_lower(&mut text));
        write_string(buf, &self.username);
        Ok(())
    }
}

// =============================================================================
// LoginDisconnect (Server -> Client, ID: 0x00)
// =============================================================================

/// Login Disconnect packet (server -> client).
#[derive(Debug, Clone, Default)]
pub struct LoginDisconnect {
    /// The disconnect reason (JSON chat component).
    pub reason: String,
}

impl LoginDisconnect {
    /// Create a disconnect packet with a JSON chat component.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

impl Packet for LoginDisconnect {
    fn id(&self) -> i32 {
        0x00
    }

    fn direction(&self) -> Direction {
        Direction::Outbound
    }

    fn name(&self) -> &'static str {
        "LoginDisconnect"
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        write_string(buf, &self.reason);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Buf;
    use uuid::{Variant, Version};

    #[test]
    fn test_login_start_decode() {
        let mut buf = BytesMut::new();
        write_string(&mut buf, "Notch");

        let mut bytes = buf.freeze();
        let mut packet = LoginStart::default();
        packet.decode(&mut bytes).unwrap();
        assert_eq!(packet.name, "Notch");
        assert!(!bytes.has_remaining());
    }

    #[test]
    fn test_login_start_truncated_name() {
        let mut buf = BytesMut::new();
        buf.extend_from_slice(&[0x05, b'S', b't']);

        let result = LoginStart::default().decode(&mut buf.freeze());
        assert!(result.unwrap_err().is_malformed());
    }

    #[test]
    fn test_login_success_encode() {
        let uuid = Uuid::from_u128(0x0123_4567_89ab_cdef_0123_4567_89ab_cdef);
        let mut buf = BytesMut::new();
        LoginSuccess::new(uuid, "TestPlayer")
            .encode(&mut buf)
            .unwrap();

        let mut bytes = buf.freeze();
        assert_eq!(
            read_string(&mut bytes, 36).unwrap(),
            "01234567-89ab-cdef-0123-456789abcdef"
        );
        assert_eq!(read_string(&mut bytes, 16).unwrap(), "TestPlayer");
        assert!(!bytes.has_remaining());
    }

    #[test]
    fn test_offline_uuid() {
        let steve = offline_uuid("Steve");
        assert_eq!(steve.get_version(), Some(Version::Md5));
        assert_eq!(steve.get_variant(), Variant::RFC4122);
        assert_eq!(steve, offline_uuid("Steve"));
        assert_ne!(steve, offline_uuid("steve"));
    }

    #[test]
    fn test_login_disconnect_encode() {
        let mut buf = BytesMut::new();
        LoginDisconnect::new(r#"{"text":"You are banned!"}"#)
            .encode(&mut buf)
            .unwrap();

        let reason = read_string(&mut buf.freeze(), 262_144).unwrap();
        assert_eq!(reason, r#"{"text":"You are banned!"}"#);
    }
}
