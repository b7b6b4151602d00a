//! Per-client connection state.
//!
//! A [`Connection`] is read by network I/O tasks (which decode against its
//! current stage) and written by handler tasks on the server thread. Every
//! mutable field is therefore either atomic or set-once, so a reader on any
//! thread sees a stage change as soon as the setter returns.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, OnceLock};

use bytes::Bytes;
use rsa::{RsaPrivateKey, RsaPublicKey};
use tracing::debug;
use trident_protocol::codec::encode_packet;
use trident_protocol::{ConnectionStage, Packet, WireFormat};

use crate::encryption::KeyPair;
use crate::error::{CryptoError, Result, ServerError};
use crate::transport::Transport;

/// A client connected to the server.
pub struct Connection {
    address: SocketAddr,
    transport: Arc<dyn Transport>,
    wire_format: WireFormat,
    stage: AtomicU8,
    keys: OnceLock<KeyPair>,
}

impl Connection {
    /// Wrap a freshly accepted transport. The connection starts in
    /// [`ConnectionStage::Handshake`] with encryption disabled.
    #[must_use]
    pub fn new(transport: Arc<dyn Transport>, wire_format: WireFormat) -> Self {
        Self {
            address: transport.remote_address(),
            transport,
            wire_format,
            stage: AtomicU8::new(ConnectionStage::Handshake as u8),
            keys: OnceLock::new(),
        }
    }

    /// The remote address, which is also the registry key.
    #[must_use]
    pub const fn address(&self) -> SocketAddr {
        self.address
    }

    /// The current protocol stage.
    #[must_use]
    pub fn stage(&self) -> ConnectionStage {
        // Only valid stages are ever stored.
        ConnectionStage::from_u8(self.stage.load(Ordering::SeqCst)).unwrap_or_default()
    }

    /// Move the connection to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::IllegalStageTransition`] unless `next` is a
    /// legal forward step from the current stage.
    pub fn set_stage(&self, next: ConnectionStage) -> Result<()> {
        self.stage
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                ConnectionStage::from_u8(current)
                    .filter(|stage| stage.can_transition_to(next))
                    .map(|_| next as u8)
            })
            .map_err(|current| ServerError::IllegalStageTransition {
                from: ConnectionStage::from_u8(current).unwrap_or_default(),
                to: next,
            })?;

        debug!(addr = %self.address, stage = ?next, "Stage changed");
        Ok(())
    }

    /// Whether [`Connection::enable_encryption`] has been called.
    #[must_use]
    pub fn is_encryption_enabled(&self) -> bool {
        self.keys.get().is_some()
    }

    /// Install the key pair used for encrypted sends.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::EncryptionAlreadyEnabled`] on a second call.
    pub fn enable_encryption(
        &self,
        public_key: RsaPublicKey,
        private_key: RsaPrivateKey,
    ) -> Result<()> {
        self.keys
            .set(KeyPair::from_parts(public_key, private_key))
            .map_err(|_| ServerError::EncryptionAlreadyEnabled)?;

        debug!(addr = %self.address, "Encryption enabled");
        Ok(())
    }

    /// The public key, once encryption is enabled.
    #[must_use]
    pub fn public_key(&self) -> Option<&RsaPublicKey> {
        self.keys.get().map(KeyPair::public_key)
    }

    /// The private key, once encryption is enabled.
    #[must_use]
    pub fn private_key(&self) -> Option<&RsaPrivateKey> {
        self.keys.get().map(KeyPair::private_key)
    }

    /// Encrypt `data` with this connection's public key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NotInitialized`] before encryption is enabled,
    /// or the cipher's error.
    pub fn encrypt(&self, data: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        self.keys
            .get()
            .ok_or(CryptoError::NotInitialized)?
            .encrypt(data)
    }

    /// Decrypt `data` with this connection's private key.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::NotInitialized`] before encryption is enabled,
    /// or the cipher's error.
    pub fn decrypt(&self, data: &[u8]) -> std::result::Result<Vec<u8>, CryptoError> {
        self.keys
            .get()
            .ok_or(CryptoError::NotInitialized)?
            .decrypt(data)
    }

    /// Encode `packet` and write it to the transport.
    ///
    /// With `encrypted`, the whole frame (id and body) is encrypted before
    /// writing. The transport then receives bare RSA blocks with no outer
    /// length prefix, whatever the wire format; the peer must split them by
    /// key size.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::EncryptionNotEnabled`] if `encrypted` is set
    /// before [`Connection::enable_encryption`], an encode error for packets
    /// that cannot be sent, or [`ServerError::TransportClosed`].
    pub fn send_packet(&self, packet: &dyn Packet, encrypted: bool) -> Result<()> {
        // Read the keys once so a concurrent enable cannot split this send.
        let keys = self.keys.get();
        if encrypted && keys.is_none() {
            return Err(ServerError::EncryptionNotEnabled);
        }

        let frame = encode_packet(packet, self.wire_format)?;
        let frame = match keys {
            Some(keys) if encrypted => Bytes::from(keys.encrypt(&frame)?),
            _ => frame.freeze(),
        };

        self.transport.write(frame)?;

        debug!(
            addr = %self.address,
            packet = packet.name(),
            id = packet.id(),
            encrypted,
            "Sent packet"
        );
        Ok(())
    }

    /// Encode and write `packet` without encryption.
    ///
    /// # Errors
    ///
    /// See [`Connection::send_packet`].
    pub fn send(&self, packet: &dyn Packet) -> Result<()> {
        self.send_packet(packet, false)
    }

    /// Whether the transport has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.transport.is_closed()
    }

    pub(crate) fn close(&self) {
        self.transport.close();
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("address", &self.address)
            .field("stage", &self.stage())
            .field("encrypted", &self.is_encryption_enabled())
            .finish_non_exhaustive()
    }
}
