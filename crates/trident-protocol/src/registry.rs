//! Packet registry keyed by connection stage.
//!
//! The registry decides which packet ids are legal in which stage. It is
//! built once at startup and only read afterwards, so it can be shared
//! behind an `Arc` without locking.

use std::collections::{HashMap, HashSet};
use std::fmt;

use bytes::Bytes;

use crate::codec::RawPacket;
use crate::error::{ProtocolError, Result};
use crate::packets::{
    ClickWindow, Handshake, InboundPacket, LoginDisconnect, LoginStart, LoginSuccess, Packet,
    Ping, Pong, StatusRequest, StatusResponse,
};
use crate::stage::{ConnectionStage, Direction};

/// Constructs an empty packet and decodes its body.
type Decoder = fn(&mut Bytes) -> Result<InboundPacket>;

fn decode_as<P>(buf: &mut Bytes) -> Result<InboundPacket>
where
    P: Packet + Default + Into<InboundPacket>,
{
    let mut packet = P::default();
    packet.decode(buf)?;
    Ok(packet.into())
}

/// Maps `(stage, id)` to packet variants for both directions.
#[derive(Default)]
pub struct Protocol {
    inbound: HashMap<(ConnectionStage, i32), Decoder>,
    outbound: HashSet<(ConnectionStage, i32)>,
}

impl fmt::Debug for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Protocol")
            .field("inbound", &self.inbound.keys().collect::<Vec<_>>())
            .field("outbound", &self.outbound)
            .finish()
    }
}

impl Protocol {
    /// Registry with every packet this server understands.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
            .with_inbound::<Handshake>(ConnectionStage::Handshake)
            .with_inbound::<StatusRequest>(ConnectionStage::Status)
            .with_inbound::<Ping>(ConnectionStage::Status)
            .with_outbound::<StatusResponse>(ConnectionStage::Status)
            .with_outbound::<Pong>(ConnectionStage::Status)
            .with_inbound::<LoginStart>(ConnectionStage::Login)
            .with_outbound::<LoginDisconnect>(ConnectionStage::Login)
            .with_outbound::<LoginSuccess>(ConnectionStage::Login)
            .with_inbound::<ClickWindow>(ConnectionStage::Play)
    }

    /// Register a client-to-server packet in `stage`.
    ///
    /// # Panics
    ///
    /// Panics if another inbound packet already uses the same id in `stage`.
    #[must_use]
    pub fn with_inbound<P>(mut self, stage: ConnectionStage) -> Self
    where
        P: Packet + Default + Into<InboundPacket>,
    {
        let id = P::default().id();
        let previous = self.inbound.insert((stage, id), decode_as::<P>);
        assert!(
            previous.is_none(),
            "duplicate inbound packet 0x{id:02X} in {stage:?}"
        );
        self
    }

    /// Register a server-to-client packet in `stage`.
    ///
    /// # Panics
    ///
    /// Panics if another outbound packet already uses the same id in `stage`.
    #[must_use]
    pub fn with_outbound<P>(mut self, stage: ConnectionStage) -> Self
    where
        P: Packet + Default,
    {
        let id = P::default().id();
        assert!(
            self.outbound.insert((stage, id)),
            "duplicate outbound packet 0x{id:02X} in {stage:?}"
        );
        self
    }

    /// Whether `id` is legal in `stage` for the given direction.
    #[must_use]
    pub fn is_registered(&self, stage: ConnectionStage, direction: Direction, id: i32) -> bool {
        match direction {
            Direction::Inbound => self.inbound.contains_key(&(stage, id)),
            Direction::Outbound => self.outbound.contains(&(stage, id)),
        }
    }

    /// Resolve and decode an inbound packet against the connection's stage.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::UnknownPacket`] if the id is not registered
    /// for `stage`, or a malformed-input error if the body does not parse.
    pub fn decode(&self, stage: ConnectionStage, raw: RawPacket) -> Result<InboundPacket> {
        let Some(decoder) = self.inbound.get(&(stage, raw.id)) else {
            return Err(ProtocolError::UnknownPacket {
                stage,
                direction: Direction::Inbound,
                id: raw.id,
            });
        };

        let mut payload = raw.payload;
        decoder(&mut payload)
    }

    /// Decode `[VarInt id][body]` against the connection's stage.
    ///
    /// # Errors
    ///
    /// See [`Protocol::decode`].
    pub fn decode_bytes(&self, stage: ConnectionStage, data: Bytes) -> Result<InboundPacket> {
        self.decode(stage, RawPacket::parse(data)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::packets::NextState;

    #[test]
    fn test_decode_handshake_example() {
        let protocol = Protocol::new();
        let data = Bytes::from_static(&[
            0x00, 0x00, 0x09, 0x6c, 0x6f, 0x63, 0x61, 0x6c, 0x68, 0x6f, 0x73, 0x74, 0x63, 0xdd,
            0x01,
        ]);

        let packet = protocol
            .decode_bytes(ConnectionStage::Handshake, data)
            .unwrap();

        let InboundPacket::Handshake(handshake) = packet else {
            panic!("expected handshake, got {packet:?}");
        };
        assert_eq!(handshake.protocol_version, 0);
        assert_eq!(handshake.server_address, "localhost");
        assert_eq!(handshake.server_port, 25565);
        assert_eq!(handshake.next_state, NextState::Status);
    }

    #[test]
    fn test_play_packet_rejected_during_handshake() {
        let protocol = Protocol::new();
        let raw = RawPacket::new(0x0E, Bytes::from_static(&[1, 0, 36, 1, 0, 7, 0, 0]));

        let result = protocol.decode(ConnectionStage::Handshake, raw.clone());
        assert!(matches!(
            result,
            Err(ProtocolError::UnknownPacket {
                stage: ConnectionStage::Handshake,
                direction: Direction::Inbound,
                id: 0x0E
            })
        ));

        let packet = protocol.decode(ConnectionStage::Play, raw).unwrap();
        assert!(matches!(packet, InboundPacket::ClickWindow(_)));
    }

    #[test]
    fn test_same_id_resolves_per_stage() {
        let protocol = Protocol::new();

        let packet = protocol
            .decode(ConnectionStage::Status, RawPacket::new(0x00, Bytes::new()))
            .unwrap();
        assert!(matches!(packet, InboundPacket::StatusRequest(_)));

        let result =
            protocol.decode(ConnectionStage::Handshake, RawPacket::new(0x00, Bytes::new()));
        assert!(result.unwrap_err().is_malformed());
    }

    #[test]
    fn test_is_registered() {
        let protocol = Protocol::new();

        assert!(protocol.is_registered(ConnectionStage::Status, Direction::Outbound, 0x01));
        assert!(protocol.is_registered(ConnectionStage::Status, Direction::Inbound, 0x01));
        assert!(protocol.is_registered(ConnectionStage::Login, Direction::Outbound, 0x02));
        assert!(!protocol.is_registered(ConnectionStage::Login, Direction::Inbound, 0x02));
        assert!(!protocol.is_registered(ConnectionStage::Play, Direction::Outbound, 0x0E));
    }

    #[test]
    fn test_stage_changing_packets() {
        assert!(InboundPacket::Handshake(Handshake::default()).changes_stage());
        assert!(InboundPacket::LoginStart(LoginStart::default()).changes_stage());
        assert!(!InboundPacket::Ping(Ping::default()).changes_stage());
    }

    #[test]
    #[should_panic(expected = "duplicate inbound packet")]
    fn test_duplicate_registration_panics() {
        let _ = Protocol::default()
            .with_inbound::<StatusRequest>(ConnectionStage::Status)
            .with_inbound::<StatusRequest>(ConnectionStage::Status);
    }
}
