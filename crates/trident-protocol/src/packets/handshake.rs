//! Handshake packet definitions.
//!
//! The handshake is the first packet sent by the client and determines
//! whether this is a status ping or a login attempt.

use bytes::Bytes;

use crate::codec::{read_string, read_u16, read_varint_from_buf};
use crate::error::{ProtocolError, Result};
use crate::packets::traits::Packet;
use crate::stage::{ConnectionStage, Direction};

/// Handshake packet ID.
pub const PACKET_ID: i32 = 0x00;

/// Maximum server address length.
const MAX_SERVER_ADDRESS: usize = 255;

/// The next state after handshake.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum NextState {
    /// Status request (server list ping).
    #[default]
    Status = 1,
    /// Login request.
    Login = 2,
}

impl NextState {
    /// The stage a connection enters after this handshake.
    #[must_use]
    pub const fn stage(self) -> ConnectionStage {
        match self {
            Self::Status => ConnectionStage::Status,
            Self::Login => ConnectionStage::Login,
        }
    }
}

impl TryFrom<i32> for NextState {
    type Error = ProtocolError;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(Self::Status),
            2 => Ok(Self::Login),
            _ => Err(ProtocolError::InvalidNextState(value)),
        }
    }
}

/// Handshake packet sent by the client.
///
/// This is always the first packet in a connection and is never sent by
/// the server, so encoding it is unsupported.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Handshake {
    /// The protocol version the client is using.
    pub protocol_version: i32,
    /// The server address the client connected to.
    pub server_address: String,
    /// The server port the client connected to.
    pub server_port: u16,
    /// The next state: Status (1) or Login (2).
    pub next_state: NextState,
}

impl Packet for Handshake {
    fn id(&self) -> i32 {
        PACKET_ID
    }

    fn direction(&self) -> Direction {
        Direction::Inbound
    }

    fn name(&self) -> &'static str {
        "Handshake"
    }

    fn decode(&mut self, buf: &mut Bytes) -> Result<()> {
        self.protocol_version = read_varint_from_buf(buf)?;
        self.server_address = read_string(buf, MAX_SERVER_ADDRESS)?;
        self.server_port = read_u16(buf)?;
        self.next_state = NextState::try_from(read_varint_from_buf(buf)?)?;
        Ok(())
    }
}
