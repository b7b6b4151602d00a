//! Protocol error types.

use std::io;
use std::string::FromUtf8Error;

use thiserror::Error;

use crate::stage::{ConnectionStage, Direction};

/// Errors that can occur when reading, writing or resolving protocol data.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A `VarInt` was too long or overflowed 32 bits.
    #[error("VarInt too long")]
    VarIntTooLong,

    /// The buffer ran out before a value was complete.
    #[error("Unexpected end of buffer: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof {
        /// Bytes required by the read.
        needed: usize,
        /// Bytes left in the buffer.
        remaining: usize,
    },

    /// A string was not valid UTF-8.
    #[error("Invalid UTF-8: {0}")]
    InvalidUtf8(#[from] FromUtf8Error),

    /// A length prefix was negative.
    #[error("Negative length prefix: {0}")]
    NegativeLength(i32),

    /// A string exceeded the maximum length.
    #[error("String too long: {len} bytes (max {max})")]
    StringTooLong {
        /// The actual length of the string.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// A packet exceeded the maximum length.
    #[error("Packet too long: {len} bytes (max {max})")]
    PacketTooLong {
        /// The actual length of the packet.
        len: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// An invalid next state was received in a handshake.
    #[error("Invalid next state: {0}")]
    InvalidNextState(i32),

    /// No packet is registered for this id in the given stage.
    #[error("Unknown packet 0x{id:02X} ({direction:?}) in stage {stage:?}")]
    UnknownPacket {
        /// Stage the connection was in.
        stage: ConnectionStage,
        /// Direction of travel.
        direction: Direction,
        /// The packet id.
        id: i32,
    },

    /// A packet was asked to encode or decode in a direction it does not travel.
    #[error("{packet} does not support {operation}")]
    Unsupported {
        /// Name of the packet variant.
        packet: &'static str,
        /// The rejected operation (`"encode"` or `"decode"`).
        operation: &'static str,
    },
}

impl ProtocolError {
    /// Whether this error means the bytes on the wire could not be parsed.
    ///
    /// Malformed input is fatal to the decode attempt; the caller usually
    /// closes the connection.
    #[must_use]
    pub const fn is_malformed(&self) -> bool {
        matches!(
            self,
            Self::Io(_)
                | Self::VarIntTooLong
                | Self::UnexpectedEof { .. }
                | Self::InvalidUtf8(_)
                | Self::NegativeLength(_)
                | Self::StringTooLong { .. }
                | Self::PacketTooLong { .. }
                | Self::InvalidNextState(_)
        )
    }

    /// Whether this error is an unregistered packet id, which callers may ignore.
    #[must_use]
    pub const fn is_unknown_packet(&self) -> bool {
        matches!(self, Self::UnknownPacket { .. })
    }
}

/// Result type alias using [`ProtocolError`].
pub type Result<T> = std::result::Result<T, ProtocolError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_classes() {
        assert!(ProtocolError::VarIntTooLong.is_malformed());
        assert!(
            ProtocolError::UnexpectedEof {
                needed: 2,
                remaining: 1
            }
            .is_malformed()
        );

        let unknown = ProtocolError::UnknownPacket {
            stage: ConnectionStage::Play,
            direction: Direction::Inbound,
            id: 0x7F,
        };
        assert!(unknown.is_unknown_packet());
        assert!(!unknown.is_malformed());
        assert_eq!(
            unknown.to_string(),
            "Unknown packet 0x7F (Inbound) in stage Play"
        );

        let unsupported = ProtocolError::Unsupported {
            packet: "Handshake",
            operation: "encode",
        };
        assert!(!unsupported.is_malformed());
        assert!(!unsupported.is_unknown_packet());
    }
}
