//! Packet trait for serialization and deserialization.
//!
//! A packet is constructed empty (via `Default`) by the registry when its id
//! arrives, populated by [`Packet::decode`], and handled once. Outbound
//! packets are built in code and written with [`Packet::encode`].

use std::fmt;

use bytes::{Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::stage::Direction;

/// A protocol packet.
///
/// Packets implement whichever of `decode`/`encode` matches their direction.
/// The default implementations fail with [`ProtocolError::Unsupported`].
pub trait Packet: fmt::Debug + Send + 'static {
    /// The packet ID, unique within its stage and direction.
    fn id(&self) -> i32;

    /// Which way the packet travels.
    fn direction(&self) -> Direction;

    /// Human-readable variant name, used in logs and errors.
    fn name(&self) -> &'static str;

    /// Populate the packet from a buffer positioned after the packet id.
    ///
    /// # Errors
    ///
    /// Returns an error if the packet data is malformed, or
    /// [`ProtocolError::Unsupported`] if this packet is never decoded.
    fn decode(&mut self, buf: &mut Bytes) -> Result<()> {
        let _ = buf;
        Err(ProtocolError::Unsupported {
            packet: self.name(),
            operation: "decode",
        })
    }

    /// Write the packet body (without the id) to a buffer.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolError::Unsupported`] if this packet is never encoded.
    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        let _ = buf;
        Err(ProtocolError::Unsupported {
            packet: self.name(),
            operation: "encode",
        })
    }
}
