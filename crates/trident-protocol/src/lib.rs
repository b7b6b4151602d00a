//! Protocol implementation for Trident.
//!
//! This crate provides the wire codec, packet definitions and the
//! stage-aware packet registry used by the server core.

pub mod codec;
pub mod error;
pub mod packets;
pub mod registry;
pub mod stage;
pub mod varint;

pub use codec::{RawPacket, WireFormat};
pub use error::ProtocolError;
pub use packets::{InboundPacket, Packet};
pub use registry::Protocol;
pub use stage::{ConnectionStage, Direction};
