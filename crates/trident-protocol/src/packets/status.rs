//! Status protocol packets.
//!
//! The status protocol is used by clients to query server information
//! without joining.

use bytes::{BufMut, Bytes, BytesMut};

use crate::codec::{read_i64, write_string};
use crate::error::Result;
use crate::packets::traits::Packet;
use crate::stage::Direction;

/// Status Request packet (client -> server).
///
/// This is an empty packet that requests server status.
#[derive(Debug, Clone, Default)]
pub struct StatusRequest;

impl Packet for StatusRequest {
    fn id(&self) -> i32 {
        0x00
    }

    fn direction(&self) -> Direction {
        Direction::Inbound
    }

    fn name(&self) -> &'static str {
        "StatusRequest"
    }

    fn decode(&mut self, _buf: &mut Bytes) -> Result<()> {
        Ok(())
    }
}

/// Status Response packet (server -> client).
///
/// Contains a JSON object with server information.
#[derive(Debug, Clone, Default)]
pub struct StatusResponse {
    /// JSON response containing server status.
    pub json: String,
}

impl StatusResponse {
    /// Create a new status response with the given JSON.
    #[must_use]
    pub fn new(json: impl Into<String>) -> Self {
        Self { json: json.into() }
    }
}

impl Packet for StatusResponse {
    fn id(&self) -> i32 {
        0x00
    }

    fn direction(&self) -> Direction {
        Direction::Outbound
    }

    fn name(&self) -> &'static str {
        "StatusResponse"
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        write_string(buf, &self.json);
        Ok(())
    }
}

/// Ping packet (client -> server).
///
/// Client sends a timestamp, server echoes it back.
#[derive(Debug, Clone, Default)]
pub struct Ping {
    /// Arbitrary payload (usually a timestamp).
    pub payload: i64,
}

impl Packet for Ping {
    fn id(&self) -> i32 {
        0x01
    }

    fn direction(&self) -> Direction {
        Direction::Inbound
    }

    fn name(&self) -> &'static str {
        "Ping"
    }

    fn decode(&mut self, buf: &mut Bytes) -> Result<()> {
        self.payload = read_i64(buf)?;
        Ok(())
    }
}

/// Pong packet (server -> client).
///
/// Server echoes back the ping payload.
#[derive(Debug, Clone, Default)]
pub struct Pong {
    /// The payload from the ping packet.
    pub payload: i64,
}

impl Pong {
    /// Create a new pong with the given payload.
    #[must_use]
    pub const fn new(payload: i64) -> Self {
        Self { payload }
    }
}

impl Packet for Pong {
    fn id(&self) -> i32 {
        0x01
    }

    fn direction(&self) -> Direction {
        Direction::Outbound
    }

    fn name(&self) -> &'static str {
        "Pong"
    }

    fn encode(&self, buf: &mut BytesMut) -> Result<()> {
        buf.put_i64(self.payload);
        Ok(())
    }
}
