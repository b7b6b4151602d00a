//! Play protocol packets.

use bytes::Bytes;

use crate::codec::{read_i8, read_i16};
use crate::error::Result;
use crate::packets::traits::Packet;
use crate::stage::Direction;

/// Click Window packet (client -> server).
///
/// Sent when the player clicks a slot in an open inventory window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClickWindow {
    /// The id of the window that was clicked.
    pub window_id: i8,
    /// The clicked slot index.
    pub clicked_slot: i16,
    /// The mouse button used.
    pub clicked_button: i8,
    /// Transaction counter, echoed in the server's confirmation.
    pub action_number: i16,
    /// Inventory operation mode.
    pub mode: i16,
}

impl Packet for ClickWindow {
    fn id(&self) -> i32 {
        0x0E
    }

    fn direction(&self) -> Direction {
        Direction::Inbound
    }

    fn name(&self) -> &'static str {
        "ClickWindow"
    }

    fn decode(&mut self, buf: &mut Bytes) -> Result<()> {
        self.window_id = read_i8(buf)?;
        self.clicked_slot = read_i16(buf)?;
        self.clicked_button = read_i8(buf)?;
        self.action_number = read_i16(buf)?;
        self.mode = read_i16(buf)?;
        Ok(())
    }
}
