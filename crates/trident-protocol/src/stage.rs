//! Connection stages and packet directions.

/// The protocol phase a connection is in.
///
/// Stages only move forward: `Handshake -> Status`, or
/// `Handshake -> Login -> Play`. `Status` and `Play` are terminal.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum ConnectionStage {
    /// Handshaking state (initial connection).
    #[default]
    Handshake = 0,
    /// Status state (server list ping).
    Status = 1,
    /// Login state (authentication).
    Login = 2,
    /// Play state (in-game).
    Play = 3,
}

impl ConnectionStage {
    /// Whether a connection in this stage may move to `next`.
    #[must_use]
    pub const fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Handshake, Self::Status | Self::Login) | (Self::Login, Self::Play)
        )
    }

    /// Inverse of `stage as u8`.
    #[must_use]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Handshake),
            1 => Some(Self::Status),
            2 => Some(Self::Login),
            3 => Some(Self::Play),
            _ => None,
        }
    }
}

/// Direction a packet travels, seen from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Client to server.
    Inbound,
    /// Server to client.
    Outbound,
}
