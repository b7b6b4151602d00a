//! Protocol packets.
//!
//! Packets are organized by connection stage:
//! - Handshake: Initial connection state
//! - Status: Server list ping
//! - Login: Offline-mode login
//! - Play: In-game (only the packets the server core inspects)

pub mod handshake;
pub mod login;
pub mod play;
pub mod status;
pub mod traits;

pub use handshake::{Handshake, NextState};
pub use login::{LoginDisconnect, LoginStart, LoginSuccess, offline_uuid};
pub use play::ClickWindow;
pub use status::{Ping, Pong, StatusRequest, StatusResponse};
pub use traits::Packet;

/// Every packet the server can receive, as resolved by the registry.
#[derive(Debug, Clone)]
pub enum InboundPacket {
    Handshake(Handshake),
    StatusRequest(StatusRequest),
    Ping(Ping),
    LoginStart(LoginStart),
    ClickWindow(ClickWindow),
}

impl InboundPacket {
    /// View the decoded packet through the [`Packet`] trait.
    #[must_use]
    pub fn as_packet(&self) -> &dyn Packet {
        match self {
            Self::Handshake(p) => p,
            Self::StatusRequest(p) => p,
            Self::Ping(p) => p,
            Self::LoginStart(p) => p,
            Self::ClickWindow(p) => p,
        }
    }

    /// Whether handling this packet moves the connection to another stage.
    ///
    /// Readers must not decode the next packet for the connection until a
    /// stage-changing packet has been handled.
    #[must_use]
    pub const fn changes_stage(&self) -> bool {
        matches!(self, Self::Handshake(_) | Self::LoginStart(_))
    }
}

macro_rules! impl_from_inbound {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for InboundPacket {
                fn from(packet: $variant) -> Self {
                    Self::$variant(packet)
                }
            }
        )*
    };
}

impl_from_inbound!(Handshake, StatusRequest, Ping, LoginStart, ClickWindow);
