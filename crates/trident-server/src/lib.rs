//! Server core for Trident.
//!
//! This crate owns the connection registry, the per-connection encryption
//! lifecycle, and the single server thread that executes every
//! state-mutating task in submission order.

pub mod config;
pub mod connection;
pub mod encryption;
pub mod error;
mod handler;
pub mod network;
pub mod registry;
pub mod server;
pub mod tasks;
pub mod transport;
pub mod utils;

pub use config::ServerConfig;
pub use connection::Connection;
pub use encryption::KeyPair;
pub use error::{CryptoError, Result, ServerError};
pub use handler::{PROTOCOL_VERSION, VERSION_NAME};
pub use registry::ConnectionRegistry;
pub use server::Server;
pub use tasks::{BoxError, Task, TaskQueue, TaskResult};
pub use transport::{MemoryTransport, TcpTransport, Transport};
