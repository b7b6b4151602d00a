//! Server error types.

use std::io;
use std::net::SocketAddr;

use thiserror::Error;
use trident_protocol::{ConnectionStage, ProtocolError};

/// Errors raised by the encryption lifecycle.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// No key material has been configured for this connection.
    #[error("Encryption keys are not initialized")]
    NotInitialized,

    /// Ciphertext length is not a whole number of RSA blocks.
    #[error("Ciphertext length {len} is not a multiple of the {block}-byte block size")]
    InvalidBlockLength {
        /// Length of the rejected input.
        len: usize,
        /// RSA modulus size in bytes.
        block: usize,
    },

    #[error("RSA error: {0}")]
    Rsa(#[from] rsa::Error),
}

/// Errors that can occur in the connection and task layers.
#[derive(Debug, Error)]
pub enum ServerError {
    /// A codec or registry error.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// An encrypted send was requested before encryption was enabled.
    #[error("Encryption is not enabled on this connection")]
    EncryptionNotEnabled,

    /// Encryption can only be enabled once per connection.
    #[error("Encryption is already enabled on this connection")]
    EncryptionAlreadyEnabled,

    /// A stage change that would move backwards or skip a stage.
    #[error("Illegal stage transition {from:?} -> {to:?}")]
    IllegalStageTransition {
        /// Stage the connection was in.
        from: ConnectionStage,
        /// Requested stage.
        to: ConnectionStage,
    },

    #[error("Crypto failure: {0}")]
    Crypto(#[from] CryptoError),

    /// A live connection already exists for this address.
    #[error("Connection already registered for {0}")]
    AlreadyRegistered(SocketAddr),

    /// The transport was closed before the write.
    #[error("Transport closed")]
    TransportClosed,

    /// The task queue no longer accepts work.
    #[error("Server is shut down")]
    ShutDown,

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias using [`ServerError`].
pub type Result<T> = std::result::Result<T, ServerError>;
