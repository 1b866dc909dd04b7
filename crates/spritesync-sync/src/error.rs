//! Error types for the sync module.

use thiserror::Error;

use crate::connection::ConnectionState;

/// Errors that can occur during sync operations.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A message could not be encoded or decoded.
    #[error("codec error: {0}")]
    Codec(#[from] spritesync_core::CodecError),

    /// A host document operation failed.
    #[error("host error: {0}")]
    Host(#[from] spritesync_host::HostError),

    /// The connection is not open.
    #[error("not connected")]
    NotConnected,

    /// The connection cannot move between these states.
    #[error("invalid connection transition: {from:?} -> {to:?}")]
    InvalidTransition {
        from: ConnectionState,
        to: ConnectionState,
    },

    /// Transport-level error.
    #[error("transport error: {0}")]
    Transport(String),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
