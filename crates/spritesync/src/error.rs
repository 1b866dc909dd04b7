//! Error types for sync sessions.

use spritesync_sync::SyncError;
use thiserror::Error;

/// Errors that can occur while starting, running or stopping a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Sync error.
    #[error("sync error: {0}")]
    Sync(#[from] SyncError),

    /// A session is already running.
    #[error("a sync session is already running")]
    AlreadyRunning,

    /// No session is running.
    #[error("no sync session is running")]
    NotRunning,

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
