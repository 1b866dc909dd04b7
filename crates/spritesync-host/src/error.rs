//! Error types for host document access.

use thiserror::Error;

/// Errors a host can report.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The handle refers to a document that has been closed.
    #[error("document handle is stale")]
    StaleDocument,

    /// A named document, file or layer does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// An argument is out of range for the document.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Reading or writing a file failed.
    #[error("I/O error: {0}")]
    Io(String),
}

/// Result type for host operations.
pub type Result<T> = std::result::Result<T, HostError>;
