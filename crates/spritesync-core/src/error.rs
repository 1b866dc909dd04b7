//! Error types for the wire codec.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// The payload ended before a field could be read.
    #[error("unexpected end of payload: needed {needed} bytes, {remaining} remaining")]
    UnexpectedEof { needed: usize, remaining: usize },

    /// The leading tag byte has no message in this direction.
    #[error("unknown message tag {0:#04x}")]
    UnknownTag(u8),

    /// A string field was not valid UTF-8.
    #[error("string field is not valid UTF-8")]
    InvalidUtf8,

    /// A field held a value outside its domain.
    #[error("invalid field: {0}")]
    InvalidField(String),

    /// Bytes were left over after the message was fully decoded.
    #[error("{0} trailing bytes after message")]
    TrailingBytes(usize),

    /// A field does not fit its fixed wire width.
    #[error("field {field} too large for the wire: {len}")]
    FieldTooLarge { field: &'static str, len: usize },
}

/// Result type for codec operations.
pub type Result<T> = std::result::Result<T, CodecError>;
