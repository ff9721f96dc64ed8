//! Error types for the protocol layer.

/// Errors that can occur while encoding or decoding frames.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// The frame bytes were not valid UTF-8.
    #[error("frame is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    /// The frame was empty after trimming whitespace.
    #[error("empty frame")]
    EmptyFrame,

    /// The frame is syntactically valid text but cannot be used, e.g. an
    /// action code that collides with a reserved control literal.
    #[error("invalid message: {0}")]
    InvalidMessage(String),
}
