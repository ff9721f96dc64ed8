//! Error types for the arbiter layer.

/// Errors that can occur when talking to the arbiter or the actuator.
///
/// Rejected requests are *not* errors; they come back as
/// [`Verdict::Rejected`](crate::Verdict::Rejected).
#[derive(Debug, thiserror::Error)]
pub enum ArbiterError {
    /// The arbiter task has stopped and can no longer accept commands.
    #[error("arbiter is not running")]
    Unavailable,

    /// Writing a code to the actuator failed.
    #[error("actuator I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The actuator link is gone (peer disconnected, receiver dropped).
    #[error("actuator link closed: {0}")]
    LinkClosed(String),
}
