//! Unified error type for the rampctl stack.

use std::path::PathBuf;

use rampctl_arbiter::ArbiterError;
use rampctl_protocol::ProtocolError;
use rampctl_session::SessionError;
use rampctl_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// Using the `rampctl` crate you deal with this one type; `?` converts
/// the layer errors through the `#[from]` impls.
#[derive(Debug, thiserror::Error)]
pub enum RampctlError {
    /// A transport-level error (bind, connect, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (bad frame or action code).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// The arbiter task is gone or its actuator link failed.
    #[error(transparent)]
    Arbiter(#[from] ArbiterError),

    /// A session-level error (adapter, handshake, capacity).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// The config file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    ConfigIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The config file is not valid JSON for [`RampConfig`](crate::RampConfig).
    #[error("failed to parse config: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("unknown calibration preset {0:?}")]
    UnknownPreset(String),
}
