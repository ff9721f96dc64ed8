//! Error types for the session layer.

use rampctl_arbiter::ArbiterError;
use rampctl_protocol::ProtocolError;
use rampctl_transport::TransportError;

/// Errors that can occur while running a host or peer session.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The device directory has no local radio to bind to.
    #[error("no local adapter available")]
    NoLocalAdapter,

    /// The requested device name is not among the paired devices.
    #[error("no paired device named {0:?}")]
    UnknownDevice(String),

    /// `start()` was called on a client with no target selected.
    #[error("no target device selected")]
    NoTargetSelected,

    /// Binding the listening endpoint failed.
    #[error("bind failed: {0}")]
    BindFailed(#[source] TransportError),

    /// Connecting to the host failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] TransportError),

    /// The host refused the connection because it is full.
    #[error("host is at capacity")]
    CapacityExceeded,

    /// The host answered the connection with something other than an
    /// acknowledgement, or closed before sending one.
    #[error("handshake failed: {0}")]
    Handshake(String),

    /// The session is already running.
    #[error("session already started")]
    AlreadyStarted,

    /// The operation needs a live connection.
    #[error("not connected")]
    NotConnected,

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Arbiter(#[from] ArbiterError),
}
