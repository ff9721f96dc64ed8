/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed, locally or by the remote side.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding the local endpoint failed.
    #[error("bind to {endpoint} failed: {source}")]
    BindFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// Accepting an incoming connection failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// Opening an outgoing connection failed.
    #[error("connect to {endpoint} failed: {source}")]
    ConnectFailed {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    /// A frame exceeded [`MAX_FRAME_LEN`](crate::MAX_FRAME_LEN) or
    /// contained a line terminator.
    #[error("invalid frame: {0}")]
    InvalidFrame(String),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
