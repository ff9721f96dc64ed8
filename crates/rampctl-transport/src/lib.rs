//! Transport abstraction layer for rampctl.
//!
//! Provides the [`Transport`] (host side), [`Connector`] (peer side) and
//! [`Connection`] traits that abstract over the point-to-point link between
//! a host device and its peers.
//!
//! Every connection carries *frames*: short UTF-8 text messages of at most
//! [`MAX_FRAME_LEN`] bytes. Stream transports delimit frames with a newline
//! (see [`FrameReader`]); message transports map one frame to one message.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

mod error;
mod framing;
mod stream;
mod tcp;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
pub use framing::{encode_frame, FrameReader};
pub use stream::StreamConnection;
pub use tcp::{TcpConnector, TcpTransport};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConnection, WebSocketConnector, WebSocketTransport};

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};

/// Largest frame payload, in bytes, accepted on any connection.
pub const MAX_FRAME_LEN: usize = 1024;

/// Channel the host listens on unless configured otherwise.
pub const DEFAULT_CHANNEL: u16 = 4;

static NEXT_CONNECTION_ID: AtomicU64 = AtomicU64::new(1);

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Allocates a process-unique id.
    pub fn next() -> Self {
        Self(NEXT_CONNECTION_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// A (device address, channel) pair naming one side of a link.
///
/// The channel is the pre-agreed service slot both sides use; for the
/// IP-based transports in this crate it doubles as the port number.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    pub address: String,
    pub channel: u16,
}

impl Endpoint {
    pub fn new(address: impl Into<String>, channel: u16) -> Self {
        Self {
            address: address.into(),
            channel,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.address, self.channel)
    }
}

/// Binds a local endpoint and accepts incoming connections.
pub trait Transport: Send + Sync + Sized + 'static {
    /// The connection type produced by this transport.
    type Connection: Connection;

    /// Binds to the given local endpoint.
    fn bind(
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self, TransportError>> + Send;

    /// Waits for and accepts the next incoming connection.
    fn accept(
        &mut self,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;

    /// Gracefully shuts down the transport, stopping new connections.
    fn shutdown(
        &self,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the endpoint actually bound (resolves channel 0).
    fn local_endpoint(&self) -> Result<Endpoint, TransportError>;
}

/// Opens outgoing connections to a host.
pub trait Connector: Send + Sync + 'static {
    /// The connection type produced by this connector.
    type Connection: Connection;

    /// Connects to the host listening on `endpoint`.
    fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> impl Future<Output = Result<Self::Connection, TransportError>> + Send;
}

/// A single connection that exchanges frames.
///
/// All methods take `&self` so a connection can be shared (behind an
/// `Arc`) between a reader task and whoever sends on it.
pub trait Connection: Send + Sync + 'static {
    /// Sends one frame to the remote side.
    fn send(
        &self,
        frame: &[u8],
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Receives the next frame from the remote side.
    ///
    /// Returns `Ok(None)` when the connection is closed, either cleanly by
    /// the remote side or locally through [`close`](Self::close). A pending
    /// `recv` is woken by a concurrent `close`.
    fn recv(
        &self,
    ) -> impl Future<Output = Result<Option<Vec<u8>>, TransportError>> + Send;

    /// Closes the connection. Calling it more than once is harmless.
    fn close(&self) -> impl Future<Output = Result<(), TransportError>> + Send;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;
}
