//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Frames map one-to-one onto text messages, so no newline delimiting is
//! needed on this transport. Useful when peers sit behind something that
//! only forwards HTTP.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::stream::closed_signal;
use crate::{
    Connection, ConnectionId, Connector, Endpoint, Transport, TransportError,
    MAX_FRAME_LEN,
};

/// A WebSocket-based [`Transport`] that listens for incoming peers.
pub struct WebSocketTransport {
    listener: TcpListener,
}

impl Transport for WebSocketTransport {
    type Connection = WebSocketConnection<TcpStream>;

    async fn bind(endpoint: &Endpoint) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind((endpoint.address.as_str(), endpoint.channel))
                .await
                .map_err(|source| TransportError::BindFailed {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
        tracing::info!(%endpoint, "WebSocket transport listening");
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;

        let ws = tokio_tungstenite::accept_async(stream)
            .await
            .map_err(|e| {
                TransportError::AcceptFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let conn = WebSocketConnection::new(ws);
        tracing::debug!(conn_id = %conn.id, %addr, "accepted WebSocket connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        Ok(())
    }

    fn local_endpoint(&self) -> Result<Endpoint, TransportError> {
        let addr = self
            .listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)?;
        Ok(Endpoint::new(addr.ip().to_string(), addr.port()))
    }
}

/// Opens WebSocket connections to `ws://address:channel`.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Connection = WebSocketConnection<MaybeTlsStream<TcpStream>>;

    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Self::Connection, TransportError> {
        let url = format!("ws://{}:{}", endpoint.address, endpoint.channel);
        let (ws, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|e| TransportError::ConnectFailed {
                endpoint: endpoint.to_string(),
                source: std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ),
            })?;
        tracing::debug!(%endpoint, "WebSocket connection established");
        Ok(WebSocketConnection::new(ws))
    }
}

/// A single WebSocket connection.
pub struct WebSocketConnection<S> {
    id: ConnectionId,
    sink: Mutex<SplitSink<WebSocketStream<S>, Message>>,
    stream: Mutex<SplitStream<WebSocketStream<S>>>,
    closed: watch::Sender<bool>,
}

impl<S> WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    fn new(ws: WebSocketStream<S>) -> Self {
        let (sink, stream) = ws.split();
        let (closed, _) = watch::channel(false);
        Self {
            id: ConnectionId::next(),
            sink: Mutex::new(sink),
            stream: Mutex::new(stream),
            closed,
        }
    }

    async fn next_frame(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let mut stream = self.stream.lock().await;
        loop {
            let data: Vec<u8> = match stream.next().await {
                Some(Ok(Message::Text(text))) => text.as_bytes().to_vec(),
                Some(Ok(Message::Binary(data))) => data.into(),
                Some(Ok(Message::Close(_))) | None => return Ok(None),
                Some(Ok(_)) => continue, // skip ping/pong/frame
                Some(Err(e)) => {
                    return Err(TransportError::ReceiveFailed(
                        std::io::Error::new(
                            std::io::ErrorKind::ConnectionReset,
                            e,
                        ),
                    ));
                }
            };
            if data.len() > MAX_FRAME_LEN {
                return Err(TransportError::InvalidFrame(format!(
                    "message of {} bytes exceeds {MAX_FRAME_LEN}",
                    data.len()
                )));
            }
            return Ok(Some(data));
        }
    }
}

impl<S> Connection for WebSocketConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if *self.closed.borrow() {
            return Err(TransportError::ConnectionClosed(format!(
                "{} closed locally",
                self.id
            )));
        }
        if frame.len() > MAX_FRAME_LEN {
            return Err(TransportError::InvalidFrame(format!(
                "frame of {} bytes exceeds {MAX_FRAME_LEN}",
                frame.len()
            )));
        }
        let text = String::from_utf8_lossy(frame).into_owned();
        self.sink
            .lock()
            .await
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| {
                TransportError::SendFailed(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    e,
                ))
            })
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let closed = self.closed.subscribe();
        if *closed.borrow() {
            return Ok(None);
        }
        tokio::select! {
            frame = self.next_frame() => frame,
            _ = closed_signal(closed) => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        let _ = self.sink.lock().await.close().await;
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}
