//! A [`Connection`] over any async byte stream, framed by newlines.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::{watch, Mutex};

use crate::framing::{encode_frame, FrameReader};
use crate::{Connection, ConnectionId, TransportError};

/// Newline-framed connection over a duplex byte stream.
///
/// The stream is split so that a reader task blocked in [`recv`] never
/// holds up a concurrent [`send`]. A watch flag records local closure;
/// a pending `recv` observes it and returns `Ok(None)`.
///
/// [`recv`]: Connection::recv
/// [`send`]: Connection::send
pub struct StreamConnection<S> {
    id: ConnectionId,
    reader: Mutex<FrameReader<ReadHalf<S>>>,
    writer: Mutex<WriteHalf<S>>,
    closed: watch::Sender<bool>,
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    pub fn new(stream: S) -> Self {
        let (read, write) = tokio::io::split(stream);
        let (closed, _) = watch::channel(false);
        Self {
            id: ConnectionId::next(),
            reader: Mutex::new(FrameReader::new(read)),
            writer: Mutex::new(write),
            closed,
        }
    }

    /// Whether [`close`](Connection::close) has been called.
    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }
}

impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    async fn send(&self, frame: &[u8]) -> Result<(), TransportError> {
        if self.is_closed() {
            return Err(TransportError::ConnectionClosed(format!(
                "{} closed locally",
                self.id
            )));
        }
        let bytes = encode_frame(frame)?;
        let mut writer = self.writer.lock().await;
        writer
            .write_all(&bytes)
            .await
            .map_err(TransportError::SendFailed)?;
        writer.flush().await.map_err(TransportError::SendFailed)
    }

    async fn recv(&self) -> Result<Option<Vec<u8>>, TransportError> {
        let closed = self.closed.subscribe();
        if *closed.borrow() {
            return Ok(None);
        }
        let mut reader = self.reader.lock().await;
        tokio::select! {
            frame = reader.next_frame() => frame,
            _ = closed_signal(closed) => Ok(None),
        }
    }

    async fn close(&self) -> Result<(), TransportError> {
        if self.closed.send_replace(true) {
            return Ok(());
        }
        tracing::debug!(conn_id = %self.id, "closing stream connection");
        let mut writer = self.writer.lock().await;
        // The remote side may already be gone.
        let _ = writer.shutdown().await;
        Ok(())
    }

    fn id(&self) -> ConnectionId {
        self.id
    }
}

/// Resolves once the watched close flag turns `true`.
pub(crate) async fn closed_signal(mut rx: watch::Receiver<bool>) {
    while !*rx.borrow_and_update() {
        if rx.changed().await.is_err() {
            // Sender dropped with the connection; nothing left to wait for.
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use super::*;

    fn pair() -> (
        StreamConnection<tokio::io::DuplexStream>,
        StreamConnection<tokio::io::DuplexStream>,
    ) {
        let (a, b) = tokio::io::duplex(4096);
        (StreamConnection::new(a), StreamConnection::new(b))
    }

    #[tokio::test]
    async fn test_send_recv_roundtrip() {
        let (host, peer) = pair();
        host.send(b"Connected").await.unwrap();
        peer.send(b"rs1").await.unwrap();

        assert_eq!(peer.recv().await.unwrap().unwrap(), b"Connected");
        assert_eq!(host.recv().await.unwrap().unwrap(), b"rs1");
    }

    #[tokio::test]
    async fn test_ids_differ_per_connection() {
        let (host, peer) = pair();
        assert_ne!(host.id(), peer.id());
    }

    #[tokio::test]
    async fn test_close_unblocks_pending_recv() {
        let (host, _peer) = pair();
        let host = Arc::new(host);

        let reader = {
            let host = Arc::clone(&host);
            tokio::spawn(async move { host.recv().await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        host.close().await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(1), reader)
            .await
            .expect("recv should wake on close")
            .unwrap();
        assert!(matches!(result, Ok(None)));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_send() {
        let (host, _peer) = pair();
        host.close().await.unwrap();
        host.close().await.unwrap();
        assert!(host.is_closed());
        assert!(matches!(
            host.send(b"rs0").await,
            Err(TransportError::ConnectionClosed(_))
        ));
    }

    #[tokio::test]
    async fn test_remote_close_yields_none() {
        let (host, peer) = pair();
        peer.close().await.unwrap();
        drop(peer);
        assert!(host.recv().await.unwrap().is_none());
    }
}
