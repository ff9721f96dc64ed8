//! TCP transport: the endpoint channel is used as the port number.

use tokio::net::{TcpListener, TcpStream};

use crate::{Connector, Endpoint, StreamConnection, Transport, TransportError};

/// A TCP-based [`Transport`] that listens for incoming peers.
pub struct TcpTransport {
    listener: TcpListener,
}

impl TcpTransport {
    /// Returns the local socket address the listener is bound to.
    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }
}

impl Transport for TcpTransport {
    type Connection = StreamConnection<TcpStream>;

    async fn bind(endpoint: &Endpoint) -> Result<Self, TransportError> {
        let listener =
            TcpListener::bind((endpoint.address.as_str(), endpoint.channel))
                .await
                .map_err(|source| TransportError::BindFailed {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
        tracing::info!(%endpoint, "TCP transport listening");
        Ok(Self { listener })
    }

    async fn accept(&mut self) -> Result<Self::Connection, TransportError> {
        let (stream, addr) = self
            .listener
            .accept()
            .await
            .map_err(TransportError::AcceptFailed)?;
        let _ = stream.set_nodelay(true);

        let conn = StreamConnection::new(stream);
        tracing::debug!(conn_id = %crate::Connection::id(&conn), %addr, "accepted TCP connection");
        Ok(conn)
    }

    async fn shutdown(&self) -> Result<(), TransportError> {
        // The socket closes when the transport is dropped.
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

/// Opens TCP connections to a host.
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpConnector;

impl Connector for TcpConnector {
    type Connection = StreamConnection<TcpStream>;

    async fn connect(
        &self,
        endpoint: &Endpoint,
    ) -> Result<Self::Connection, TransportError> {
        let stream =
            TcpStream::connect((endpoint.address.as_str(), endpoint.channel))
                .await
                .map_err(|source| TransportError::ConnectFailed {
                    endpoint: endpoint.to_string(),
                    source,
                })?;
        let _ = stream.set_nodelay(true);
        tracing::debug!(%endpoint, "TCP connection established");
        Ok(StreamConnection::new(stream))
    }
}
