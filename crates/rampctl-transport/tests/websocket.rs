//! Integration tests for the WebSocket transport.

#[cfg(feature = "websocket")]
mod websocket {
    use rampctl_transport::{
        Connection, Connector, Endpoint, Transport, WebSocketConnector,
        WebSocketTransport,
    };

    #[tokio::test]
    async fn test_websocket_frame_per_message() {
        let mut transport =
            WebSocketTransport::bind(&Endpoint::new("127.0.0.1", 0))
                .await
                .expect("should bind");
        let endpoint = transport.local_endpoint().unwrap();

        let server =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let client = WebSocketConnector
            .connect(&endpoint)
            .await
            .expect("should connect");
        let host_side = server.await.unwrap();

        host_side.send(b"Connected").await.unwrap();
        assert_eq!(client.recv().await.unwrap().unwrap(), b"Connected");

        client.send(b"es0").await.unwrap();
        assert_eq!(host_side.recv().await.unwrap().unwrap(), b"es0");
    }

    #[tokio::test]
    async fn test_websocket_close_ends_remote_recv() {
        let mut transport =
            WebSocketTransport::bind(&Endpoint::new("127.0.0.1", 0))
                .await
                .unwrap();
        let endpoint = transport.local_endpoint().unwrap();

        let server =
            tokio::spawn(async move { transport.accept().await.unwrap() });
        let client = WebSocketConnector.connect(&endpoint).await.unwrap();
        let host_side = server.await.unwrap();

        client.close().await.unwrap();
        assert!(host_side.recv().await.unwrap().is_none());
        assert!(client.recv().await.unwrap().is_none());
    }
}
