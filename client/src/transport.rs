//! Duplex transport seam for the connection manager.

use async_trait::async_trait;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug)]
pub enum TransportError {
    Connect(String),
    Receive(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connect(e) => write!(f, "Failed to connect: {}", e),
            TransportError::Receive(e) => write!(f, "Receive failed: {}", e),
        }
    }
}

impl std::error::Error for TransportError {}

/// Opens event-stream connections.
#[async_trait]
pub trait Connector: Send + Sync + 'static {
    /// Resolves once the connection is open.
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn EventStream>, TransportError>;
}

/// An open event-stream connection.
#[async_trait]
pub trait EventStream: Send {
    /// Next inbound text frame. `None` once the peer has closed.
    /// Must be cancel-safe.
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>>;

    /// Actively close the connection.
    async fn close(&mut self);
}

/// WebSocket transport over tokio-tungstenite.
#[derive(Debug, Default, Clone, Copy)]
pub struct WsConnector;

#[async_trait]
impl Connector for WsConnector {
    async fn connect(&self, endpoint: &str) -> Result<Box<dyn EventStream>, TransportError> {
        let (inner, _) = tokio_tungstenite::connect_async(endpoint)
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Box::new(WsEventStream { inner }))
    }
}

struct WsEventStream {
    inner: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl EventStream for WsEventStream {
    async fn next_frame(&mut self) -> Option<Result<String, TransportError>> {
        loop {
            match self.inner.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_string())),
                Ok(Message::Close(frame)) => {
                    tracing::debug!(reason = ?frame, "Server closed event stream");
                    return None;
                }
                Ok(Message::Binary(data)) => {
                    tracing::debug!(bytes = data.len(), "Ignoring binary frame");
                }
                // Pings are answered by tungstenite on the next read
                Ok(_) => {}
                Err(e) => return Some(Err(TransportError::Receive(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.inner.close(None).await {
            tracing::debug!(error = %e, "Error while closing event stream");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn test_wss_endpoint_starts_tls_handshake() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let server = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut first = [0u8; 1];
            socket.read_exact(&mut first).await.unwrap();
            first[0]
        });

        let endpoint = crate::config::event_endpoint(&format!("https://{}", addr)).unwrap();
        assert!(endpoint.starts_with("wss://"));
        let result = WsConnector.connect(&endpoint).await;

        // 0x16: TLS handshake record, i.e. the ClientHello
        assert_eq!(server.await.unwrap(), 0x16);
        let err = result.err().expect("peer hung up mid-handshake");
        assert!(
            !err.to_string().contains("TLS support not compiled in"),
            "unexpected error: {}",
            err
        );
    }
}
