//! Loopback WebSocket server used by unit tests.

// ============================================================================
// Imports
// ============================================================================

use futures_util::{SinkExt, StreamExt};
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::HeaderMap;
use tokio_tungstenite::{WebSocketStream, accept_hdr_async};

// ============================================================================
// MockServer
// ============================================================================

/// A server bound to a random localhost port, accepting one connection.
pub(crate) struct MockServer {
    /// `ws://127.0.0.1:{port}`
    pub url: String,
    accept: JoinHandle<ServerConn>,
}

impl MockServer {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("local addr").port();

        let accept = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.expect("accept");
            let mut headers = HeaderMap::new();
            let mut uri = String::new();
            let callback = |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
                headers = request.headers().clone();
                uri = request.uri().to_string();
                Ok(response)
            };
            let ws = accept_hdr_async(stream, callback).await.expect("upgrade");

            ServerConn { ws, headers, uri }
        });

        Self {
            url: format!("ws://127.0.0.1:{port}"),
            accept,
        }
    }

    /// Waits for the client to finish the handshake.
    pub async fn accept(self) -> ServerConn {
        self.accept.await.expect("accept task")
    }
}

// ============================================================================
// ServerConn
// ============================================================================

/// Server side of an accepted connection.
pub(crate) struct ServerConn {
    pub ws: WebSocketStream<TcpStream>,
    /// Handshake request headers.
    pub headers: HeaderMap,
    /// Handshake request path and query.
    pub uri: String,
}

impl ServerConn {
    /// Reads the next text frame as JSON.
    pub async fn recv_json(&mut self) -> Value {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => {
                    return serde_json::from_str(&text).expect("json frame");
                }
                Some(Ok(_)) => continue,
                other => panic!("connection ended: {other:?}"),
            }
        }
    }

    pub async fn send_json(&mut self, value: Value) {
        self.send_text(&value.to_string()).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.ws
            .send(Message::Text(text.to_owned().into()))
            .await
            .expect("send frame");
    }
}
