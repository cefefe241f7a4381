//! WebSocket test client speaking the browser side of the protocol
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// A browser connected to `/magicmirror`
pub struct TestClient {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

#[allow(dead_code)]
impl TestClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{}/magicmirror", addr);
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("Failed to connect");
        let (sink, stream) = ws.split();
        Self { sink, stream }
    }

    /// Send raw text message
    pub async fn send_raw(&mut self, msg: &str) {
        self.sink
            .send(Message::Text(msg.to_string().into()))
            .await
            .unwrap();
    }

    pub async fn send_json(&mut self, msg: &Value) {
        self.send_raw(&msg.to_string()).await;
    }

    pub async fn start(&mut self, sdp_offer: &str) {
        self.send_json(&json!({ "id": "start", "sdpOffer": sdp_offer }))
            .await;
    }

    pub async fn stop(&mut self) {
        self.send_json(&json!({ "id": "stop" })).await;
    }

    pub async fn send_candidate(&mut self, candidate: &str) {
        self.send_json(&json!({
            "id": "onIceCandidate",
            "candidate": { "candidate": candidate, "sdpMid": "0", "sdpMLineIndex": 0 }
        }))
        .await;
    }

    /// Receive the next protocol message
    pub async fn recv(&mut self) -> Value {
        self.recv_timeout(Duration::from_secs(2))
            .await
            .expect("Timed out waiting for message")
    }

    /// Receive with timeout, returns None if timeout or close
    pub async fn recv_timeout(&mut self, duration: Duration) -> Option<Value> {
        let next = async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => {
                        return Some(serde_json::from_str(text.as_str()).unwrap());
                    }
                    Some(Ok(Message::Close(_))) | None => return None,
                    Some(Ok(_)) => continue,
                    Some(Err(e)) => panic!("WebSocket error: {}", e),
                }
            }
        };
        tokio::time::timeout(duration, next).await.ok().flatten()
    }

    /// Assert no message received within duration
    pub async fn expect_no_message(&mut self, duration: Duration) {
        if let Some(msg) = self.recv_timeout(duration).await {
            panic!("Expected no message but got: {}", msg);
        }
    }

    /// Wait for the server to close the connection
    pub async fn expect_closed(&mut self, duration: Duration) {
        let closed = async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
                    Some(Ok(_)) => continue,
                }
            }
        };
        tokio::time::timeout(duration, closed)
            .await
            .expect("Server did not close the connection");
    }

    /// Close the connection
    pub async fn close(mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
    }
}
