//! Single-writer queue for one signaling connection
//!
//! Every outbound frame goes through one mpsc channel drained by one writer
//! task, so candidate forwarding and request handling never interleave
//! partial writes on the socket.

use std::fmt::Display;

use axum::extract::ws::Message;
use futures::{Sink, SinkExt};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use super::protocol::ServerMessage;

/// Cloneable handle onto a connection's writer queue
#[derive(Clone)]
pub struct Outbound {
    connection_id: String,
    tx: mpsc::UnboundedSender<Message>,
}

impl Outbound {
    /// Start the writer task for `sink`
    ///
    /// The task ends once every `Outbound` clone is dropped or the socket
    /// rejects a write.
    pub fn spawn<S>(sink: S, connection_id: impl Into<String>) -> (Self, JoinHandle<()>)
    where
        S: Sink<Message> + Unpin + Send + 'static,
        S::Error: Display,
    {
        let connection_id = connection_id.into();
        let (tx, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(write_loop(rx, sink, connection_id.clone()));
        (Self { connection_id, tx }, writer)
    }

    /// Queue a protocol message; failures are logged and dropped
    pub fn send(&self, message: &ServerMessage) {
        let json = match serde_json::to_string(message) {
            Ok(json) => json,
            Err(e) => {
                warn!(connection_id = %self.connection_id, "Failed to serialize message: {}", e);
                return;
            }
        };
        trace!(connection_id = %self.connection_id, "Queueing message: {}", json);
        if self.tx.send(Message::Text(json.into())).is_err() {
            debug!(connection_id = %self.connection_id, "Dropping message for closed connection");
        }
    }

    /// Answer a WebSocket ping
    pub fn pong(&self, data: Vec<u8>) {
        if self.tx.send(Message::Pong(data)).is_err() {
            debug!(connection_id = %self.connection_id, "Dropping pong for closed connection");
        }
    }
}

async fn write_loop<S>(mut rx: mpsc::UnboundedReceiver<Message>, mut sink: S, connection_id: String)
where
    S: Sink<Message> + Unpin,
    S::Error: Display,
{
    while let Some(message) = rx.recv().await {
        if let Err(e) = sink.send(message).await {
            debug!(connection_id = %connection_id, "Failed to send message: {}", e);
            return;
        }
    }
    let _ = sink.close().await;
}
