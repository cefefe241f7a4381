//! Signaling connection handler
//!
//! Each browser connection is served by one task that processes inbound
//! messages in order. A connection is Idle until `start` succeeds in
//! registering a session, Active while the registry holds that session,
//! and Closed once the socket goes away.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::IntoResponse,
};
use futures::StreamExt;
use mirror_core::{FaceOverlayFilter, IceCandidate, MediaError, MirrorSession};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use super::outbound::Outbound;
use super::protocol::{ClientMessage, Inbound, ServerMessage, parse_client_message};
use crate::AppState;

/// WebSocket upgrade handler for `/magicmirror`
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle a signaling connection until it closes
async fn handle_socket(socket: WebSocket, state: Arc<AppState>) {
    let connection_id = Uuid::new_v4().to_string();
    let (sender, mut receiver) = socket.split();
    let (outbound, _writer) = Outbound::spawn(sender, connection_id.clone());
    let shutdown = state.shutdown.clone();
    let handler = SignalingHandler::new(connection_id.clone(), state, outbound.clone());

    info!(connection_id = %connection_id, "Signaling connection opened");

    loop {
        // A message already being handled runs to completion first
        let msg = tokio::select! {
            biased;
            _ = shutdown.cancelled() => {
                debug!(connection_id = %connection_id, "Server shutting down");
                break;
            }
            msg = receiver.next() => msg,
        };
        let Some(msg) = msg else {
            break;
        };

        match msg {
            Ok(Message::Text(text)) => handler.handle_text(&text).await,
            Ok(Message::Close(_)) => {
                debug!(connection_id = %connection_id, "Client sent close frame");
                break;
            }
            Ok(Message::Ping(data)) => outbound.pong(data),
            Ok(_) => {
                // Ignore binary and pong messages
            }
            Err(e) => {
                warn!(connection_id = %connection_id, "WebSocket error: {}", e);
                break;
            }
        }
    }

    handler.release().await;
    info!(connection_id = %connection_id, "Signaling connection closed");
}

/// Per-connection signaling state machine
pub struct SignalingHandler {
    connection_id: String,
    state: Arc<AppState>,
    outbound: Outbound,
}

impl SignalingHandler {
    pub fn new(connection_id: String, state: Arc<AppState>, outbound: Outbound) -> Self {
        Self {
            connection_id,
            state,
            outbound,
        }
    }

    /// Parse and dispatch one inbound text frame
    pub async fn handle_text(&self, text: &str) {
        debug!(connection_id = %self.connection_id, "Incoming message: {}", text);

        match parse_client_message(text) {
            Ok(Inbound::Message(ClientMessage::Start { sdp_offer })) => {
                self.start(&sdp_offer).await;
            }
            Ok(Inbound::Message(ClientMessage::Stop)) => {
                self.release().await;
            }
            Ok(Inbound::Message(ClientMessage::OnIceCandidate { candidate })) => {
                self.on_ice_candidate(candidate).await;
            }
            Ok(Inbound::Unrecognized(id)) => {
                self.protocol_error(format!("Invalid message with id {}", id)).await;
            }
            Err(e) => {
                warn!(connection_id = %self.connection_id, "Rejecting message: {}", e);
                self.protocol_error(e.to_string()).await;
            }
        }
    }

    async fn start(&self, sdp_offer: &str) {
        if self.state.registry.contains(&self.connection_id) {
            warn!(connection_id = %self.connection_id, "Start received while session is active");
            self.protocol_error("Session already started".to_string()).await;
            return;
        }

        match self.try_start(sdp_offer).await {
            Ok(()) => info!(connection_id = %self.connection_id, "Session started"),
            Err(e) => {
                error!(connection_id = %self.connection_id, "Failed to start session: {}", e);
                self.protocol_error(e.to_string()).await;
            }
        }
    }

    /// Build the loopback pipeline and negotiate the offer
    ///
    /// The session is registered as soon as its pipeline and endpoint
    /// exist, so a failure in any later step is cleaned up by release.
    async fn try_start(&self, sdp_offer: &str) -> Result<(), MediaError> {
        let id = self.connection_id.as_str();
        let session = MirrorSession::create(self.state.engine.as_ref(), id).await?;
        let pipeline = session.pipeline().clone();
        let endpoint = session.endpoint();

        if let Some(displaced) = self.state.registry.put(session) {
            error!(connection_id = %id, "Registry already held a session for this connection");
            displaced.release().await;
        }

        let candidates = endpoint.subscribe_ice_candidates().await?;
        let forwarder = tokio::spawn(forward_candidates(candidates, self.outbound.clone()));
        let abort = forwarder.abort_handle();
        if self
            .state
            .registry
            .with_session(id, |session| session.attach_task(abort))
            .is_none()
        {
            forwarder.abort();
            return Err(MediaError::Closed);
        }

        let filter = FaceOverlayFilter::create(&pipeline).await?;
        self.state
            .registry
            .with_session(id, |session| session.set_filter(filter.clone()));
        filter.set_overlayed_image(&self.state.overlay).await?;

        endpoint.connect(&filter).await?;
        filter.connect(&endpoint).await?;

        let sdp_answer = endpoint.process_offer(sdp_offer).await?;
        self.outbound.send(&ServerMessage::StartResponse { sdp_answer });

        endpoint.gather_candidates().await
    }

    async fn on_ice_candidate(&self, candidate: IceCandidate) {
        let Some(endpoint) = self.state.registry.endpoint(&self.connection_id) else {
            debug!(connection_id = %self.connection_id, "Ignoring candidate without a session");
            return;
        };

        if let Err(e) = endpoint.add_ice_candidate(&candidate).await {
            warn!(connection_id = %self.connection_id, "Failed to add ICE candidate: {}", e);
        }
    }

    /// Report a failure to the client, then tear the session down
    async fn protocol_error(&self, message: String) {
        self.outbound.send(&ServerMessage::Error { message });
        self.release().await;
    }

    /// Remove and release this connection's session, if any
    pub async fn release(&self) {
        if self.state.registry.release(&self.connection_id).await {
            info!(connection_id = %self.connection_id, "Session released");
        }
    }
}

/// Forward media server candidates to the browser as they are discovered
async fn forward_candidates(
    mut candidates: mpsc::UnboundedReceiver<IceCandidate>,
    outbound: Outbound,
) {
    while let Some(candidate) = candidates.recv().await {
        outbound.send(&ServerMessage::IceCandidate { candidate });
    }
}
