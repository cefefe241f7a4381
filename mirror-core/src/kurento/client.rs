//! Kurento media server client
//!
//! One [`KurentoClient`] owns one WebSocket to the media server. Requests are
//! correlated with their responses by id, and `onEvent` notifications are
//! routed to the subscriber registered for the event's source object.
//!
//! ```text
//! request() ──► outgoing mpsc ──► write task ──► WebSocket
//!     ▲                                             │
//!     └── oneshot ◄── pending map ◄── read task ◄───┘
//!                                        │
//!                  subscriptions ◄───────┘ (onEvent)
//! ```

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::{Map, Value};
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::{self, Message};
use tracing::{debug, info, trace, warn};

use super::config::KurentoConfig;
use super::protocol::{
    EventParams, Incoming, JsonRpcRequest, RawMessage, candidate_arg, create_params, events,
    invoke_params, methods, overlay_args, ping_params, release_params, subscribe_params,
};
use crate::error::MediaError;
use crate::media::{IceCandidate, MediaClient, MediaEngine, ObjectId, OverlayImage};

type PendingMap = HashMap<u64, oneshot::Sender<Result<Value, MediaError>>>;

/// State shared between the client and its read task
#[derive(Default)]
struct Shared {
    /// Requests awaiting a response, by request id
    pending: Mutex<PendingMap>,
    /// Candidate subscribers, by source endpoint
    subscriptions: Mutex<HashMap<ObjectId, mpsc::UnboundedSender<IceCandidate>>>,
    /// Media server session, learned from the first response
    session_id: Mutex<Option<String>>,
    next_id: AtomicU64,
    closed: AtomicBool,
}

impl Shared {
    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    async fn with_session_id(&self, mut params: Map<String, Value>) -> Value {
        if let Some(session_id) = self.session_id.lock().await.as_ref() {
            params.insert("sessionId".to_string(), Value::from(session_id.as_str()));
        }
        Value::Object(params)
    }

    /// Handle one text frame from the media server
    async fn dispatch(&self, text: &str) {
        let raw: RawMessage = match serde_json::from_str(text) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Ignoring malformed media server message: {}", e);
                return;
            }
        };

        match raw.classify() {
            Some(Incoming::Response { id, result }) => {
                if let Some(session_id) = result.get("sessionId").and_then(Value::as_str) {
                    let mut current = self.session_id.lock().await;
                    if current.as_deref() != Some(session_id) {
                        debug!(session_id, "Media server session established");
                        *current = Some(session_id.to_string());
                    }
                }
                self.complete(id, Ok(result)).await;
            }
            Some(Incoming::Error {
                id: Some(id),
                error,
            }) => {
                let error = MediaError::Rpc {
                    code: error.code,
                    message: error.message,
                };
                self.complete(id, Err(error)).await;
            }
            Some(Incoming::Error { id: None, error }) => {
                warn!(
                    code = error.code,
                    "Media server reported an error without request id: {}", error.message
                );
            }
            Some(Incoming::Notification { method, params }) if method == methods::ON_EVENT => {
                self.route_event(params).await;
            }
            Some(Incoming::Notification { method, .. }) => {
                debug!("Ignoring media server notification {}", method);
            }
            None => trace!("Ignoring media server message: {}", text),
        }
    }

    async fn complete(&self, id: u64, result: Result<Value, MediaError>) {
        match self.pending.lock().await.remove(&id) {
            Some(tx) => {
                let _ = tx.send(result);
            }
            // Keepalive pings and timed-out requests end up here
            None => trace!(id, "Response for request nobody is waiting on"),
        }
    }

    async fn route_event(&self, params: Value) {
        let event: EventParams = match serde_json::from_value(params) {
            Ok(event) => event,
            Err(e) => {
                warn!("Ignoring malformed media server event: {}", e);
                return;
            }
        };

        let Some(candidate) = event.value.ice_candidate() else {
            trace!(kind = %event.value.kind, object = %event.value.object, "Ignoring event");
            return;
        };

        let subscriptions = self.subscriptions.lock().await;
        match subscriptions.get(&event.value.object) {
            Some(tx) => {
                let _ = tx.send(candidate);
            }
            None => debug!(object = %event.value.object, "Candidate for unsubscribed object"),
        }
    }

    /// Fail every pending request and close every subscription
    async fn shutdown(&self) {
        self.closed.store(true, Ordering::SeqCst);
        for (_, tx) in self.pending.lock().await.drain() {
            let _ = tx.send(Err(MediaError::Closed));
        }
        self.subscriptions.lock().await.clear();
    }
}

/// JSON-RPC client for one media server connection
pub struct KurentoClient {
    url: String,
    shared: Arc<Shared>,
    outgoing: mpsc::UnboundedSender<Message>,
    request_timeout: Duration,
    destroyed: AtomicBool,
    /// Read and keepalive tasks, aborted on destroy
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl KurentoClient {
    /// Open a WebSocket to the media server and verify it answers a ping
    pub async fn connect(config: &KurentoConfig) -> Result<Self, MediaError> {
        config.validate()?;

        let handshake = connect_async(config.url.as_str());
        let (ws_stream, _response) = tokio::time::timeout(config.request_timeout(), handshake)
            .await
            .map_err(|_| MediaError::Timeout {
                method: "connect".to_string(),
            })?
            .map_err(|e| MediaError::Connect {
                url: config.url.clone(),
                reason: e.to_string(),
            })?;
        let (ws_sender, ws_receiver) = ws_stream.split();

        let shared = Arc::new(Shared::default());
        let (outgoing, outgoing_rx) = mpsc::unbounded_channel();

        // The write task ends on its own after sending the close frame
        tokio::spawn(write_loop(outgoing_rx, ws_sender));
        let reader = tokio::spawn(read_loop(ws_receiver, Arc::clone(&shared)));
        let keepalive = tokio::spawn(keepalive_loop(
            Arc::clone(&shared),
            outgoing.clone(),
            config.keepalive_interval(),
        ));

        let client = Self {
            url: config.url.clone(),
            shared,
            outgoing,
            request_timeout: config.request_timeout(),
            destroyed: AtomicBool::new(false),
            tasks: Mutex::new(vec![reader, keepalive]),
        };

        if let Err(e) = client.ping(config.keepalive_interval_ms).await {
            client.destroy().await;
            return Err(e);
        }

        info!(url = %client.url, "Connected to media server");
        Ok(client)
    }

    /// Media server session id, once the server has assigned one
    pub async fn session_id(&self) -> Option<String> {
        self.shared.session_id.lock().await.clone()
    }

    async fn ping(&self, interval_ms: u64) -> Result<(), MediaError> {
        let result = self.request(methods::PING, ping_params(interval_ms)).await?;
        match result.get("value").and_then(Value::as_str) {
            Some("pong") => Ok(()),
            _ => Err(MediaError::UnexpectedResponse {
                method: methods::PING.to_string(),
                detail: result.to_string(),
            }),
        }
    }

    /// Send a request and wait for its result
    async fn request(&self, method: &str, params: Map<String, Value>) -> Result<Value, MediaError> {
        if self.destroyed.load(Ordering::SeqCst) || self.shared.is_closed() {
            return Err(MediaError::Closed);
        }

        let id = self.shared.next_id();
        let params = self.shared.with_session_id(params).await;
        let text = serde_json::to_string(&JsonRpcRequest::new(method, params, Some(id)))?;

        let (tx, rx) = oneshot::channel();
        self.shared.pending.lock().await.insert(id, tx);
        if self.shared.is_closed() {
            self.shared.pending.lock().await.remove(&id);
            return Err(MediaError::Closed);
        }

        trace!(id, method, "Sending media server request");
        if self.outgoing.send(Message::Text(text.into())).is_err() {
            self.shared.pending.lock().await.remove(&id);
            return Err(MediaError::Closed);
        }

        match tokio::time::timeout(self.request_timeout, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(MediaError::Closed),
            Err(_) => {
                self.shared.pending.lock().await.remove(&id);
                Err(MediaError::Timeout {
                    method: method.to_string(),
                })
            }
        }
    }

    async fn create(&self, kind: &str, pipeline: Option<&ObjectId>) -> Result<ObjectId, MediaError> {
        let result = self
            .request(methods::CREATE, create_params(kind, pipeline))
            .await?;
        match result.get("value").and_then(Value::as_str) {
            Some(id) => Ok(ObjectId::new(id)),
            None => Err(MediaError::UnexpectedResponse {
                method: format!("create {}", kind),
                detail: result.to_string(),
            }),
        }
    }

    async fn invoke(
        &self,
        object: &ObjectId,
        operation: &str,
        args: Value,
    ) -> Result<Value, MediaError> {
        let result = self
            .request(methods::INVOKE, invoke_params(object, operation, args))
            .await?;
        Ok(result.get("value").cloned().unwrap_or(Value::Null))
    }
}

#[async_trait]
impl MediaClient for KurentoClient {
    async fn create_pipeline(&self) -> Result<ObjectId, MediaError> {
        self.create("MediaPipeline", None).await
    }

    async fn create_webrtc_endpoint(&self, pipeline: &ObjectId) -> Result<ObjectId, MediaError> {
        self.create("WebRtcEndpoint", Some(pipeline)).await
    }

    async fn create_face_overlay_filter(
        &self,
        pipeline: &ObjectId,
    ) -> Result<ObjectId, MediaError> {
        self.create("FaceOverlayFilter", Some(pipeline)).await
    }

    async fn set_overlayed_image(
        &self,
        filter: &ObjectId,
        image: &OverlayImage,
    ) -> Result<(), MediaError> {
        self.invoke(filter, "setOverlayedImage", overlay_args(image))
            .await
            .map(|_| ())
    }

    async fn connect(&self, source: &ObjectId, sink: &ObjectId) -> Result<(), MediaError> {
        self.invoke(source, "connect", serde_json::json!({ "sink": sink }))
            .await
            .map(|_| ())
    }

    async fn process_offer(&self, endpoint: &ObjectId, offer: &str) -> Result<String, MediaError> {
        let answer = self
            .invoke(endpoint, "processOffer", serde_json::json!({ "offer": offer }))
            .await?;
        match answer {
            Value::String(sdp) => Ok(sdp),
            other => Err(MediaError::UnexpectedResponse {
                method: "processOffer".to_string(),
                detail: other.to_string(),
            }),
        }
    }

    async fn gather_candidates(&self, endpoint: &ObjectId) -> Result<(), MediaError> {
        self.invoke(endpoint, "gatherCandidates", serde_json::json!({}))
            .await
            .map(|_| ())
    }

    async fn add_ice_candidate(
        &self,
        endpoint: &ObjectId,
        candidate: &IceCandidate,
    ) -> Result<(), MediaError> {
        let args = serde_json::json!({ "candidate": candidate_arg(candidate) });
        self.invoke(endpoint, "addIceCandidate", args)
            .await
            .map(|_| ())
    }

    async fn subscribe_ice_candidates(
        &self,
        endpoint: &ObjectId,
    ) -> Result<mpsc::UnboundedReceiver<IceCandidate>, MediaError> {
        // Register before subscribing so no event can slip past
        let (tx, rx) = mpsc::unbounded_channel();
        self.shared
            .subscriptions
            .lock()
            .await
            .insert(endpoint.clone(), tx);

        let params = subscribe_params(endpoint, events::ICE_CANDIDATE_FOUND);
        if let Err(e) = self.request(methods::SUBSCRIBE, params).await {
            self.shared.subscriptions.lock().await.remove(endpoint);
            return Err(e);
        }
        Ok(rx)
    }

    async fn release(&self, object: &ObjectId) -> Result<(), MediaError> {
        self.request(methods::RELEASE, release_params(object))
            .await
            .map(|_| ())
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!(url = %self.url, "Closing media server connection");
        let _ = self.outgoing.send(Message::Close(None));
        for task in self.tasks.lock().await.drain(..) {
            task.abort();
        }
        self.shared.shutdown().await;
    }
}

impl Drop for KurentoClient {
    fn drop(&mut self) {
        if !self.destroyed.load(Ordering::SeqCst) {
            let _ = self.outgoing.send(Message::Close(None));
        }
        for task in self.tasks.get_mut().drain(..) {
            task.abort();
        }
    }
}

/// Forward queued frames to the WebSocket until the close frame is sent
async fn write_loop<S>(mut rx: mpsc::UnboundedReceiver<Message>, mut ws_sender: S)
where
    S: Sink<Message> + Unpin,
    S::Error: std::fmt::Display,
{
    while let Some(message) = rx.recv().await {
        let closing = matches!(message, Message::Close(_));
        if let Err(e) = ws_sender.send(message).await {
            warn!("Failed to write to media server: {}", e);
            break;
        }
        if closing {
            break;
        }
    }
}

/// Dispatch incoming frames until the media server goes away
async fn read_loop<S>(mut ws_receiver: S, shared: Arc<Shared>)
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = ws_receiver.next().await {
        match frame {
            Ok(Message::Text(text)) => shared.dispatch(text.as_str()).await,
            Ok(Message::Close(_)) => {
                debug!("Media server closed the connection");
                break;
            }
            Ok(_) => {
                // Pings are answered by tungstenite; binary frames are not used
            }
            Err(e) => {
                warn!("Media server connection error: {}", e);
                break;
            }
        }
    }
    shared.shutdown().await;
}

/// Ping periodically so the media server keeps the session alive
async fn keepalive_loop(
    shared: Arc<Shared>,
    outgoing: mpsc::UnboundedSender<Message>,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    // The first tick completes immediately; connect() already pinged
    ticker.tick().await;

    loop {
        ticker.tick().await;
        if shared.is_closed() {
            break;
        }
        let params = shared
            .with_session_id(ping_params(period.as_millis() as u64))
            .await;
        let request = JsonRpcRequest::new(methods::PING, params, Some(shared.next_id()));
        let text = match serde_json::to_string(&request) {
            Ok(text) => text,
            Err(e) => {
                warn!("Failed to serialize keepalive ping: {}", e);
                break;
            }
        };
        if outgoing.send(Message::Text(text.into())).is_err() {
            break;
        }
    }
}

/// Media engine backed by a Kurento media server
///
/// Every [`connect`](MediaEngine::connect) opens a dedicated WebSocket.
pub struct KurentoEngine {
    config: KurentoConfig,
}

impl KurentoEngine {
    pub fn new(config: KurentoConfig) -> Result<Self, MediaError> {
        config.validate()?;
        Ok(Self { config })
    }
}

#[async_trait]
impl MediaEngine for KurentoEngine {
    async fn connect(&self) -> Result<Arc<dyn MediaClient>, MediaError> {
        let client = KurentoClient::connect(&self.config).await?;
        Ok(Arc::new(client))
    }
}
