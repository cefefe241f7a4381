//! Mock media engine for testing
//!
//! MockMediaEngine keeps an in-memory object graph instead of talking to a
//! media server. It records every call, can be told to fail any step, and
//! emits scripted local candidates when gathering starts, enabling fast,
//! deterministic tests of the signaling layer.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::traits::{MediaClient, MediaEngine};
use super::types::{IceCandidate, ObjectId, OverlayImage};
use crate::error::MediaError;

/// SDP answer returned by default
pub const MOCK_SDP_ANSWER: &str = "v=0\r\no=- 0 0 IN IP4 127.0.0.1\r\ns=mock answer\r\n";

/// Engine operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockStep {
    Connect,
    CreatePipeline,
    CreateWebRtcEndpoint,
    CreateFaceOverlayFilter,
    SetOverlayedImage,
    ConnectElements,
    ProcessOffer,
    GatherCandidates,
    AddIceCandidate,
    SubscribeIceCandidates,
    Release,
}

/// A recorded engine call
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    ConnectClient,
    CreatePipeline,
    CreateWebRtcEndpoint { pipeline: ObjectId },
    CreateFaceOverlayFilter { pipeline: ObjectId },
    SetOverlayedImage { filter: ObjectId, image: OverlayImage },
    Connect { source: ObjectId, sink: ObjectId },
    ProcessOffer { endpoint: ObjectId, offer: String },
    GatherCandidates { endpoint: ObjectId },
    AddIceCandidate { endpoint: ObjectId, candidate: IceCandidate },
    SubscribeIceCandidates { endpoint: ObjectId },
    Release { object: ObjectId },
    Destroy,
}

#[derive(Default)]
struct EngineState {
    calls: Vec<MockCall>,
    failures: HashSet<MockStep>,
    answer: Option<String>,
    local_candidates: Vec<IceCandidate>,
    /// Live objects and the pipeline each belongs to (None for pipelines)
    objects: HashMap<ObjectId, Option<ObjectId>>,
    next_object: u64,
    open_clients: usize,
}

fn lock(state: &Mutex<EngineState>) -> MutexGuard<'_, EngineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock implementation of MediaEngine for testing
///
/// Clones share the same state, so a test can keep one clone for
/// assertions while the server owns another.
#[derive(Clone, Default)]
pub struct MockMediaEngine {
    state: Arc<Mutex<EngineState>>,
}

impl MockMediaEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `answer` as the result of every offer negotiation
    pub fn with_answer(self, answer: impl Into<String>) -> Self {
        lock(&self.state).answer = Some(answer.into());
        self
    }

    /// Emit `candidates` to subscribers whenever gathering starts
    pub fn with_local_candidates(self, candidates: Vec<IceCandidate>) -> Self {
        lock(&self.state).local_candidates = candidates;
        self
    }

    /// Make every future call of `step` fail
    pub fn fail_on(&self, step: MockStep) {
        lock(&self.state).failures.insert(step);
    }

    /// Stop failing `step`
    pub fn clear_failure(&self, step: MockStep) {
        lock(&self.state).failures.remove(&step);
    }

    /// All calls recorded so far, in order
    pub fn calls(&self) -> Vec<MockCall> {
        lock(&self.state).calls.clone()
    }

    /// Number of recorded calls matching `predicate`
    pub fn count_calls(&self, predicate: impl Fn(&MockCall) -> bool) -> usize {
        lock(&self.state).calls.iter().filter(|c| predicate(c)).count()
    }

    /// Number of pipelines released so far
    pub fn pipelines_released(&self) -> usize {
        let state = lock(&self.state);
        state
            .calls
            .iter()
            .filter(|c| matches!(c, MockCall::Release { object } if is_pipeline(object)))
            .count()
    }

    /// Number of clients destroyed so far
    pub fn clients_destroyed(&self) -> usize {
        self.count_calls(|c| matches!(c, MockCall::Destroy))
    }

    /// Objects created and not yet released
    pub fn live_objects(&self) -> usize {
        lock(&self.state).objects.len()
    }

    /// Clients connected and not yet destroyed
    pub fn open_clients(&self) -> usize {
        lock(&self.state).open_clients
    }
}

fn is_pipeline(object: &ObjectId) -> bool {
    object.as_str().ends_with(".MediaPipeline")
}

#[async_trait]
impl MediaEngine for MockMediaEngine {
    async fn connect(&self) -> Result<Arc<dyn MediaClient>, MediaError> {
        {
            let mut state = lock(&self.state);
            state.calls.push(MockCall::ConnectClient);
            if state.failures.contains(&MockStep::Connect) {
                return Err(injected(MockStep::Connect));
            }
            state.open_clients += 1;
        }

        Ok(Arc::new(MockClient {
            state: Arc::clone(&self.state),
            subscribers: Mutex::new(HashMap::new()),
            destroyed: AtomicBool::new(false),
        }))
    }
}

fn injected(step: MockStep) -> MediaError {
    MediaError::Injected(format!("injected {:?} failure", step))
}

struct MockClient {
    state: Arc<Mutex<EngineState>>,
    subscribers: Mutex<HashMap<ObjectId, Vec<mpsc::UnboundedSender<IceCandidate>>>>,
    destroyed: AtomicBool,
}

impl MockClient {
    /// Record `call`, then fail if the client is gone or `step` is scripted to fail
    fn record(
        &self,
        step: MockStep,
        call: MockCall,
    ) -> Result<MutexGuard<'_, EngineState>, MediaError> {
        if self.destroyed.load(Ordering::SeqCst) {
            return Err(MediaError::Closed);
        }
        let mut state = lock(&self.state);
        state.calls.push(call);
        if state.failures.contains(&step) {
            return Err(injected(step));
        }
        Ok(state)
    }

    fn create_object(
        &self,
        step: MockStep,
        call: MockCall,
        kind: &str,
        parent: Option<&ObjectId>,
    ) -> Result<ObjectId, MediaError> {
        let mut state = self.record(step, call)?;
        if let Some(parent) = parent
            && !state.objects.contains_key(parent)
        {
            return Err(object_not_found(parent));
        }
        state.next_object += 1;
        let id = ObjectId::new(format!("mock-{}.{}", state.next_object, kind));
        state.objects.insert(id.clone(), parent.cloned());
        Ok(id)
    }

    fn require(&self, state: &EngineState, object: &ObjectId) -> Result<(), MediaError> {
        if state.objects.contains_key(object) {
            Ok(())
        } else {
            Err(object_not_found(object))
        }
    }
}

fn object_not_found(object: &ObjectId) -> MediaError {
    MediaError::Rpc {
        code: 40101,
        message: format!("Object '{}' not found", object),
    }
}

#[async_trait]
impl MediaClient for MockClient {
    async fn create_pipeline(&self) -> Result<ObjectId, MediaError> {
        self.create_object(
            MockStep::CreatePipeline,
            MockCall::CreatePipeline,
            "MediaPipeline",
            None,
        )
    }

    async fn create_webrtc_endpoint(&self, pipeline: &ObjectId) -> Result<ObjectId, MediaError> {
        self.create_object(
            MockStep::CreateWebRtcEndpoint,
            MockCall::CreateWebRtcEndpoint {
                pipeline: pipeline.clone(),
            },
            "WebRtcEndpoint",
            Some(pipeline),
        )
    }

    async fn create_face_overlay_filter(
        &self,
        pipeline: &ObjectId,
    ) -> Result<ObjectId, MediaError> {
        self.create_object(
            MockStep::CreateFaceOverlayFilter,
            MockCall::CreateFaceOverlayFilter {
                pipeline: pipeline.clone(),
            },
            "FaceOverlayFilter",
            Some(pipeline),
        )
    }

    async fn set_overlayed_image(
        &self,
        filter: &ObjectId,
        image: &OverlayImage,
    ) -> Result<(), MediaError> {
        let state = self.record(
            MockStep::SetOverlayedImage,
            MockCall::SetOverlayedImage {
                filter: filter.clone(),
                image: image.clone(),
            },
        )?;
        self.require(&state, filter)
    }

    async fn connect(&self, source: &ObjectId, sink: &ObjectId) -> Result<(), MediaError> {
        let state = self.record(
            MockStep::ConnectElements,
            MockCall::Connect {
                source: source.clone(),
                sink: sink.clone(),
            },
        )?;
        self.require(&state, source)?;
        self.require(&state, sink)
    }

    async fn process_offer(&self, endpoint: &ObjectId, offer: &str) -> Result<String, MediaError> {
        let state = self.record(
            MockStep::ProcessOffer,
            MockCall::ProcessOffer {
                endpoint: endpoint.clone(),
                offer: offer.to_string(),
            },
        )?;
        self.require(&state, endpoint)?;
        Ok(state
            .answer
            .clone()
            .unwrap_or_else(|| MOCK_SDP_ANSWER.to_string()))
    }

    async fn gather_candidates(&self, endpoint: &ObjectId) -> Result<(), MediaError> {
        let candidates = {
            let state = self.record(
                MockStep::GatherCandidates,
                MockCall::GatherCandidates {
                    endpoint: endpoint.clone(),
                },
            )?;
            self.require(&state, endpoint)?;
            state.local_candidates.clone()
        };

        let subscribers = self.subscribers.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(senders) = subscribers.get(endpoint) {
            for candidate in candidates {
                for tx in senders {
                    let _ = tx.send(candidate.clone());
                }
            }
        }
        Ok(())
    }

    async fn add_ice_candidate(
        &self,
        endpoint: &ObjectId,
        candidate: &IceCandidate,
    ) -> Result<(), MediaError> {
        let state = self.record(
            MockStep::AddIceCandidate,
            MockCall::AddIceCandidate {
                endpoint: endpoint.clone(),
                candidate: candidate.clone(),
            },
        )?;
        self.require(&state, endpoint)
    }

    async fn subscribe_ice_candidates(
        &self,
        endpoint: &ObjectId,
    ) -> Result<mpsc::UnboundedReceiver<IceCandidate>, MediaError> {
        {
            let state = self.record(
                MockStep::SubscribeIceCandidates,
                MockCall::SubscribeIceCandidates {
                    endpoint: endpoint.clone(),
                },
            )?;
            self.require(&state, endpoint)?;
        }

        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(endpoint.clone())
            .or_default()
            .push(tx);
        Ok(rx)
    }

    async fn release(&self, object: &ObjectId) -> Result<(), MediaError> {
        let mut state = self.record(
            MockStep::Release,
            MockCall::Release {
                object: object.clone(),
            },
        )?;
        self.require(&state, object)?;
        state
            .objects
            .retain(|id, parent| id != object && parent.as_ref() != Some(object));
        Ok(())
    }

    async fn destroy(&self) {
        if self.destroyed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
        let mut state = lock(&self.state);
        state.calls.push(MockCall::Destroy);
        state.open_clients = state.open_clients.saturating_sub(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(n: u32) -> IceCandidate {
        IceCandidate::new(
            format!("candidate:{} 1 UDP 1 10.0.0.{} 9 typ host", n, n),
            "0",
            0,
        )
    }

    #[tokio::test]
    async fn connect_failure_is_injected() {
        let engine = MockMediaEngine::new();
        engine.fail_on(MockStep::Connect);

        let result = engine.connect().await;

        assert!(matches!(result, Err(MediaError::Injected(_))));
        assert_eq!(engine.open_clients(), 0);
    }

    #[tokio::test]
    async fn cleared_failure_no_longer_fails() {
        let engine = MockMediaEngine::new();
        engine.fail_on(MockStep::CreatePipeline);
        let client = engine.connect().await.unwrap();
        assert!(client.create_pipeline().await.is_err());

        engine.clear_failure(MockStep::CreatePipeline);

        assert!(client.create_pipeline().await.is_ok());
    }

    #[tokio::test]
    async fn process_offer_returns_scripted_answer() {
        let engine = MockMediaEngine::new().with_answer("v=0 answer");
        let client = engine.connect().await.unwrap();
        let pipeline = client.create_pipeline().await.unwrap();
        let endpoint = client.create_webrtc_endpoint(&pipeline).await.unwrap();

        let answer = client.process_offer(&endpoint, "v=0 offer").await.unwrap();

        assert_eq!(answer, "v=0 answer");
    }

    #[tokio::test]
    async fn gather_emits_local_candidates_to_subscriber() {
        let engine =
            MockMediaEngine::new().with_local_candidates(vec![candidate(1), candidate(2)]);
        let client = engine.connect().await.unwrap();
        let pipeline = client.create_pipeline().await.unwrap();
        let endpoint = client.create_webrtc_endpoint(&pipeline).await.unwrap();
        let mut rx = client.subscribe_ice_candidates(&endpoint).await.unwrap();

        client.gather_candidates(&endpoint).await.unwrap();

        assert_eq!(rx.recv().await, Some(candidate(1)));
        assert_eq!(rx.recv().await, Some(candidate(2)));
    }

    #[tokio::test]
    async fn destroy_closes_subscriptions_and_client() {
        let engine = MockMediaEngine::new();
        let client = engine.connect().await.unwrap();
        let pipeline = client.create_pipeline().await.unwrap();
        let endpoint = client.create_webrtc_endpoint(&pipeline).await.unwrap();
        let mut rx = client.subscribe_ice_candidates(&endpoint).await.unwrap();

        client.destroy().await;
        client.destroy().await;

        assert_eq!(rx.recv().await, None);
        assert_eq!(engine.open_clients(), 0);
        assert_eq!(engine.clients_destroyed(), 1);
        assert!(matches!(
            client.create_pipeline().await,
            Err(MediaError::Closed)
        ));
    }

    #[tokio::test]
    async fn operations_on_released_objects_fail() {
        let engine = MockMediaEngine::new();
        let client = engine.connect().await.unwrap();
        let pipeline = client.create_pipeline().await.unwrap();
        let endpoint = client.create_webrtc_endpoint(&pipeline).await.unwrap();
        client.release(&pipeline).await.unwrap();

        let result = client.add_ice_candidate(&endpoint, &candidate(1)).await;

        assert!(matches!(result, Err(MediaError::Rpc { code: 40101, .. })));
        assert_eq!(engine.pipelines_released(), 1);
    }
}
