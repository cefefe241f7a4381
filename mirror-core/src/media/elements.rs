//! Typed handles for media server objects
//!
//! Handles are cheap to clone: each is an object id plus the client that
//! created it. Cloning a handle does not duplicate the server-side object.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::traits::MediaClient;
use super::types::{IceCandidate, ObjectId, OverlayImage};
use crate::error::MediaError;

/// A media element that can be the sink of a connection
pub trait MediaElement {
    fn object_id(&self) -> &ObjectId;
}

/// Server-side graph holding the session's endpoint and filters
#[derive(Clone)]
pub struct MediaPipeline {
    id: ObjectId,
    client: Arc<dyn MediaClient>,
}

impl MediaPipeline {
    pub async fn create(client: Arc<dyn MediaClient>) -> Result<Self, MediaError> {
        let id = client.create_pipeline().await?;
        Ok(Self { id, client })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    /// Release the pipeline and every element inside it
    pub async fn release(&self) -> Result<(), MediaError> {
        self.client.release(&self.id).await
    }
}

/// WebRTC transport to one browser
#[derive(Clone)]
pub struct WebRtcEndpoint {
    id: ObjectId,
    client: Arc<dyn MediaClient>,
}

impl WebRtcEndpoint {
    pub async fn create(pipeline: &MediaPipeline) -> Result<Self, MediaError> {
        let client = Arc::clone(&pipeline.client);
        let id = client.create_webrtc_endpoint(&pipeline.id).await?;
        Ok(Self { id, client })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub async fn process_offer(&self, offer: &str) -> Result<String, MediaError> {
        self.client.process_offer(&self.id, offer).await
    }

    pub async fn gather_candidates(&self) -> Result<(), MediaError> {
        self.client.gather_candidates(&self.id).await
    }

    pub async fn add_ice_candidate(&self, candidate: &IceCandidate) -> Result<(), MediaError> {
        self.client.add_ice_candidate(&self.id, candidate).await
    }

    pub async fn subscribe_ice_candidates(
        &self,
    ) -> Result<mpsc::UnboundedReceiver<IceCandidate>, MediaError> {
        self.client.subscribe_ice_candidates(&self.id).await
    }

    pub async fn connect(&self, sink: &impl MediaElement) -> Result<(), MediaError> {
        self.client.connect(&self.id, sink.object_id()).await
    }
}

impl MediaElement for WebRtcEndpoint {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }
}

/// Filter that draws an image over every detected face
#[derive(Clone)]
pub struct FaceOverlayFilter {
    id: ObjectId,
    client: Arc<dyn MediaClient>,
}

impl FaceOverlayFilter {
    pub async fn create(pipeline: &MediaPipeline) -> Result<Self, MediaError> {
        let client = Arc::clone(&pipeline.client);
        let id = client.create_face_overlay_filter(&pipeline.id).await?;
        Ok(Self { id, client })
    }

    pub fn id(&self) -> &ObjectId {
        &self.id
    }

    pub async fn set_overlayed_image(&self, image: &OverlayImage) -> Result<(), MediaError> {
        self.client.set_overlayed_image(&self.id, image).await
    }

    pub async fn connect(&self, sink: &impl MediaElement) -> Result<(), MediaError> {
        self.client.connect(&self.id, sink.object_id()).await
    }
}

impl MediaElement for FaceOverlayFilter {
    fn object_id(&self) -> &ObjectId {
        &self.id
    }
}
