//! MediaEngine and MediaClient traits
//!
//! The engine abstraction keeps the signaling layer independent of how the
//! media server is reached: the Kurento JSON-RPC client in production, the
//! scripted mock in tests.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::mpsc;

use super::types::{IceCandidate, ObjectId, OverlayImage};
use crate::error::MediaError;

/// One connection to the media server
///
/// Every object created through a client lives on the media server until it
/// (or its pipeline) is released. Calling any method after [`destroy`]
/// fails with [`MediaError::Closed`].
///
/// [`destroy`]: MediaClient::destroy
#[async_trait]
pub trait MediaClient: Send + Sync {
    /// Create an empty media pipeline
    async fn create_pipeline(&self) -> Result<ObjectId, MediaError>;

    /// Create a WebRTC endpoint inside `pipeline`
    async fn create_webrtc_endpoint(&self, pipeline: &ObjectId) -> Result<ObjectId, MediaError>;

    /// Create a face overlay filter inside `pipeline`
    async fn create_face_overlay_filter(
        &self,
        pipeline: &ObjectId,
    ) -> Result<ObjectId, MediaError>;

    /// Set the image drawn over detected faces
    async fn set_overlayed_image(
        &self,
        filter: &ObjectId,
        image: &OverlayImage,
    ) -> Result<(), MediaError>;

    /// Route media from `source` into `sink`
    async fn connect(&self, source: &ObjectId, sink: &ObjectId) -> Result<(), MediaError>;

    /// Negotiate an SDP offer, returning the answer
    async fn process_offer(&self, endpoint: &ObjectId, offer: &str) -> Result<String, MediaError>;

    /// Start gathering local ICE candidates
    async fn gather_candidates(&self, endpoint: &ObjectId) -> Result<(), MediaError>;

    /// Add a remote ICE candidate received from the browser
    async fn add_ice_candidate(
        &self,
        endpoint: &ObjectId,
        candidate: &IceCandidate,
    ) -> Result<(), MediaError>;

    /// Subscribe to the endpoint's locally discovered ICE candidates
    ///
    /// The channel closes when the client is destroyed.
    async fn subscribe_ice_candidates(
        &self,
        endpoint: &ObjectId,
    ) -> Result<mpsc::UnboundedReceiver<IceCandidate>, MediaError>;

    /// Release an object (releasing a pipeline releases its elements)
    async fn release(&self, object: &ObjectId) -> Result<(), MediaError>;

    /// Tear down the connection to the media server
    async fn destroy(&self);
}

/// Factory for media server connections
///
/// Enables dependency injection of engine implementations.
#[async_trait]
pub trait MediaEngine: Send + Sync {
    /// Open a new client connection
    async fn connect(&self) -> Result<Arc<dyn MediaClient>, MediaError>;
}
