//! MirrorSession: the media resources held for one browser connection

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::task::AbortHandle;
use tracing::{debug, warn};

use crate::error::MediaError;
use crate::media::{FaceOverlayFilter, MediaClient, MediaEngine, MediaPipeline, WebRtcEndpoint};

/// Media server client, pipeline and endpoint owned by one connection
///
/// A session exists from the moment its pipeline and endpoint are created
/// until [`release`](MirrorSession::release) consumes it. Dropping a session
/// without releasing it leaks the pipeline on the media server.
pub struct MirrorSession {
    id: String,
    client: Arc<dyn MediaClient>,
    pipeline: MediaPipeline,
    endpoint: WebRtcEndpoint,
    filter: Option<FaceOverlayFilter>,
    /// Background tasks tied to this session (candidate forwarding)
    tasks: Vec<AbortHandle>,
    created_at: DateTime<Utc>,
}

impl MirrorSession {
    /// Connect to the media server and create the pipeline and endpoint
    ///
    /// On failure, anything already created is released before returning.
    pub async fn create(
        engine: &dyn MediaEngine,
        id: impl Into<String>,
    ) -> Result<Self, MediaError> {
        let id = id.into();
        let client = engine.connect().await?;

        let pipeline = match MediaPipeline::create(Arc::clone(&client)).await {
            Ok(pipeline) => pipeline,
            Err(e) => {
                client.destroy().await;
                return Err(e);
            }
        };

        let endpoint = match WebRtcEndpoint::create(&pipeline).await {
            Ok(endpoint) => endpoint,
            Err(e) => {
                if let Err(release_error) = pipeline.release().await {
                    warn!(session_id = %id, "Failed to release pipeline: {}", release_error);
                }
                client.destroy().await;
                return Err(e);
            }
        };

        debug!(session_id = %id, pipeline = %pipeline.id(), "Media session created");
        Ok(Self {
            id,
            client,
            pipeline,
            endpoint,
            filter: None,
            tasks: Vec::new(),
            created_at: Utc::now(),
        })
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn pipeline(&self) -> &MediaPipeline {
        &self.pipeline
    }

    /// Handle to the session's endpoint, usable without holding the session
    pub fn endpoint(&self) -> WebRtcEndpoint {
        self.endpoint.clone()
    }

    /// Record the overlay filter; it is released together with the pipeline
    pub fn set_filter(&mut self, filter: FaceOverlayFilter) {
        self.filter = Some(filter);
    }

    /// Tie a background task's lifetime to the session
    pub fn attach_task(&mut self, task: AbortHandle) {
        self.tasks.push(task);
    }

    /// Stop background tasks, release the pipeline and close the client
    ///
    /// Release errors are logged; the client is closed regardless.
    pub async fn release(self) {
        for task in &self.tasks {
            task.abort();
        }
        if let Err(e) = self.pipeline.release().await {
            warn!(session_id = %self.id, "Failed to release pipeline: {}", e);
        }
        self.client.destroy().await;
        debug!(
            session_id = %self.id,
            pipeline = %self.pipeline.id(),
            filter = ?self.filter.as_ref().map(|filter| filter.id().to_string()),
            lifetime_secs = (Utc::now() - self.created_at).num_seconds(),
            "Media session released"
        );
    }
}
