//! Shared application state

use std::sync::Arc;

use chrono::{DateTime, Utc};
use mirror_core::{KurentoConfig, KurentoEngine, MediaEngine, OverlayImage, SessionRegistry};
use tokio_util::sync::CancellationToken;

use crate::ServerError;

/// State shared by every connection
pub struct AppState {
    /// Live sessions, one per signaling connection
    pub registry: SessionRegistry,
    /// Factory for media server connections
    pub engine: Arc<dyn MediaEngine>,
    /// Image drawn over detected faces
    pub overlay: OverlayImage,
    /// When the server was started
    pub started_at: DateTime<Utc>,
    /// Cancelled when the server stops; open connections close on it
    pub shutdown: CancellationToken,
}

impl AppState {
    /// Create state around an existing engine (the mock, in tests)
    pub fn new(engine: Arc<dyn MediaEngine>) -> Self {
        Self {
            registry: SessionRegistry::new(),
            engine,
            overlay: OverlayImage::default(),
            started_at: Utc::now(),
            shutdown: CancellationToken::new(),
        }
    }

    /// Create state backed by a Kurento media server
    pub fn with_kurento(config: KurentoConfig) -> Result<Self, ServerError> {
        let engine = KurentoEngine::new(config)?;
        Ok(Self::new(Arc::new(engine)))
    }

    pub fn with_overlay(mut self, overlay: OverlayImage) -> Self {
        self.overlay = overlay;
        self
    }

    pub fn active_sessions(&self) -> usize {
        self.registry.len()
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
