//! mirror-core: media engine binding and session lifecycle for magic-mirror
//!
//! - **Media abstraction** - [`MediaEngine`] and [`MediaClient`] traits with typed
//!   element handles ([`MediaPipeline`], [`WebRtcEndpoint`], [`FaceOverlayFilter`])
//! - **Kurento binding** - [`KurentoEngine`] speaking JSON-RPC over WebSocket
//! - **Sessions** - [`MirrorSession`] owning one connection's media resources,
//!   and [`SessionRegistry`] tracking them by connection id
//! - **Testing** - [`MockMediaEngine`] with scripted failures and call recording
//!
//! # Architecture
//!
//! ```text
//! SessionRegistry ──► MirrorSession ──► Arc<dyn MediaClient>
//!                        │                    ▲
//!                        ├─ MediaPipeline ────┤
//!                        └─ WebRtcEndpoint ───┘
//!                               ▲ │
//!                  FaceOverlayFilter (loopback)
//! ```

pub mod error;
pub mod kurento;
pub mod media;
pub mod session;

// Re-export key types for convenience
pub use error::MediaError;
pub use kurento::{KurentoClient, KurentoConfig, KurentoEngine};
pub use media::{
    FaceOverlayFilter, IceCandidate, MediaClient, MediaElement, MediaEngine, MediaPipeline,
    MockCall, MockMediaEngine, MockStep, ObjectId, OverlayImage, WebRtcEndpoint,
};
pub use session::{MirrorSession, SessionRegistry};
