//! Media engine abstraction

pub mod elements;
pub mod mock;
pub mod traits;
pub mod types;

// Re-export key types for convenience
pub use elements::{FaceOverlayFilter, MediaElement, MediaPipeline, WebRtcEndpoint};
pub use mock::{MockCall, MockMediaEngine, MockStep};
pub use traits::{MediaClient, MediaEngine};
pub use types::{IceCandidate, ObjectId, OverlayImage};
