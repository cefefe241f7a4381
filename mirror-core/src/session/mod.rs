//! Per-connection media sessions

pub mod registry;
pub mod state;

pub use registry::SessionRegistry;
pub use state::MirrorSession;
