//! Kurento media server binding
//!
//! Speaks the media server's JSON-RPC 2.0 protocol over a WebSocket and
//! exposes it through the [`MediaEngine`](crate::media::MediaEngine) and
//! [`MediaClient`](crate::media::MediaClient) traits.

pub mod client;
pub mod config;
pub mod protocol;

pub use client::{KurentoClient, KurentoEngine};
pub use config::{
    DEFAULT_KEEPALIVE_INTERVAL_MS, DEFAULT_KURENTO_URL, DEFAULT_REQUEST_TIMEOUT_MS, KurentoConfig,
};
