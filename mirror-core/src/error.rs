//! Error types for mirror-core

use thiserror::Error;

/// Errors raised by the media engine binding
#[derive(Error, Debug)]
pub enum MediaError {
    #[error("Failed to connect to media server at {url}: {reason}")]
    Connect { url: String, reason: String },

    #[error("Media server error {code}: {message}")]
    Rpc { code: i64, message: String },

    #[error("Unexpected response to {method}: {detail}")]
    UnexpectedResponse { method: String, detail: String },

    #[error("Timed out waiting for {method} response")]
    Timeout { method: String },

    #[error("Media server connection closed")]
    Closed,

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid media server configuration: {0}")]
    Config(String),

    /// Failure injected by the mock engine
    #[error("{0}")]
    Injected(String),
}
