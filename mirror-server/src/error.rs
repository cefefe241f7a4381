//! Server error types

use mirror_core::MediaError;
use thiserror::Error;

/// Errors that can occur in the signaling server
#[derive(Debug, Error)]
pub enum ServerError {
    /// Failed to bind to the specified address
    #[error("failed to bind to {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Client message that could not be parsed
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// Media engine could not be set up
    #[error(transparent)]
    Media(#[from] MediaError),

    /// Internal server error
    #[error("internal error: {0}")]
    Internal(String),
}
