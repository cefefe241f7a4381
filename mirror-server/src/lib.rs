//! mirror-server - HTTP and WebSocket signaling server for magic-mirror
//!
//! Browsers connect to `/magicmirror`, send an SDP offer, and receive the
//! media server's answer plus its ICE candidates. Each connection owns at
//! most one media session in the shared [`AppState`] registry.

mod error;
pub mod http;
mod state;
pub mod ws;

use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub use error::ServerError;
pub use http::create_router;
pub use state::AppState;

/// The signaling server
pub struct MirrorServer {
    config: ServerConfig,
    state: Arc<AppState>,
    shutdown: CancellationToken,
}

impl MirrorServer {
    /// Create a server around prepared state
    pub fn with_state(config: ServerConfig, state: Arc<AppState>) -> Self {
        let shutdown = state.shutdown.clone();
        Self {
            config,
            state,
            shutdown,
        }
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Get the shared application state
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Token that stops the server when cancelled
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Run the server, binding to the configured address
    pub async fn run(self) -> Result<(), ServerError> {
        let addr = self.config.addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| ServerError::Bind {
                addr: addr.clone(),
                source: e,
            })?;

        self.run_with_listener(listener).await
    }

    /// Run the server on an already bound listener
    ///
    /// Returns once the shutdown token is cancelled, after every remaining
    /// session has been released. Open signaling connections observe the
    /// same token and release their own sessions as they close.
    pub async fn run_with_listener(self, listener: TcpListener) -> Result<(), ServerError> {
        if let Ok(addr) = listener.local_addr() {
            info!("magic-mirror signaling on ws://{}/magicmirror", addr);
        }

        let router = create_router(Arc::clone(&self.state));
        let shutdown = self.shutdown.clone();
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let released = self.state.registry.release_all().await;
        info!(released, "Server stopped");
        Ok(())
    }
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to listen on
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8443,
        }
    }
}

impl ServerConfig {
    /// Create a new ServerConfig with the specified host and port
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Returns the socket address string (e.g., "127.0.0.1:8443")
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
