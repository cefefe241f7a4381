//! HTTP server module

mod api;

use std::sync::Arc;

use axum::{Router, routing::get};

use crate::AppState;
use crate::ws::ws_handler;

pub use api::HealthResponse;

/// Create the HTTP router with all routes configured
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/magicmirror", get(ws_handler))
        .route("/api/health", get(api::health))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum_test::TestServer;
    use mirror_core::MockMediaEngine;

    #[tokio::test]
    async fn router_has_health_endpoint() {
        let state = Arc::new(AppState::new(Arc::new(MockMediaEngine::new())));
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/api/health").await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn signaling_route_requires_upgrade() {
        let state = Arc::new(AppState::new(Arc::new(MockMediaEngine::new())));
        let server = TestServer::new(create_router(state)).unwrap();

        let response = server.get("/magicmirror").expect_failure().await;
        assert!(response.status_code().is_client_error());
    }
}
