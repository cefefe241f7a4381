//! Shared test utilities for mirror-server integration tests

pub mod client;

use std::net::SocketAddr;
use std::sync::Arc;

use mirror_core::MockMediaEngine;
use mirror_server::{AppState, MirrorServer, ServerConfig};
use tokio::net::TcpListener;

/// Starts a server backed by `engine`, returns state and address
#[allow(dead_code)]
pub async fn create_test_server(engine: &MockMediaEngine) -> (Arc<AppState>, SocketAddr) {
    let state = Arc::new(AppState::new(Arc::new(engine.clone())));
    let server = MirrorServer::with_state(ServerConfig::default(), Arc::clone(&state));
    let addr = spawn_server(server).await;
    (state, addr)
}

/// Spawns server in background task, returns bound address
async fn spawn_server(server: MirrorServer) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = server.run_with_listener(listener).await;
    });

    addr
}

/// Polls `condition` until it holds or a second has passed
#[allow(dead_code)]
pub async fn eventually(mut condition: impl FnMut() -> bool) -> bool {
    for _ in 0..100 {
        if condition() {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
    }
    condition()
}
