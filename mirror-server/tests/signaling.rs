//! Signaling protocol integration tests
//!
//! Drive the server over a real WebSocket with a mock media engine:
//! - offer/answer negotiation and candidate exchange
//! - teardown on stop, protocol error and disconnect

mod common;

use std::time::Duration;

use common::client::TestClient;
use mirror_core::{IceCandidate, MockCall, MockMediaEngine, MockStep};

const QUIET: Duration = Duration::from_millis(200);

#[tokio::test]
async fn start_returns_answer_then_candidates() {
    let engine = MockMediaEngine::new()
        .with_answer("v=0 answer")
        .with_local_candidates(vec![
            IceCandidate::new("candidate:1 1 UDP 1 10.0.0.1 5000 typ host", "0", 0),
            IceCandidate::new("candidate:2 1 UDP 1 10.0.0.1 5002 typ host", "1", 1),
        ]);
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;

    client.start("v=0 offer").await;

    let answer = client.recv().await;
    assert_eq!(answer["id"], "startResponse");
    assert_eq!(answer["sdpAnswer"], "v=0 answer");

    let first = client.recv().await;
    let second = client.recv().await;
    assert_eq!(first["id"], "iceCandidate");
    assert_eq!(first["candidate"]["sdpMid"], "0");
    assert_eq!(second["candidate"]["sdpMLineIndex"], 1);
    assert_eq!(state.active_sessions(), 1);
}

#[tokio::test]
async fn stop_releases_session() {
    let engine = MockMediaEngine::new();
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;
    client.start("v=0 offer").await;
    assert_eq!(client.recv().await["id"], "startResponse");

    client.stop().await;

    assert!(common::eventually(|| state.active_sessions() == 0).await);
    assert!(common::eventually(|| engine.open_clients() == 0).await);
    client.expect_no_message(QUIET).await;
    assert_eq!(engine.pipelines_released(), 1);
    assert_eq!(engine.live_objects(), 0);
}

#[tokio::test]
async fn candidate_before_start_is_ignored() {
    let engine = MockMediaEngine::new();
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;

    client.send_candidate("candidate:early").await;

    client.expect_no_message(QUIET).await;
    assert_eq!(state.active_sessions(), 0);
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn browser_candidates_reach_endpoint() {
    let engine = MockMediaEngine::new();
    let (_state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;
    client.start("v=0 offer").await;
    assert_eq!(client.recv().await["id"], "startResponse");

    client.send_candidate("candidate:remote").await;

    assert!(
        common::eventually(|| engine.count_calls(|c| matches!(
            c,
            MockCall::AddIceCandidate { candidate, .. } if candidate.candidate == "candidate:remote"
        )) == 1)
        .await
    );
}

#[tokio::test]
async fn unknown_id_yields_exactly_one_error() {
    let engine = MockMediaEngine::new();
    let (_state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;

    client.send_raw(r#"{"id":"rewind"}"#).await;

    let error = client.recv().await;
    assert_eq!(error["id"], "error");
    assert_eq!(error["message"], "Invalid message with id rewind");
    client.expect_no_message(QUIET).await;
}

#[tokio::test]
async fn unknown_id_tears_down_active_session() {
    let engine = MockMediaEngine::new();
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;
    client.start("v=0 offer").await;
    assert_eq!(client.recv().await["id"], "startResponse");

    client.send_raw(r#"{"id":"rewind"}"#).await;

    assert_eq!(client.recv().await["id"], "error");
    assert!(common::eventually(|| state.active_sessions() == 0).await);
    assert_eq!(engine.live_objects(), 0);
}

#[tokio::test]
async fn disconnect_tears_down_active_session() {
    let engine = MockMediaEngine::new();
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;
    client.start("v=0 offer").await;
    assert_eq!(client.recv().await["id"], "startResponse");

    client.close().await;

    assert!(common::eventually(|| state.active_sessions() == 0).await);
    assert!(common::eventually(|| engine.open_clients() == 0).await);
    assert_eq!(engine.pipelines_released(), 1);
}

#[tokio::test]
async fn rejected_offer_reports_error_and_cleans_up() {
    let engine = MockMediaEngine::new();
    engine.fail_on(MockStep::ProcessOffer);
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;

    client.start("v=0 bad offer").await;

    let error = client.recv().await;
    assert_eq!(error["id"], "error");
    assert_eq!(error["message"], "injected ProcessOffer failure");
    assert!(common::eventually(|| state.active_sessions() == 0).await);
    assert!(common::eventually(|| engine.open_clients() == 0).await);
    assert_eq!(engine.live_objects(), 0);
}

#[tokio::test]
async fn connection_survives_failed_start() {
    let engine = MockMediaEngine::new();
    engine.fail_on(MockStep::Connect);
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;
    client.start("v=0 offer").await;
    assert_eq!(client.recv().await["id"], "error");

    engine.clear_failure(MockStep::Connect);
    client.start("v=0 offer").await;

    assert_eq!(client.recv().await["id"], "startResponse");
    assert_eq!(state.active_sessions(), 1);
}

#[tokio::test]
async fn connections_have_independent_sessions() {
    let engine = MockMediaEngine::new();
    let (state, addr) = common::create_test_server(&engine).await;
    let mut alice = TestClient::connect(addr).await;
    let mut bob = TestClient::connect(addr).await;
    alice.start("v=0 alice").await;
    bob.start("v=0 bob").await;
    assert_eq!(alice.recv().await["id"], "startResponse");
    assert_eq!(bob.recv().await["id"], "startResponse");
    assert_eq!(state.active_sessions(), 2);

    alice.stop().await;

    assert!(common::eventually(|| state.active_sessions() == 1).await);
    assert_eq!(engine.open_clients(), 1);
    bob.expect_no_message(QUIET).await;
}

#[tokio::test]
async fn shutdown_closes_connections_and_releases_sessions() {
    let engine = MockMediaEngine::new();
    let (state, addr) = common::create_test_server(&engine).await;
    let mut client = TestClient::connect(addr).await;
    client.start("v=0 offer").await;
    assert_eq!(client.recv().await["id"], "startResponse");

    state.shutdown.cancel();

    client.expect_closed(Duration::from_secs(2)).await;
    assert!(common::eventually(|| state.active_sessions() == 0).await);
    assert!(common::eventually(|| engine.open_clients() == 0).await);
    assert_eq!(engine.pipelines_released(), 1);
}
