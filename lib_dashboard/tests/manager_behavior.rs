//! Behavioral tests for the notification connection manager, driven through
//! the in-memory transport so no network is involved.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use serde_json::{json, Value};
use tokio::sync::mpsc::{error::TryRecvError, UnboundedReceiver};

use lib_dashboard::realtime::manager::{ConnectionManager, LinkState, RealtimeConfig};
use lib_dashboard::realtime::transport::{MemoryConnector, MemorySession};

const RETRY: Duration = Duration::from_millis(25);

fn test_manager() -> (
    ConnectionManager,
    Arc<MemoryConnector>,
    UnboundedReceiver<MemorySession>,
) {
    let _ = env_logger::builder().is_test(true).try_init();
    let (connector, sessions) = MemoryConnector::new();
    let connector = Arc::new(connector);
    let config = RealtimeConfig {
        url: "ws://test.invalid/ws".to_string(),
        reconnect_delay: RETRY,
    };
    let manager = ConnectionManager::with_connector(config, connector.clone());
    (manager, connector, sessions)
}

async fn next_session(sessions: &mut UnboundedReceiver<MemorySession>) -> MemorySession {
    tokio::time::timeout(Duration::from_secs(2), sessions.recv())
        .await
        .expect("timed out waiting for a connection attempt")
        .expect("connector dropped")
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    let deadline = Instant::now() + Duration::from_secs(2);
    while !condition() {
        assert!(Instant::now() < deadline, "condition not met within 2s");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn recorder() -> (Arc<Mutex<Vec<Value>>>, impl Fn(Value) + Send + Sync + Clone) {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    (seen, move |payload| sink.lock().unwrap().push(payload))
}

#[tokio::test]
async fn last_registered_handler_wins() {
    let (manager, _connector, mut sessions) = test_manager();
    let (first_seen, first) = recorder();
    let (second_seen, second) = recorder();

    manager.on("analysis_progress", first);
    manager.on("analysis_progress", second);

    manager.connect();
    let session = next_session(&mut sessions).await;
    session.push_text(r#"{"type":"analysis_progress","data":{"project_id":1}}"#);

    wait_until(|| second_seen.lock().unwrap().len() == 1).await;
    assert!(first_seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unregistered_kind_is_a_silent_noop() {
    let (manager, _connector, mut sessions) = test_manager();
    let (seen, handler) = recorder();
    manager.on("known", handler);

    manager.connect();
    let session = next_session(&mut sessions).await;
    session.push_text(r#"{"type":"nobody_home","data":{"x":1}}"#);
    session.push_text(r#"{"type":"known","data":{"x":2}}"#);

    wait_until(|| seen.lock().unwrap().len() == 1).await;
    assert_eq!(seen.lock().unwrap()[0], json!({"x": 2}));
    assert_eq!(manager.state(), LinkState::Connected);
}

#[tokio::test]
async fn malformed_frames_do_not_break_the_connection() {
    let (manager, connector, mut sessions) = test_manager();
    let (seen, handler) = recorder();
    manager.on("analysis_progress", handler);

    manager.connect();
    let session = next_session(&mut sessions).await;
    session.push_text("this is not json");
    session.push_text(r#"{"payload_without_type": true}"#);
    session.push_text(r#"{"type":"analysis_progress","data":{"project_id":3}}"#);

    wait_until(|| seen.lock().unwrap().len() == 1).await;
    assert_eq!(seen.lock().unwrap()[0], json!({"project_id": 3}));
    assert_eq!(manager.state(), LinkState::Connected);
    // Still on the first and only link.
    assert_eq!(connector.attempts(), 1);
    assert!(!session.is_dropped());
}

#[tokio::test]
async fn abnormal_close_schedules_exactly_one_reconnect() {
    let (manager, connector, mut sessions) = test_manager();

    manager.connect();
    let first = next_session(&mut sessions).await;
    assert_eq!(connector.attempts(), 1);

    first.fail("socket reset");
    let _second = next_session(&mut sessions).await;
    assert_eq!(connector.attempts(), 2);

    // The dead link is released; only the replacement is live.
    wait_until(|| first.is_dropped()).await;
    wait_until(|| manager.state() == LinkState::Connected).await;

    // No further attempts while the new link stays healthy.
    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn handlers_survive_reconnection() {
    let (manager, _connector, mut sessions) = test_manager();
    let (seen, handler) = recorder();

    // Registered before the connection even exists.
    manager.on("ground_truth_added", handler);

    manager.connect();
    let first = next_session(&mut sessions).await;
    first.close();

    let second = next_session(&mut sessions).await;
    second.push_text(r#"{"type":"ground_truth_added","data":{"file_path":"A.java"}}"#);

    wait_until(|| seen.lock().unwrap().len() == 1).await;
}

#[tokio::test]
async fn disconnect_reaches_closed_and_stops_retrying() {
    let (manager, connector, mut sessions) = test_manager();

    manager.connect();
    let _session = next_session(&mut sessions).await;
    wait_until(|| manager.state() == LinkState::Connected).await;

    manager.disconnect();
    assert_eq!(manager.state(), LinkState::Closed);

    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(connector.attempts(), 1);
    assert!(matches!(sessions.try_recv(), Err(TryRecvError::Empty)));

    // A fresh connect() re-enters the lifecycle.
    manager.connect();
    let _session = next_session(&mut sessions).await;
    assert_eq!(connector.attempts(), 2);
}

#[tokio::test]
async fn disconnect_while_connecting_stops_the_retry_loop() {
    let (manager, connector, mut sessions) = test_manager();
    connector.fail_next_connect("backend down");

    manager.connect();
    // First attempt fails; the manager is now waiting out the retry delay.
    wait_until(|| connector.attempts() == 1).await;
    manager.disconnect();
    assert_eq!(manager.state(), LinkState::Closed);

    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(connector.attempts(), 1);
    assert!(matches!(sessions.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn connect_twice_does_not_leak_a_second_link() {
    let (manager, connector, mut sessions) = test_manager();

    manager.connect();
    manager.connect();
    let _session = next_session(&mut sessions).await;

    tokio::time::sleep(RETRY * 2).await;
    assert_eq!(connector.attempts(), 1);
    assert!(matches!(sessions.try_recv(), Err(TryRecvError::Empty)));
}

#[tokio::test]
async fn send_while_disconnected_is_dropped_silently() {
    let (manager, _connector, mut sessions) = test_manager();

    // Never connected: nothing to transmit on, nothing panics.
    manager.send(&json!({"subscribe": ["AAPL"]}));

    manager.connect();
    let mut session = next_session(&mut sessions).await;
    wait_until(|| manager.state() == LinkState::Connected).await;

    // Connected sends are handed to the link synchronously.
    manager.send(&json!({"hello": 1}));
    assert_eq!(session.sent(), vec![r#"{"hello":1}"#.to_string()]);

    manager.disconnect();
    manager.send(&json!({"hello": 2}));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(session.sent().is_empty());
}

#[tokio::test]
async fn analysis_progress_register_then_off_scenario() {
    let (manager, _connector, mut sessions) = test_manager();
    let (seen, handler) = recorder();

    manager.on("analysis_progress", handler);
    manager.connect();
    let session = next_session(&mut sessions).await;

    let frame = r#"{"type":"analysis_progress","data":{"project_id":7}}"#;
    session.push_text(frame);
    wait_until(|| seen.lock().unwrap().len() == 1).await;
    assert_eq!(seen.lock().unwrap()[0], json!({"project_id": 7}));

    manager.off("analysis_progress");
    session.push_text(frame);
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(seen.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn reconnect_count_matches_disconnect_count() {
    let (manager, connector, mut sessions) = test_manager();

    manager.connect();
    let mut current = next_session(&mut sessions).await;

    for _ in 0..3 {
        current.fail("killed");
        current = next_session(&mut sessions).await;
    }

    // Initial attempt plus one reconnect per kill, and nothing extra.
    assert_eq!(connector.attempts(), 4);
    wait_until(|| manager.state() == LinkState::Connected).await;
    tokio::time::sleep(RETRY * 4).await;
    assert_eq!(connector.attempts(), 4);
}

#[tokio::test]
async fn establishment_failure_retries_without_surfacing_errors() {
    let (manager, connector, mut sessions) = test_manager();
    connector.fail_next_connect("refused");
    connector.fail_next_connect("refused again");

    // connect() itself never reports the failures; the loop just keeps going.
    manager.connect();
    let _session = next_session(&mut sessions).await;
    assert_eq!(connector.attempts(), 3);
    wait_until(|| manager.state() == LinkState::Connected).await;
}
