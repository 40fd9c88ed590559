//! Integration tests for the connection manager against a mock backend.

mod common;

use std::time::Duration;

use common::{
    connect, connected_frame, content_frame, next_event, test_config, wait_for, MockBackend,
};
use serde_json::json;
use studyai_client::{
    ClientId, ConnectionEvent, ConnectionManager, ConnectionState, ServerMessage,
};

/// Returns an address nothing is listening on.
fn unused_address() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").expect("Failed to bind");
    let addr = listener.local_addr().expect("Failed to get local addr");
    drop(listener);
    format!("ws://{addr}")
}

// ============================================================================
// Connection Lifecycle
// ============================================================================

/// The client id is carried in the channel path and the greeting is delivered.
#[tokio::test]
async fn test_connects_with_client_id_path() {
    let backend = MockBackend::echo();
    let url = backend.spawn().await;

    let (mut manager, mut events) =
        ConnectionManager::new(test_config(&url), ClientId::new("user_k3j9x2m1q"));
    manager.connect();

    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);
    match next_event(&mut events).await {
        ConnectionEvent::Message(ServerMessage::Connected { session_id, .. }) => {
            assert_eq!(session_id.as_deref(), Some("session-1"));
        }
        other => panic!("Expected connected message, got {other:?}"),
    }

    assert_eq!(manager.state(), ConnectionState::Open);
    assert_eq!(
        *backend.client_ids.lock().unwrap(),
        vec!["user_k3j9x2m1q".to_string()]
    );

    manager.shutdown().await;
}

/// Calling connect again while running does not open a second channel.
#[tokio::test]
async fn test_connect_is_idempotent() {
    let backend = MockBackend::echo();
    let url = backend.spawn().await;

    let (mut manager, mut events) = connect(&url);
    manager.connect();
    manager.connect();

    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);
    tokio::time::sleep(Duration::from_millis(150)).await;

    assert_eq!(backend.connection_count(), 1);
    manager.shutdown().await;
}

/// A channel closed by the backend is reopened once after the delay.
#[tokio::test]
async fn test_reconnects_after_backend_closes() {
    let backend = MockBackend::echo().dropping_first(1);
    let url = backend.spawn().await;

    let (manager, mut events) = connect(&url);

    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);
    wait_for(&mut events, |e| *e == ConnectionEvent::Closed).await;
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);

    // The reopened channel stays up.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.connection_count(), 2);
    assert_eq!(manager.state(), ConnectionState::Open);

    let ids = backend.client_ids.lock().unwrap().clone();
    assert_eq!(ids.len(), 2);
    assert_eq!(ids[0], ids[1], "Reconnect must reuse the client id");
    assert_eq!(ids[0], manager.client_id().as_str());

    manager.shutdown().await;
}

/// A backend that is down keeps the manager retrying without surfacing errors.
#[tokio::test]
async fn test_unreachable_backend_retries() {
    let (manager, mut events) = connect(&unused_address());

    assert_eq!(next_event(&mut events).await, ConnectionEvent::Closed);
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Closed);
    assert!(manager.is_running());
    assert_ne!(manager.state(), ConnectionState::Open);

    manager.shutdown().await;
}

// ============================================================================
// Messaging
// ============================================================================

/// Requests are wrapped as `{"message": ...}` and replies come back as events.
#[tokio::test]
async fn test_send_round_trip() {
    let backend = MockBackend::echo();
    let url = backend.spawn().await;

    let (manager, mut events) = connect(&url);
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);

    assert!(manager.send("  Create flashcards for: Mitosis  "));

    let reply = wait_for(&mut events, |e| {
        matches!(e, ConnectionEvent::Message(ServerMessage::Status { .. }))
    })
    .await;
    assert_eq!(
        reply,
        ConnectionEvent::Message(ServerMessage::status(
            "echo: Create flashcards for: Mitosis"
        ))
    );
    assert_eq!(backend.received(), vec!["Create flashcards for: Mitosis"]);

    manager.shutdown().await;
}

/// Nothing is sent while the channel is closed, and blank text is never sent.
#[tokio::test]
async fn test_send_rejected_when_not_open() {
    let (manager, mut events) = connect(&unused_address());
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Closed);

    assert!(!manager.send("Explain photosynthesis"));
    manager.shutdown().await;

    let backend = MockBackend::echo();
    let url = backend.spawn().await;
    let (manager, mut events) = connect(&url);
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);

    assert!(!manager.send("   "));
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(backend.received().is_empty());

    manager.shutdown().await;
}

/// Nothing sent while a dropped channel is down reaches the next connection.
#[tokio::test]
async fn test_send_rejected_between_close_and_reopen() {
    let backend = MockBackend::echo().dropping_first(1);
    let url = backend.spawn().await;

    let (manager, mut events) = connect(&url);
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);
    wait_for(&mut events, |e| *e == ConnectionEvent::Closed).await;

    assert_ne!(manager.state(), ConnectionState::Open);
    assert!(!manager.send("Create flashcards for: Mitosis"));

    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(backend.received().is_empty());

    assert!(manager.send("Explain photosynthesis"));
    wait_for(&mut events, |e| {
        matches!(e, ConnectionEvent::Message(ServerMessage::Status { .. }))
    })
    .await;
    assert_eq!(backend.received(), vec!["Explain photosynthesis"]);

    manager.shutdown().await;
}

/// Malformed frames and bad study content are reported and the channel stays usable.
#[tokio::test]
async fn test_malformed_frames_are_not_fatal() {
    let empty_clarification = json!({"mode": "clarification", "message": "Which?", "options": []});
    let backend = MockBackend::echo().with_greeting(vec![
        "not json".to_string(),
        json!({"type": "mystery"}).to_string(),
        content_frame(empty_clarification),
        connected_frame(),
    ]);
    let url = backend.spawn().await;

    let (manager, mut events) = connect(&url);
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);

    for expected_raw in ["not json", r#"{"type":"mystery"}"#] {
        match next_event(&mut events).await {
            ConnectionEvent::ProtocolError { raw, .. } => assert_eq!(raw, expected_raw),
            other => panic!("Expected protocol error, got {other:?}"),
        }
    }
    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::InvalidContent { .. }
    ));
    assert!(matches!(
        next_event(&mut events).await,
        ConnectionEvent::Message(ServerMessage::Connected { .. })
    ));

    assert!(manager.send("still here"));
    wait_for(&mut events, |e| {
        matches!(e, ConnectionEvent::Message(ServerMessage::Status { .. }))
    })
    .await;

    manager.shutdown().await;
}

// ============================================================================
// Shutdown
// ============================================================================

/// After shutdown the event stream ends without a trailing `Closed`.
#[tokio::test]
async fn test_shutdown_stops_events() {
    let backend = MockBackend::echo();
    let url = backend.spawn().await;

    let (manager, mut events) = connect(&url);
    assert_eq!(next_event(&mut events).await, ConnectionEvent::Opened);
    next_event(&mut events).await;

    manager.shutdown().await;

    let mut remaining = Vec::new();
    while let Ok(Some(event)) =
        tokio::time::timeout(Duration::from_secs(5), events.recv()).await
    {
        remaining.push(event);
    }
    assert!(remaining.is_empty(), "Unexpected events: {remaining:?}");

    // No reconnect after shutdown.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(backend.connection_count(), 1);
}
