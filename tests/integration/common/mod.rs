//! Mock StudyAI backend shared by the integration tests.
//!
//! The backend serves `/ws/:client_id`, records every connection and request,
//! and answers each request with the frames a responder function returns.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use serde_json::{json, Value};
use studyai_client::{ClientId, Config, ConnectionEvent, ConnectionManager};
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Produces the reply frames for one request.
pub type Responder = Arc<dyn Fn(&str) -> Vec<String> + Send + Sync>;

/// Scripted backend behavior plus what it observed.
#[derive(Clone)]
pub struct MockBackend {
    /// Connections accepted so far.
    pub connections: Arc<AtomicUsize>,
    /// Client ids from the request path, in connection order.
    pub client_ids: Arc<Mutex<Vec<String>>>,
    /// Request texts received, in order.
    pub received: Arc<Mutex<Vec<String>>>,
    /// Frames sent as soon as a connection opens.
    greeting: Vec<String>,
    /// Number of initial connections closed right after the greeting.
    drop_first: usize,
    responder: Responder,
}

impl MockBackend {
    pub fn new(responder: impl Fn(&str) -> Vec<String> + Send + Sync + 'static) -> Self {
        Self {
            connections: Arc::new(AtomicUsize::new(0)),
            client_ids: Arc::new(Mutex::new(Vec::new())),
            received: Arc::new(Mutex::new(Vec::new())),
            greeting: vec![connected_frame()],
            drop_first: 0,
            responder: Arc::new(responder),
        }
    }

    /// A backend that echoes every request back as a status message.
    pub fn echo() -> Self {
        Self::new(|request| vec![status_frame(&format!("echo: {request}"))])
    }

    /// Closes the first `n` connections right after greeting them.
    #[must_use]
    pub fn dropping_first(mut self, n: usize) -> Self {
        self.drop_first = n;
        self
    }

    /// Replaces the frames sent when a connection opens.
    #[must_use]
    pub fn with_greeting(mut self, frames: Vec<String>) -> Self {
        self.greeting = frames;
        self
    }

    pub fn connection_count(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn received(&self) -> Vec<String> {
        self.received.lock().unwrap().clone()
    }

    /// Starts serving on an ephemeral port and returns the base address.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/ws/:client_id", get(ws_handler))
            .with_state(self.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind");
        let addr = listener.local_addr().expect("Failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, router).await.expect("Server failed");
        });

        format!("ws://{addr}")
    }
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    Path(client_id): Path<String>,
    State(backend): State<MockBackend>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| serve(socket, client_id, backend))
}

async fn serve(mut socket: WebSocket, client_id: String, backend: MockBackend) {
    let n = backend.connections.fetch_add(1, Ordering::SeqCst) + 1;
    backend.client_ids.lock().unwrap().push(client_id);

    for frame in &backend.greeting {
        if socket.send(Message::Text(frame.clone())).await.is_err() {
            return;
        }
    }
    if n <= backend.drop_first {
        let _ = socket.send(Message::Close(None)).await;
        return;
    }

    while let Some(Ok(message)) = socket.recv().await {
        let Message::Text(text) = message else {
            continue;
        };
        let request: Value = serde_json::from_str(&text).expect("client sent invalid JSON");
        let request = request["message"].as_str().unwrap_or_default().to_string();
        backend.received.lock().unwrap().push(request.clone());

        for frame in (backend.responder)(&request) {
            if socket.send(Message::Text(frame)).await.is_err() {
                return;
            }
        }
    }
}

// ============================================================================
// Frames
// ============================================================================

pub fn connected_frame() -> String {
    json!({"type": "connected", "session_id": "session-1", "message": "Connected to StudyAI!"})
        .to_string()
}

pub fn status_frame(message: &str) -> String {
    json!({"type": "status", "message": message}).to_string()
}

pub fn error_frame(message: &str) -> String {
    json!({"type": "error", "message": message}).to_string()
}

pub fn content_frame(data: Value) -> String {
    json!({"type": "study_content", "data": data}).to_string()
}

pub fn deck_data() -> Value {
    json!({
        "mode": "flashcards",
        "deck_title": "Mitosis",
        "subject": "Biology",
        "difficulty": "beginner",
        "card_count": 2,
        "flashcards": [
            {"id": 1, "term": "Prophase", "definition": "Chromosomes condense", "hint": "", "example": "", "category": "Phases"},
            {"id": 2, "term": "Anaphase", "definition": "Chromatids separate"}
        ],
        "study_tips": ["Draw each phase"]
    })
}

pub fn practice_data() -> Value {
    let question = |id: u32, answer: &str| {
        json!({
            "id": id,
            "type": "multiple_choice",
            "bloom_level": "remember",
            "question": format!("Question {id}"),
            "options": ["A) first", "B) second", "C) third"],
            "answer": answer,
            "explanation": "Because."
        })
    };
    json!({
        "mode": "practice",
        "topic": "Cells",
        "question_count": 3,
        "difficulty": "beginner",
        "bloom_levels_covered": ["remember"],
        "questions": [question(1, "A"), question(2, "B"), question(3, "C")],
        "study_recommendations": ["Review organelles"]
    })
}

pub fn clarification_data() -> Value {
    json!({
        "mode": "clarification",
        "message": "Which subject would you like to study?",
        "options": ["Biology", "Chemistry"]
    })
}

// ============================================================================
// Client Helpers
// ============================================================================

/// Config pointing at `server_url` with a short reconnect delay.
pub fn test_config(server_url: &str) -> Config {
    Config {
        server_url: server_url.to_string(),
        reconnect_delay_ms: 50,
        ..Config::default()
    }
}

/// Creates and connects a manager for `server_url`.
pub fn connect(server_url: &str) -> (ConnectionManager, mpsc::UnboundedReceiver<ConnectionEvent>) {
    let (mut manager, events) =
        ConnectionManager::new(test_config(server_url), ClientId::generate());
    manager.connect();
    (manager, events)
}

/// Receives the next event, failing the test after five seconds.
pub async fn next_event(events: &mut mpsc::UnboundedReceiver<ConnectionEvent>) -> ConnectionEvent {
    timeout(Duration::from_secs(5), events.recv())
        .await
        .expect("Timeout waiting for event")
        .expect("Event channel closed")
}

/// Skips events until one matches `predicate`, returning it.
pub async fn wait_for(
    events: &mut mpsc::UnboundedReceiver<ConnectionEvent>,
    predicate: impl Fn(&ConnectionEvent) -> bool,
) -> ConnectionEvent {
    loop {
        let event = next_event(events).await;
        if predicate(&event) {
            return event;
        }
    }
}
