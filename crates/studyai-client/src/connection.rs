//! Persistent channel to the generation backend.
//!
//! [`ConnectionManager`] owns one supervisor task that opens the WebSocket at
//! `<server_url>/ws/<client_id>`, forwards decoded frames as
//! [`ConnectionEvent`]s and, whenever the channel drops, waits a fixed delay
//! before trying again. There is no backoff and no attempt limit.
//!
//! Requests are only sent while the channel is open. Nothing is queued
//! across a reconnect.
//!
//! # Example
//!
//! ```no_run
//! use studyai_client::config::Config;
//! use studyai_client::connection::{ClientId, ConnectionEvent, ConnectionManager};
//!
//! # async fn example() {
//! let (mut manager, mut events) = ConnectionManager::new(Config::default(), ClientId::generate());
//! manager.connect();
//!
//! while let Some(event) = events.recv().await {
//!     if matches!(event, ConnectionEvent::Opened) {
//!         manager.send("Create flashcards for: Photosynthesis");
//!     }
//! }
//! # }
//! ```

use std::sync::{Arc, Mutex, PoisonError};

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::config::Config;
use crate::error::StudyError;
use crate::protocol::{ClientMessage, ServerMessage};

/// Number of random characters after the `user_` prefix.
const CLIENT_ID_SUFFIX_LEN: usize = 9;

type OutboundSlot = Arc<Mutex<Option<mpsc::UnboundedSender<String>>>>;

// ============================================================================
// Client Identity
// ============================================================================

/// Identifier the backend uses to key a client's channel.
///
/// Generated once per client lifetime and reused on every reconnect.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ClientId(String);

impl ClientId {
    /// Generates a fresh `user_xxxxxxxxx` identifier.
    #[must_use]
    pub fn generate() -> Self {
        let suffix: String = Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(CLIENT_ID_SUFFIX_LEN)
            .collect();
        Self(format!("user_{suffix}"))
    }

    /// Wraps an existing identifier.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// State and Events
// ============================================================================

/// Observable state of the channel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConnectionState {
    /// No channel. A reconnect may be pending.
    #[default]
    Closed,
    /// An attempt to open the channel is in progress.
    Connecting,
    /// The channel is open and requests can be sent.
    Open,
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Connecting => write!(f, "connecting"),
            Self::Open => write!(f, "open"),
        }
    }
}

/// Notifications delivered to the session layer.
#[derive(Debug, Clone, PartialEq)]
pub enum ConnectionEvent {
    /// The channel opened.
    Opened,
    /// The channel closed or an attempt to open it failed.
    Closed,
    /// A decoded and validated backend message.
    Message(ServerMessage),
    /// A `study_content` frame whose artifact could not be decoded or
    /// failed validation. The request it answers will get no other reply.
    InvalidContent {
        /// Why the artifact was rejected.
        reason: String,
    },
    /// An inbound frame that could not be decoded. Never fatal.
    ProtocolError {
        /// The frame as received.
        raw: String,
        /// Why it was rejected.
        reason: String,
    },
}

/// Anything the session controller can hand a study request to.
pub trait RequestSink {
    /// Returns `true` while requests can be sent.
    fn is_open(&self) -> bool;

    /// Sends one request. Returns `false` when nothing was sent.
    fn send_request(&self, text: &str) -> bool;
}

// ============================================================================
// Connection Manager
// ============================================================================

/// Maintains the channel to the backend and reconnects after every drop.
pub struct ConnectionManager {
    config: Config,
    client_id: ClientId,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    outbound: OutboundSlot,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("client_id", &self.client_id)
            .field("state", &self.state())
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl ConnectionManager {
    /// Creates a manager and the receiver its events are delivered on.
    ///
    /// Nothing happens on the network until [`connect`](Self::connect).
    #[must_use]
    pub fn new(
        config: Config,
        client_id: ClientId,
    ) -> (Self, mpsc::UnboundedReceiver<ConnectionEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let (state_tx, _) = watch::channel(ConnectionState::Closed);
        let manager = Self {
            config,
            client_id,
            state_tx: Arc::new(state_tx),
            outbound: Arc::new(Mutex::new(None)),
            events_tx,
            cancel: CancellationToken::new(),
            task: None,
        };
        (manager, events_rx)
    }

    /// Starts the supervisor task. Idempotent while the task is running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(&mut self) {
        if self.is_running() || self.cancel.is_cancelled() {
            return;
        }

        let supervisor = Supervisor {
            url: self.config.endpoint(self.client_id.as_str()),
            reconnect_delay: self.config.reconnect_delay(),
            state_tx: Arc::clone(&self.state_tx),
            outbound: Arc::clone(&self.outbound),
            events_tx: self.events_tx.clone(),
            cancel: self.cancel.clone(),
        };
        tracing::info!(url = %supervisor.url, "Starting connection supervisor");
        self.task = Some(tokio::spawn(supervisor.run()));
    }

    /// Sends a study request if the channel is open.
    ///
    /// Returns `false`, without sending, for blank text or a closed channel.
    pub fn send(&self, text: &str) -> bool {
        let text = text.trim();
        if text.is_empty() || self.state() != ConnectionState::Open {
            tracing::debug!(state = %self.state(), "Dropping request");
            return false;
        }

        let frame = match ClientMessage::new(text).encode() {
            Ok(frame) => frame,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode request");
                return false;
            }
        };

        let sender = self
            .outbound
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        sender.is_some_and(|tx| tx.send(frame).is_ok())
    }

    /// The current channel state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Subscribes to channel state changes.
    #[must_use]
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The identifier used for every connection attempt.
    #[must_use]
    pub const fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    /// Returns `true` while the supervisor task is alive.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Closes the channel, cancels any pending reconnect and waits for the
    /// supervisor to exit. No events are emitted afterwards.
    pub async fn shutdown(mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Connection supervisor did not exit cleanly");
            }
        }
        tracing::debug!("Connection manager shut down");
    }
}

impl RequestSink for ConnectionManager {
    fn is_open(&self) -> bool {
        self.state() == ConnectionState::Open
    }

    fn send_request(&self, text: &str) -> bool {
        self.send(text)
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Supervisor Task
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

struct Supervisor {
    url: String,
    reconnect_delay: std::time::Duration,
    state_tx: Arc<watch::Sender<ConnectionState>>,
    outbound: OutboundSlot,
    events_tx: mpsc::UnboundedSender<ConnectionEvent>,
    cancel: CancellationToken,
}

impl Supervisor {
    async fn run(self) {
        loop {
            self.set_state(ConnectionState::Connecting);
            tracing::debug!(url = %self.url, "Connecting to backend");

            let attempt = tokio::select! {
                () = self.cancel.cancelled() => break,
                attempt = connect_async(self.url.as_str()) => attempt,
            };

            match attempt {
                Ok((stream, _response)) => self.serve(stream).await,
                Err(e) => {
                    let error = StudyError::connection_lost(&self.url, e.to_string());
                    tracing::warn!(error = %error, "Connection attempt failed");
                    self.set_state(ConnectionState::Closed);
                    self.emit(ConnectionEvent::Closed);
                }
            }

            if self.cancel.is_cancelled() {
                break;
            }

            tracing::info!(
                delay_ms = u64::try_from(self.reconnect_delay.as_millis()).unwrap_or(u64::MAX),
                "Reconnecting after delay"
            );
            tokio::select! {
                () = self.cancel.cancelled() => break,
                () = tokio::time::sleep(self.reconnect_delay) => {}
            }
        }

        self.install_outbound(None);
        self.set_state(ConnectionState::Closed);
    }

    /// Pumps one open connection until it closes or the manager shuts down.
    async fn serve(&self, stream: WsStream) {
        let (mut sink, mut inbound) = stream.split();
        let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<String>();

        self.install_outbound(Some(outbound_tx));
        self.set_state(ConnectionState::Open);
        self.emit(ConnectionEvent::Opened);
        tracing::info!(url = %self.url, "Connected to backend");

        loop {
            tokio::select! {
                () = self.cancel.cancelled() => {
                    if let Err(e) = sink.send(Message::Close(None)).await {
                        tracing::debug!(error = %e, "Close frame not delivered");
                    }
                    break;
                }
                frame = inbound.next() => match frame {
                    Some(Ok(Message::Text(text))) => self.handle_text(text),
                    Some(Ok(Message::Binary(data))) => {
                        tracing::warn!(len = data.len(), "Ignoring binary frame");
                        self.emit(ConnectionEvent::ProtocolError {
                            raw: String::from_utf8_lossy(&data).into_owned(),
                            reason: "binary frames are not supported".to_string(),
                        });
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if let Err(e) = sink.send(Message::Pong(data)).await {
                            tracing::warn!(error = %e, "Failed to answer ping");
                            break;
                        }
                    }
                    Some(Ok(Message::Close(frame))) => {
                        tracing::info!(?frame, "Backend closed the connection");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        let error = StudyError::connection_lost(&self.url, e.to_string());
                        tracing::warn!(error = %error, "Connection dropped");
                        break;
                    }
                    None => break,
                },
                Some(frame) = outbound_rx.recv() => {
                    if let Err(e) = sink.send(Message::Text(frame)).await {
                        tracing::warn!(error = %e, "Failed to send request");
                        break;
                    }
                }
            }
        }

        self.install_outbound(None);
        self.set_state(ConnectionState::Closed);
        if !self.cancel.is_cancelled() {
            self.emit(ConnectionEvent::Closed);
        }
    }

    fn handle_text(&self, text: String) {
        match ServerMessage::decode(&text) {
            Ok(message) => {
                tracing::debug!(message_type = message.type_name(), "Received message");
                self.emit(ConnectionEvent::Message(message));
            }
            Err(e @ StudyError::InvalidArtifact { .. }) => {
                tracing::warn!(error = %e, "Rejecting study content");
                self.emit(ConnectionEvent::InvalidContent {
                    reason: e.to_string(),
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, "Ignoring undecodable frame");
                self.emit(ConnectionEvent::ProtocolError {
                    raw: text,
                    reason: e.to_string(),
                });
            }
        }
    }

    fn install_outbound(&self, sender: Option<mpsc::UnboundedSender<String>>) {
        *self.outbound.lock().unwrap_or_else(PoisonError::into_inner) = sender;
    }

    fn set_state(&self, state: ConnectionState) {
        self.state_tx.send_replace(state);
    }

    fn emit(&self, event: ConnectionEvent) {
        if self.cancel.is_cancelled() {
            return;
        }
        // Receiver gone means the host stopped listening; keep reconnecting anyway.
        let _ = self.events_tx.send(event);
    }
}

// ============================================================================
// Tests
// ============================================================================
