//! Study session controller.
//!
//! The controller owns the only copy of the artifact on screen and is the
//! single writer of session state. Hosts feed it user actions and
//! [`ConnectionEvent`]s; everything runs on one task, so no locking is
//! needed.
//!
//! # State Machine
//!
//! ```text
//! Idle ──submit──> Awaiting ──study_content──> Displaying
//!  ^                  │                           │
//!  └──error/message───┘                           │
//!  └──────────────reset / choose_clarification────┘
//! ```
//!
//! `submit` is also accepted from `Displaying`, which discards the artifact
//! and all interactive state with it. Study content that fails to decode
//! counts as an error reply.

use crate::artifact::{Artifact, Clarification, Exam, FlashcardDeck, PracticeSet};
use crate::connection::{ConnectionEvent, RequestSink};
use crate::error::{RejectReason, Result, StudyError};
use crate::exam::ExamTab;
use crate::flashcards::FlashcardNavigator;
use crate::grading::PracticeQuiz;
use crate::protocol::ServerMessage;

// ============================================================================
// Session Phase
// ============================================================================

/// Coarse session state, without the artifact payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Ready for a request.
    Idle,
    /// A request is outstanding.
    Awaiting,
    /// An artifact is on screen.
    Displaying,
}

impl SessionPhase {
    /// Returns `true` if a new request may be submitted.
    #[must_use]
    pub const fn accepts_submit(self) -> bool {
        matches!(self, Self::Idle | Self::Displaying)
    }
}

impl std::fmt::Display for SessionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::Awaiting => write!(f, "awaiting"),
            Self::Displaying => write!(f, "displaying"),
        }
    }
}

// ============================================================================
// Displayed Artifact
// ============================================================================

/// Interactive state that lives and dies with the displayed artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interaction {
    /// Deck position, flips and known cards.
    Flashcards(FlashcardNavigator),
    /// Recorded answers and grade.
    Practice(PracticeQuiz),
    /// Visible exam tab.
    Exam(ExamTab),
    /// Clarifications have no local state.
    Clarification,
}

impl Interaction {
    fn for_artifact(artifact: &Artifact) -> Self {
        match artifact {
            Artifact::Flashcards(deck) => Self::Flashcards(FlashcardNavigator::new(deck)),
            Artifact::Practice(_) => Self::Practice(PracticeQuiz::new()),
            Artifact::Exam(_) => Self::Exam(ExamTab::default()),
            Artifact::Clarification(_) => Self::Clarification,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct Displayed {
    artifact: Artifact,
    interaction: Interaction,
}

#[derive(Debug, Clone, PartialEq)]
enum State {
    Idle,
    Awaiting,
    Displaying(Box<Displayed>),
}

// ============================================================================
// Controller
// ============================================================================

/// Drives one user's study session over a [`RequestSink`].
#[derive(Debug)]
pub struct SessionController<S> {
    sink: S,
    state: State,
    status: Option<String>,
    input: String,
    connected: bool,
    server_session_id: Option<String>,
}

impl<S: RequestSink> SessionController<S> {
    /// Creates an idle controller sending through `sink`.
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            state: State::Idle,
            status: None,
            input: String::new(),
            connected: false,
            server_session_id: None,
        }
    }

    // ------------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------------

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> SessionPhase {
        match self.state {
            State::Idle => SessionPhase::Idle,
            State::Awaiting => SessionPhase::Awaiting,
            State::Displaying(_) => SessionPhase::Displaying,
        }
    }

    /// Progress or error text to show the user.
    #[must_use]
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    /// The request text being edited.
    #[must_use]
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Replaces the request text being edited.
    pub fn set_input(&mut self, text: impl Into<String>) {
        self.input = text.into();
    }

    /// Connectivity indicator, driven by connection events.
    #[must_use]
    pub const fn is_connected(&self) -> bool {
        self.connected
    }

    /// Session id the backend announced, if any.
    #[must_use]
    pub fn server_session_id(&self) -> Option<&str> {
        self.server_session_id.as_deref()
    }

    /// The artifact on screen.
    #[must_use]
    pub fn artifact(&self) -> Option<&Artifact> {
        match &self.state {
            State::Displaying(displayed) => Some(&displayed.artifact),
            State::Idle | State::Awaiting => None,
        }
    }

    /// The artifact on screen together with its interactive state.
    #[must_use]
    pub fn displayed(&self) -> Option<(&Artifact, &Interaction)> {
        match &self.state {
            State::Displaying(displayed) => Some((&displayed.artifact, &displayed.interaction)),
            State::Idle | State::Awaiting => None,
        }
    }

    /// The request sink.
    pub const fn sink(&self) -> &S {
        &self.sink
    }

    /// Mutable access to the request sink.
    pub fn sink_mut(&mut self) -> &mut S {
        &mut self.sink
    }

    /// Consumes the controller, returning the sink.
    pub fn into_sink(self) -> S {
        self.sink
    }

    /// The clarification on screen.
    #[must_use]
    pub fn clarification(&self) -> Option<&Clarification> {
        match self.artifact()? {
            Artifact::Clarification(clarification) => Some(clarification),
            _ => None,
        }
    }

    /// The deck on screen with its navigator.
    #[must_use]
    pub fn flashcards(&self) -> Option<(&FlashcardDeck, &FlashcardNavigator)> {
        match &self.state {
            State::Displaying(displayed) => match (&displayed.artifact, &displayed.interaction) {
                (Artifact::Flashcards(deck), Interaction::Flashcards(nav)) => Some((deck, nav)),
                _ => None,
            },
            State::Idle | State::Awaiting => None,
        }
    }

    /// The deck on screen with a mutable navigator.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::WrongArtifact` if no deck is displayed.
    pub fn flashcards_mut(&mut self) -> Result<(&FlashcardDeck, &mut FlashcardNavigator)> {
        let actual = self.describe();
        if let State::Displaying(displayed) = &mut self.state {
            if let (Artifact::Flashcards(deck), Interaction::Flashcards(nav)) =
                (&displayed.artifact, &mut displayed.interaction)
            {
                return Ok((deck, nav));
            }
        }
        Err(StudyError::wrong_artifact("flashcard deck", actual))
    }

    /// The practice set on screen with its quiz state.
    #[must_use]
    pub fn practice(&self) -> Option<(&PracticeSet, &PracticeQuiz)> {
        match &self.state {
            State::Displaying(displayed) => match (&displayed.artifact, &displayed.interaction) {
                (Artifact::Practice(set), Interaction::Practice(quiz)) => Some((set, quiz)),
                _ => None,
            },
            State::Idle | State::Awaiting => None,
        }
    }

    /// The practice set on screen with mutable quiz state.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::WrongArtifact` if no practice set is displayed.
    pub fn practice_mut(&mut self) -> Result<(&PracticeSet, &mut PracticeQuiz)> {
        let actual = self.describe();
        if let State::Displaying(displayed) = &mut self.state {
            if let (Artifact::Practice(set), Interaction::Practice(quiz)) =
                (&displayed.artifact, &mut displayed.interaction)
            {
                return Ok((set, quiz));
            }
        }
        Err(StudyError::wrong_artifact("practice set", actual))
    }

    /// The exam on screen with the visible tab.
    #[must_use]
    pub fn exam(&self) -> Option<(&Exam, ExamTab)> {
        match &self.state {
            State::Displaying(displayed) => match (&displayed.artifact, &displayed.interaction) {
                (Artifact::Exam(exam), Interaction::Exam(tab)) => Some((exam, *tab)),
                _ => None,
            },
            State::Idle | State::Awaiting => None,
        }
    }

    /// Switches between the exam paper and its answer key.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::WrongArtifact` if no exam is displayed.
    pub fn toggle_exam_tab(&mut self) -> Result<ExamTab> {
        let actual = self.describe();
        if let State::Displaying(displayed) = &mut self.state {
            if let Interaction::Exam(tab) = &mut displayed.interaction {
                *tab = tab.toggled();
                return Ok(*tab);
            }
        }
        Err(StudyError::wrong_artifact("exam", actual))
    }

    // ------------------------------------------------------------------------
    // User Actions
    // ------------------------------------------------------------------------

    /// Sends a study request.
    ///
    /// On success the previous artifact is discarded, the status cleared and
    /// the session waits for the reply.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::SubmitRejected` without touching any state when a
    /// request is already outstanding, the text is blank, or the channel is
    /// not open.
    pub fn submit(&mut self, text: &str) -> Result<()> {
        let reason = if !self.phase().accepts_submit() {
            Some(RejectReason::Busy)
        } else if text.trim().is_empty() {
            Some(RejectReason::EmptyInput)
        } else if !self.sink.is_open() || !self.sink.send_request(text) {
            Some(RejectReason::NotConnected)
        } else {
            None
        };

        if let Some(reason) = reason {
            tracing::debug!(%reason, phase = %self.phase(), "Submit rejected");
            return Err(StudyError::rejected(reason));
        }

        tracing::info!(from = %self.phase(), "Request submitted");
        self.input = text.to_string();
        self.status = None;
        self.state = State::Awaiting;
        Ok(())
    }

    /// Submits the current input text.
    ///
    /// # Errors
    ///
    /// Same as [`submit`](Self::submit).
    pub fn submit_input(&mut self) -> Result<()> {
        let text = self.input.clone();
        self.submit(&text)
    }

    /// Clears the artifact, status and input, returning to idle.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::InvalidStateTransition` unless an artifact is displayed.
    pub fn reset(&mut self) -> Result<()> {
        if self.phase() != SessionPhase::Displaying {
            return Err(StudyError::invalid_transition(
                self.phase(),
                SessionPhase::Idle,
            ));
        }
        self.state = State::Idle;
        self.status = None;
        self.input.clear();
        tracing::debug!("Session reset");
        Ok(())
    }

    /// Takes clarification option `index` (0-based) as the new input.
    ///
    /// The clarification is dismissed and the session returns to idle, ready
    /// for [`submit_input`](Self::submit_input).
    ///
    /// # Errors
    ///
    /// Returns `StudyError::WrongArtifact` if no clarification is displayed
    /// and `StudyError::NotFound` for an index past the last option.
    pub fn choose_clarification(&mut self, index: usize) -> Result<&str> {
        let clarification = self
            .clarification()
            .ok_or_else(|| StudyError::wrong_artifact("clarification", self.describe()))?;
        let choice = clarification
            .options
            .get(index)
            .cloned()
            .ok_or_else(|| StudyError::not_found("option", index + 1))?;

        tracing::debug!(choice = %choice, "Clarification chosen");
        self.input = choice;
        self.state = State::Idle;
        Ok(&self.input)
    }

    // ------------------------------------------------------------------------
    // Connection Input
    // ------------------------------------------------------------------------

    /// Applies one event from the connection manager.
    pub fn handle_event(&mut self, event: ConnectionEvent) {
        match event {
            ConnectionEvent::Opened => {
                self.connected = true;
                self.status = None;
            }
            ConnectionEvent::Closed => {
                self.connected = false;
            }
            ConnectionEvent::Message(message) => self.handle_message(message),
            ConnectionEvent::InvalidContent { reason } => {
                let awaiting = self.phase() == SessionPhase::Awaiting;
                tracing::warn!(%reason, awaiting, "Study content rejected");
                self.status = Some(format!("Error: {reason}"));
                if awaiting {
                    self.state = State::Idle;
                }
            }
            ConnectionEvent::ProtocolError { raw, reason } => {
                tracing::warn!(%reason, len = raw.len(), "Ignoring malformed backend message");
            }
        }
    }

    /// Applies one decoded backend message.
    pub fn handle_message(&mut self, message: ServerMessage) {
        let awaiting = self.phase() == SessionPhase::Awaiting;

        match message {
            ServerMessage::Connected {
                session_id,
                message,
            } => {
                tracing::info!(?session_id, greeting = %message, "Backend session started");
                self.server_session_id = session_id;
            }
            ServerMessage::Status { message } => {
                if awaiting {
                    self.status = Some(message);
                } else {
                    tracing::debug!(status = %message, phase = %self.phase(), "Ignoring status");
                }
            }
            ServerMessage::StudyContent { data } => {
                if !awaiting {
                    tracing::warn!(mode = %data.mode(), phase = %self.phase(), "Unsolicited study content");
                }
                tracing::info!(mode = %data.mode(), "Displaying study content");
                let interaction = Interaction::for_artifact(&data);
                self.state = State::Displaying(Box::new(Displayed {
                    artifact: data,
                    interaction,
                }));
                self.status = None;
            }
            ServerMessage::Message { data } => {
                if awaiting {
                    self.state = State::Idle;
                    self.status = Some(data.message);
                } else {
                    tracing::debug!(phase = %self.phase(), "Ignoring plain reply");
                }
            }
            ServerMessage::Error { message } => {
                tracing::warn!(error = %message, awaiting, "Backend reported an error");
                self.status = Some(StudyError::backend(message).to_string());
                if awaiting {
                    self.state = State::Idle;
                }
            }
        }
    }

    fn describe(&self) -> String {
        self.artifact()
            .map_or_else(|| self.phase().to_string(), |a| a.mode().to_string())
    }
}

// ============================================================================
// Tests
// ============================================================================
