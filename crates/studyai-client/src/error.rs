//! Error types for the StudyAI client.
//!
//! This module defines the error hierarchy for all client operations,
//! including configuration loading, protocol decoding, session transitions,
//! and the interactive quiz and flashcard state machines.

use std::path::PathBuf;

/// A specialized `Result` type for StudyAI client operations.
pub type Result<T> = std::result::Result<T, StudyError>;

/// Errors that can occur while running a study session.
///
/// Variants are grouped by the failure class they belong to (see
/// [`ErrorClass`]). None of them are fatal to a running session.
#[derive(Debug, thiserror::Error)]
pub enum StudyError {
    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Invalid JSON syntax in configuration file.
    #[error("Invalid JSON in config file '{path}': {message}\n\nSuggestion: Validate your studyai.json with a JSON linter")]
    ConfigParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse error.
        message: String,
    },

    /// Configuration validation failed.
    #[error("Invalid configuration: {message}\n\nSuggestion: {suggestion}")]
    ConfigValidationError {
        /// Description of the validation failure.
        message: String,
        /// Actionable suggestion for the user.
        suggestion: String,
    },

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// The channel to the backend was lost or could not be opened.
    #[error("Connection to '{url}' lost: {message}")]
    ConnectionLost {
        /// The endpoint that was being used.
        url: String,
        /// Description of the failure.
        message: String,
    },

    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// An inbound message could not be decoded.
    #[error("Malformed message from backend: {message}")]
    MalformedMessage {
        /// Description of the decode failure.
        message: String,
    },

    /// A `study_content` payload decoded but violates an artifact invariant.
    #[error("Invalid {mode} payload: {message}")]
    InvalidArtifact {
        /// The artifact mode being validated.
        mode: String,
        /// Which invariant was violated.
        message: String,
    },

    // ========================================================================
    // Backend Errors
    // ========================================================================
    /// The backend reported a failure for the outstanding request.
    #[error("Error: {message}")]
    Backend {
        /// The message text exactly as the backend sent it.
        message: String,
    },

    // ========================================================================
    // Input Validation Errors
    // ========================================================================
    /// A study request was rejected locally before reaching the network.
    #[error("Request not sent: {reason}")]
    SubmitRejected {
        /// Why the request was rejected.
        reason: RejectReason,
    },

    /// The practice set has already been graded; answers are read-only.
    #[error("Answers are locked: this practice set has already been graded")]
    AlreadyGraded,

    /// The practice set has not been graded yet.
    #[error("Practice set has not been graded yet")]
    NotGraded,

    /// No answers were recorded before grading.
    #[error("Select at least one answer before submitting")]
    NothingAnswered,

    /// The chosen option is not valid for the question.
    #[error("Invalid choice '{choice}' for question {question_id}")]
    InvalidChoice {
        /// The question being answered.
        question_id: u32,
        /// The rejected choice.
        choice: String,
    },

    /// The referenced question or option does not exist.
    #[error("Unknown {what}: {id}")]
    NotFound {
        /// The kind of thing being looked up (e.g. "question").
        what: &'static str,
        /// The identifier that was not found.
        id: String,
    },

    /// The operation needs a different artifact to be displayed.
    #[error("No {expected} is being displayed (current: {actual})")]
    WrongArtifact {
        /// The artifact mode the operation needs.
        expected: &'static str,
        /// What the session currently shows.
        actual: String,
    },

    // ========================================================================
    // State Machine Errors
    // ========================================================================
    /// Invalid state transition attempted.
    #[error("Invalid state transition: cannot go from {from} to {to}")]
    InvalidStateTransition {
        /// The current state.
        from: String,
        /// The attempted target state.
        to: String,
    },

    // ========================================================================
    // General I/O Errors
    // ========================================================================
    /// General I/O error during file operations.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Why a `submit` was rejected without a network round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// A request is already in flight.
    Busy,
    /// The request text was empty after trimming.
    EmptyInput,
    /// The channel to the backend is not open.
    NotConnected,
}

impl std::fmt::Display for RejectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "a request is already in progress"),
            Self::EmptyInput => write!(f, "the request is empty"),
            Self::NotConnected => write!(f, "not connected to the backend"),
        }
    }
}

/// Failure classes used to decide how an error is surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Channel dropped; retried automatically.
    ConnectionLoss,
    /// Malformed or unrecognized message; logged and ignored.
    Protocol,
    /// Backend-reported failure; shown to the user for manual retry.
    Backend,
    /// Rejected locally before any network interaction.
    InputValidation,
    /// Bad configuration; only reachable at host startup.
    Configuration,
}

impl StudyError {
    /// Creates a new `ConfigParseError` with the given path and message.
    #[must_use]
    pub fn config_parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ConfigParseError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a new `ConfigValidationError` with the given message and suggestion.
    #[must_use]
    pub fn config_validation(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self::ConfigValidationError {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }

    /// Creates a new `ConnectionLost` error.
    #[must_use]
    pub fn connection_lost(url: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConnectionLost {
            url: url.into(),
            message: message.into(),
        }
    }

    /// Creates a new `MalformedMessage` error.
    #[must_use]
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedMessage {
            message: message.into(),
        }
    }

    /// Creates a new `InvalidArtifact` error.
    #[must_use]
    pub fn invalid_artifact(mode: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidArtifact {
            mode: mode.into(),
            message: message.into(),
        }
    }

    /// Creates a new `Backend` error.
    #[must_use]
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Creates a new `SubmitRejected` error.
    #[must_use]
    pub const fn rejected(reason: RejectReason) -> Self {
        Self::SubmitRejected { reason }
    }

    /// Creates a new `InvalidChoice` error.
    #[must_use]
    pub fn invalid_choice(question_id: u32, choice: impl Into<String>) -> Self {
        Self::InvalidChoice {
            question_id,
            choice: choice.into(),
        }
    }

    /// Creates a new `NotFound` error.
    #[must_use]
    pub fn not_found(what: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Creates a new `WrongArtifact` error.
    #[must_use]
    pub fn wrong_artifact(expected: &'static str, actual: impl std::fmt::Display) -> Self {
        Self::WrongArtifact {
            expected,
            actual: actual.to_string(),
        }
    }

    /// Creates a new `InvalidStateTransition` error.
    #[must_use]
    pub fn invalid_transition(from: impl std::fmt::Display, to: impl std::fmt::Display) -> Self {
        Self::InvalidStateTransition {
            from: from.to_string(),
            to: to.to_string(),
        }
    }

    /// Returns the failure class this error belongs to.
    #[must_use]
    pub const fn class(&self) -> ErrorClass {
        match self {
            Self::ConfigParseError { .. } | Self::ConfigValidationError { .. } => {
                ErrorClass::Configuration
            }
            Self::ConnectionLost { .. } | Self::Io(_) => ErrorClass::ConnectionLoss,
            Self::MalformedMessage { .. } | Self::InvalidArtifact { .. } | Self::Json(_) => {
                ErrorClass::Protocol
            }
            Self::Backend { .. } => ErrorClass::Backend,
            Self::SubmitRejected { .. }
            | Self::AlreadyGraded
            | Self::NotGraded
            | Self::NothingAnswered
            | Self::InvalidChoice { .. }
            | Self::NotFound { .. }
            | Self::WrongArtifact { .. }
            | Self::InvalidStateTransition { .. } => ErrorClass::InputValidation,
        }
    }
}
