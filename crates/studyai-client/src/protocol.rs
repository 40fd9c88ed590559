//! Wire protocol between the client and the generation backend.
//!
//! All frames are JSON text. The client sends a single request shape; the
//! backend replies with messages discriminated by their `type` field.
//!
//! # Message Types
//!
//! - `connected` - Sent by the backend when the channel opens
//! - `status` - Progress text while a request is being generated
//! - `study_content` - The finished artifact, tagged by `mode`
//! - `message` - Plain-text reply when the backend could not produce an artifact
//! - `error` - The request failed
//!
//! # Example
//!
//! ```
//! use studyai_client::protocol::{ClientMessage, ServerMessage};
//!
//! let request = ClientMessage::new("Quiz me on the Civil War");
//! assert_eq!(request.encode().unwrap(), r#"{"message":"Quiz me on the Civil War"}"#);
//!
//! let reply = ServerMessage::decode(r#"{"type":"status","message":"Generating..."}"#).unwrap();
//! assert_eq!(reply.type_name(), "status");
//! ```

use serde::{Deserialize, Serialize};

use crate::artifact::Artifact;
use crate::error::{Result, StudyError};

// ============================================================================
// Client -> Server
// ============================================================================

/// A study request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientMessage {
    /// The raw request text.
    pub message: String,
}

impl ClientMessage {
    /// Creates a request carrying `message`.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Serializes the request to its JSON text frame.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
}

// ============================================================================
// Server -> Client
// ============================================================================

/// Payload of a plain-text `message` reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlainReply {
    /// The reply text.
    pub message: String,
}

/// Messages the backend sends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// The backend accepted the channel.
    Connected {
        /// Backend session identifier.
        #[serde(default)]
        session_id: Option<String>,
        /// Greeting text.
        #[serde(default)]
        message: String,
    },
    /// Progress update for the outstanding request.
    Status {
        /// Human-readable progress text.
        message: String,
    },
    /// The generated artifact.
    StudyContent {
        /// The artifact, tagged by `mode`.
        data: Artifact,
    },
    /// Non-structured reply to the outstanding request.
    Message {
        /// The reply body.
        data: PlainReply,
    },
    /// The outstanding request failed.
    Error {
        /// Failure description.
        message: String,
    },
}

impl ServerMessage {
    /// Parses and validates one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::MalformedMessage` for frames that are not valid
    /// JSON or carry an unknown `type`, and `StudyError::InvalidArtifact`
    /// for a `study_content` frame whose payload does not decode or breaks
    /// an artifact invariant.
    pub fn decode(text: &str) -> Result<Self> {
        let value: serde_json::Value =
            serde_json::from_str(text).map_err(|e| StudyError::malformed(e.to_string()))?;

        if value.get("type").and_then(serde_json::Value::as_str) == Some("study_content") {
            let data = value.get("data").cloned().unwrap_or_default();
            return Artifact::decode(data).map(Self::study_content);
        }

        serde_json::from_value(value).map_err(|e| StudyError::malformed(e.to_string()))
    }

    /// Creates a `Status` message.
    #[must_use]
    pub fn status(message: impl Into<String>) -> Self {
        Self::Status {
            message: message.into(),
        }
    }

    /// Creates a `StudyContent` message.
    #[must_use]
    pub const fn study_content(data: Artifact) -> Self {
        Self::StudyContent { data }
    }

    /// Creates an `Error` message.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Returns the message `type` as it appears on the wire.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::Status { .. } => "status",
            Self::StudyContent { .. } => "study_content",
            Self::Message { .. } => "message",
            Self::Error { .. } => "error",
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
