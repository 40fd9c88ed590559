//! StudyAI client core
//!
//! Keeps a persistent channel to the study-content backend, turns its
//! replies into session state, and provides the interactive pieces for each
//! artifact: flashcard navigation, practice grading and exam layout.

pub mod artifact;
pub mod config;
pub mod connection;
pub mod error;
pub mod exam;
pub mod flashcards;
pub mod grading;
pub mod protocol;
pub mod session;

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod proptests;

pub use artifact::{
    Artifact, ArtifactMode, Clarification, Exam, ExamQuestion, ExamQuestionKind, Flashcard,
    FlashcardDeck, PracticeSet, Question, QuestionKind, Section,
};
pub use config::{Config, SERVER_URL_ENV};
pub use connection::{
    ClientId, ConnectionEvent, ConnectionManager, ConnectionState, RequestSink,
};
pub use error::{ErrorClass, RejectReason, Result, StudyError};
pub use exam::{AnswerKeyEntry, ExamBody, ExamFormatter, ExamTab, ResponseArea};
pub use flashcards::{DeckView, FlashcardNavigator, Progress, FLIP_BACK_DELAY};
pub use grading::{grade, GradeBand, GradeReport, PracticeQuiz, Verdict};
pub use protocol::{ClientMessage, ServerMessage};
pub use session::{Interaction, SessionController, SessionPhase};
