//! Study artifact types decoded from `study_content` payloads.
//!
//! The backend tags every payload with a `mode` field; [`Artifact`] is the
//! closed set of shapes it can take. Field names follow the backend's JSON,
//! while the Rust names describe what each field means.

use std::collections::HashSet;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{Result, StudyError};

// ============================================================================
// Artifact
// ============================================================================

/// The single structured study object currently being displayed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum Artifact {
    /// A deck of flip cards.
    Flashcards(FlashcardDeck),
    /// A self-graded practice quiz.
    Practice(PracticeSet),
    /// A printable exam with answer key.
    Exam(Exam),
    /// A request to disambiguate the study request.
    Clarification(Clarification),
}

/// Discriminant of [`Artifact`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactMode {
    /// Flashcard deck.
    Flashcards,
    /// Practice quiz.
    Practice,
    /// Printable exam.
    Exam,
    /// Clarification prompt.
    Clarification,
}

impl std::fmt::Display for ArtifactMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Flashcards => write!(f, "flashcards"),
            Self::Practice => write!(f, "practice"),
            Self::Exam => write!(f, "exam"),
            Self::Clarification => write!(f, "clarification"),
        }
    }
}

impl Artifact {
    /// Decodes and validates a `study_content` payload.
    ///
    /// # Errors
    ///
    /// Returns `StudyError::InvalidArtifact` if the payload does not match
    /// any mode's shape or breaks an invariant (see [`Artifact::validate`]).
    pub fn decode(value: serde_json::Value) -> Result<Self> {
        let mode = value
            .get("mode")
            .and_then(serde_json::Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let artifact: Self = serde_json::from_value(value)
            .map_err(|e| StudyError::invalid_artifact(mode, e.to_string()))?;
        artifact.validate()?;
        Ok(artifact)
    }

    /// Returns which mode this artifact is.
    #[must_use]
    pub const fn mode(&self) -> ArtifactMode {
        match self {
            Self::Flashcards(_) => ArtifactMode::Flashcards,
            Self::Practice(_) => ArtifactMode::Practice,
            Self::Exam(_) => ArtifactMode::Exam,
            Self::Clarification(_) => ArtifactMode::Clarification,
        }
    }

    /// Checks the invariants the interactive components rely on.
    ///
    /// - clarification options are non-empty
    /// - card ids are unique within a deck
    /// - question ids are unique within a practice set
    /// - multiple-choice practice questions carry at least one option
    pub fn validate(&self) -> Result<()> {
        match self {
            Self::Flashcards(deck) => deck.validate(),
            Self::Practice(set) => set.validate(),
            Self::Exam(_) => Ok(()),
            Self::Clarification(clarification) => clarification.validate(),
        }
    }
}

// ============================================================================
// Clarification
// ============================================================================

/// A backend request for disambiguating input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Clarification {
    /// The question put to the user.
    pub message: String,
    /// The choices offered, in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<String>,
}

impl Clarification {
    fn validate(&self) -> Result<()> {
        if self.options.is_empty() {
            return Err(StudyError::invalid_artifact(
                ArtifactMode::Clarification.to_string(),
                "no options to choose from",
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Flashcards
// ============================================================================

/// A single flip card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flashcard {
    /// Identifier, unique within the deck.
    pub id: u32,
    /// Front of the card.
    pub term: String,
    /// Back of the card.
    pub definition: String,
    /// Memory aid shown on the back.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    /// Real-world usage shown on the back.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub example: Option<String>,
    /// Subcategory shown on the front.
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

/// A deck of flashcards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlashcardDeck {
    /// Deck title.
    #[serde(rename = "deck_title", default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Subject area.
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    /// Difficulty label (e.g. "beginner").
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: String,
    /// Card count as advertised by the backend; `cards.len()` is authoritative.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_count: Option<u32>,
    /// Cards in study order.
    #[serde(rename = "flashcards", default, deserialize_with = "null_as_default")]
    pub cards: Vec<Flashcard>,
    /// Study tips for the deck.
    #[serde(rename = "study_tips", default, deserialize_with = "null_as_default")]
    pub tips: Vec<String>,
}

impl FlashcardDeck {
    /// Number of cards actually present.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cards.len()
    }

    /// Returns `true` if the deck has no cards.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    fn validate(&self) -> Result<()> {
        if let Some(id) = first_duplicate(self.cards.iter().map(|c| c.id)) {
            return Err(StudyError::invalid_artifact(
                ArtifactMode::Flashcards.to_string(),
                format!("duplicate card id {id}"),
            ));
        }
        Ok(())
    }
}

// ============================================================================
// Practice
// ============================================================================

/// Kind of a practice question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionKind {
    /// Pick one labelled option.
    MultipleChoice,
    /// Pick "True" or "False".
    TrueFalse,
    /// Free text, never auto-graded.
    ShortAnswer,
}

impl QuestionKind {
    /// Returns `true` if answers of this kind are scored automatically.
    #[must_use]
    pub const fn is_gradable(self) -> bool {
        !matches!(self, Self::ShortAnswer)
    }
}

impl std::fmt::Display for QuestionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MultipleChoice => write!(f, "multiple choice"),
            Self::TrueFalse => write!(f, "true false"),
            Self::ShortAnswer => write!(f, "short answer"),
        }
    }
}

/// A practice question.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Question {
    /// Identifier, unique within the set.
    pub id: u32,
    /// Question kind.
    #[serde(rename = "type")]
    pub kind: QuestionKind,
    /// Bloom's taxonomy level (e.g. "apply").
    #[serde(default, deserialize_with = "null_as_default")]
    pub bloom_level: String,
    /// The question text.
    #[serde(rename = "question")]
    pub prompt: String,
    /// Labelled options such as `"A) Paris"`; required for multiple choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Option label, `"True"`/`"False"`, or a model answer for short answers.
    #[serde(rename = "answer", default, deserialize_with = "null_as_default")]
    pub correct_answer: String,
    /// Why the answer is correct.
    #[serde(default, deserialize_with = "null_as_default")]
    pub explanation: String,
    /// Points a short answer should cover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_points: Option<Vec<String>>,
}

/// A practice question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PracticeSet {
    /// Topic of the set.
    #[serde(default, deserialize_with = "null_as_default")]
    pub topic: String,
    /// Question count as advertised by the backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub question_count: Option<u32>,
    /// Difficulty label.
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: String,
    /// Bloom's levels the set covers.
    #[serde(rename = "bloom_levels_covered", default, deserialize_with = "null_as_default")]
    pub bloom_levels: Vec<String>,
    /// Questions in display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<Question>,
    /// Follow-up study advice, shown after grading.
    #[serde(rename = "study_recommendations", default, deserialize_with = "null_as_default")]
    pub recommendations: Vec<String>,
}

impl PracticeSet {
    /// Looks up a question by id.
    #[must_use]
    pub fn question(&self, id: u32) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }

    fn validate(&self) -> Result<()> {
        let mode = ArtifactMode::Practice.to_string();
        if let Some(id) = first_duplicate(self.questions.iter().map(|q| q.id)) {
            return Err(StudyError::invalid_artifact(
                mode,
                format!("duplicate question id {id}"),
            ));
        }
        for question in &self.questions {
            let has_options = question.options.as_ref().is_some_and(|o| !o.is_empty());
            if question.kind == QuestionKind::MultipleChoice && !has_options {
                return Err(StudyError::invalid_artifact(
                    mode,
                    format!("multiple choice question {} has no options", question.id),
                ));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Exam
// ============================================================================

/// Kind of an exam question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExamQuestionKind {
    /// Labelled options.
    MultipleChoice,
    /// True or false statement.
    TrueFalse,
    /// A few sentences.
    ShortAnswer,
    /// Extended response.
    Essay,
    /// Any type the backend invents; rendered without a response area.
    #[serde(other)]
    Other,
}

/// A question on an exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExamQuestion {
    /// Identifier; the answer key is keyed by this number.
    pub id: u32,
    /// Question kind.
    #[serde(rename = "type")]
    pub kind: ExamQuestionKind,
    /// The question text.
    #[serde(rename = "question")]
    pub prompt: String,
    /// Labelled options for multiple choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    /// Point value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub points: u32,
    /// Grading guidance for open questions.
    #[serde(
        rename = "grading_rubric",
        default,
        deserialize_with = "empty_as_none",
        skip_serializing_if = "Option::is_none"
    )]
    pub rubric: Option<String>,
}

/// A titled group of exam questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section number.
    #[serde(rename = "section_number")]
    pub number: u32,
    /// Section title (e.g. "Part I: Multiple Choice").
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Section instructions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: String,
    /// Uniform point value, when the section has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub point_value_per_question: Option<u32>,
    /// Questions in order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub questions: Vec<ExamQuestion>,
}

/// A complete printable exam.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exam {
    /// Exam title.
    #[serde(rename = "exam_title", default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Subject area.
    #[serde(default, deserialize_with = "null_as_default")]
    pub subject: String,
    /// Total point value.
    #[serde(default, deserialize_with = "null_as_default")]
    pub total_points: u32,
    /// Time allowed.
    #[serde(default, deserialize_with = "null_as_default")]
    pub time_limit_minutes: u32,
    /// Difficulty label.
    #[serde(default, deserialize_with = "null_as_default")]
    pub difficulty: String,
    /// General instructions.
    #[serde(default, deserialize_with = "null_as_default")]
    pub instructions: String,
    /// Sections in order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub sections: Vec<Section>,
    /// Question number to answer, in the order the backend sent them.
    /// See [`Exam::ordered_answer_key`] for display order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub answer_key: IndexMap<String, String>,
    /// Question type to total points.
    #[serde(default, deserialize_with = "null_as_default")]
    pub point_distribution: IndexMap<String, u32>,
    /// Letter grade to score range.
    #[serde(default, deserialize_with = "null_as_default")]
    pub grading_scale: IndexMap<String, String>,
}

impl Exam {
    /// Answer key in display order: numeric question keys ascending, then
    /// any other keys in the order the backend sent them.
    #[must_use]
    pub fn ordered_answer_key(&self) -> Vec<(&str, &str)> {
        let (mut numbered, named): (Vec<_>, Vec<_>) = self
            .answer_key
            .iter()
            .map(|(question, answer)| (question_number(question), question.as_str(), answer.as_str()))
            .partition(|(number, _, _)| number.is_some());
        numbered.sort_by_key(|(number, _, _)| *number);

        numbered
            .into_iter()
            .chain(named)
            .map(|(_, question, answer)| (question, answer))
            .collect()
    }
}

/// Parses a canonical question number: digits only, no leading zeros.
fn question_number(key: &str) -> Option<u32> {
    key.parse::<u32>().ok().filter(|n| n.to_string() == key)
}

// ============================================================================
// Helpers
// ============================================================================

/// Treats an explicit `null` like a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Treats a missing, null, or blank string as `None`.
fn empty_as_none<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}

fn first_duplicate(mut ids: impl Iterator<Item = u32>) -> Option<u32> {
    let mut seen = HashSet::new();
    ids.find(|id| !seen.insert(*id))
}

// ============================================================================
// Tests
// ============================================================================
