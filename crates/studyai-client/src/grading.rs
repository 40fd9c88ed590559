//! Grading engine for practice quizzes.
//!
//! [`grade`] is a pure function from a practice set and the recorded answers
//! to a [`GradeReport`]. [`PracticeQuiz`] holds the answers a user gives and
//! locks them once the set has been graded.
//!
//! Only multiple-choice and true/false questions are gradable. Short answers
//! are collected for self-review and never affect the score.

use std::collections::HashMap;

use crate::artifact::{PracticeSet, Question, QuestionKind};
use crate::error::{Result, StudyError};

/// Lowest percentage in the high band.
pub const HIGH_BAND_MIN: u32 = 90;

/// Lowest percentage in the middle band.
pub const MID_BAND_MIN: u32 = 70;

/// The two answers a true/false question accepts.
pub const TRUE_FALSE_OPTIONS: [&str; 2] = ["True", "False"];

// ============================================================================
// Report Types
// ============================================================================

/// Feedback tone for a graded set. Not a stored grade.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GradeBand {
    /// 90% and above.
    High,
    /// 70% to 89%.
    Mid,
    /// Below 70%.
    Low,
}

impl GradeBand {
    /// Returns the band a percentage falls in.
    #[must_use]
    pub const fn from_percentage(percentage: u32) -> Self {
        if percentage >= HIGH_BAND_MIN {
            Self::High
        } else if percentage >= MID_BAND_MIN {
            Self::Mid
        } else {
            Self::Low
        }
    }

    /// Feedback line shown with the score.
    #[must_use]
    pub const fn feedback(self) -> &'static str {
        match self {
            Self::High => "Excellent work!",
            Self::Mid => "Good job! Review the missed ones.",
            Self::Low => "Keep studying and try again!",
        }
    }

    /// Returns `true` for the bands shown as a pass.
    #[must_use]
    pub const fn is_passing(self) -> bool {
        matches!(self, Self::High | Self::Mid)
    }
}

/// Result for one question.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Answered and matches the correct answer.
    Correct,
    /// Answered with something else.
    Incorrect,
    /// Gradable but left blank; counts as incorrect.
    Unanswered,
    /// Short answer; excluded from the score.
    NotGraded,
}

impl Verdict {
    /// Returns `true` only for [`Verdict::Correct`].
    #[must_use]
    pub const fn is_correct(self) -> bool {
        matches!(self, Self::Correct)
    }
}

/// Per-question grading outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionOutcome {
    /// The question graded.
    pub question_id: u32,
    /// The verdict.
    pub verdict: Verdict,
    /// The recorded answer, if any.
    pub given: Option<String>,
}

/// Outcome of grading a practice set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GradeReport {
    /// Correct gradable questions.
    pub score: u32,
    /// Gradable questions.
    pub denominator: u32,
    /// `round(score / denominator * 100)`, or 0 with no gradable questions.
    pub percentage: u32,
    /// Feedback band for `percentage`.
    pub band: GradeBand,
    /// One outcome per question, in set order.
    pub outcomes: Vec<QuestionOutcome>,
    /// Whether the set has short answers left for self-review.
    pub has_ungraded: bool,
}

impl GradeReport {
    /// Looks up the outcome for a question.
    #[must_use]
    pub fn outcome(&self, question_id: u32) -> Option<&QuestionOutcome> {
        self.outcomes.iter().find(|o| o.question_id == question_id)
    }
}

// ============================================================================
// Pure Grading
// ============================================================================

/// Grades `answers` (question id to recorded answer) against `set`.
///
/// Answers for short-answer questions are ignored even if present.
#[must_use]
pub fn grade(set: &PracticeSet, answers: &HashMap<u32, String>) -> GradeReport {
    let outcomes: Vec<QuestionOutcome> = set
        .questions
        .iter()
        .map(|question| {
            let given = answers.get(&question.id).cloned();
            let verdict = if !question.kind.is_gradable() {
                Verdict::NotGraded
            } else {
                match &given {
                    None => Verdict::Unanswered,
                    Some(answer) if answers_match(answer, &question.correct_answer) => {
                        Verdict::Correct
                    }
                    Some(_) => Verdict::Incorrect,
                }
            };
            QuestionOutcome {
                question_id: question.id,
                verdict,
                given,
            }
        })
        .collect();

    let score = count_u32(outcomes.iter().filter(|o| o.verdict.is_correct()).count());
    let denominator = count_u32(
        set.questions
            .iter()
            .filter(|q| q.kind.is_gradable())
            .count(),
    );
    let percentage = percentage(score, denominator);

    GradeReport {
        score,
        denominator,
        percentage,
        band: GradeBand::from_percentage(percentage),
        has_ungraded: outcomes.iter().any(|o| o.verdict == Verdict::NotGraded),
        outcomes,
    }
}

/// Rounds `score / denominator` to a whole percentage, half up.
///
/// Returns 0 when `denominator` is 0.
#[must_use]
pub fn percentage(score: u32, denominator: u32) -> u32 {
    if denominator == 0 {
        return 0;
    }
    let score = u64::from(score.min(denominator));
    let denominator = u64::from(denominator);
    let rounded = (score * 200 + denominator) / (denominator * 2);
    u32::try_from(rounded).unwrap_or(100)
}

/// Case-insensitive answer comparison. No whitespace or punctuation folding.
#[must_use]
pub fn answers_match(given: &str, expected: &str) -> bool {
    given.to_lowercase() == expected.to_lowercase()
}

/// Returns the label an option records as its answer: its leading character.
///
/// `"B) Paris"` records as `"B"`.
#[must_use]
pub fn option_label(option: &str) -> Option<String> {
    option.trim_start().chars().next().map(String::from)
}

fn count_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

// ============================================================================
// Quiz State
// ============================================================================

/// Where a quiz is in its one-way lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuizPhase {
    /// Answers can still change.
    Answering,
    /// Graded; answers are read-only.
    Graded(GradeReport),
}

/// Answers a user has given for one practice set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PracticeQuiz {
    answers: HashMap<u32, String>,
    short_answers: HashMap<u32, String>,
    phase: QuizPhase,
}

impl Default for PracticeQuiz {
    fn default() -> Self {
        Self::new()
    }
}

impl PracticeQuiz {
    /// Creates an empty quiz in the answering phase.
    #[must_use]
    pub fn new() -> Self {
        Self {
            answers: HashMap::new(),
            short_answers: HashMap::new(),
            phase: QuizPhase::Answering,
        }
    }

    /// Records a choice for a multiple-choice or true/false question.
    ///
    /// For multiple choice, `choice` may be the full option text or its
    /// label; the label is recorded. For true/false, `choice` must be
    /// "True" or "False" (any case); the canonical spelling is recorded.
    ///
    /// # Errors
    ///
    /// - `AlreadyGraded` once the quiz has been submitted
    /// - `InvalidChoice` if the choice does not belong to the question, or
    ///   the question is a short answer
    pub fn select(&mut self, question: &Question, choice: &str) -> Result<()> {
        self.ensure_answering()?;

        let recorded = match question.kind {
            QuestionKind::MultipleChoice => question
                .options
                .iter()
                .flatten()
                .find(|opt| {
                    opt.as_str() == choice
                        || option_label(opt).is_some_and(|label| answers_match(&label, choice.trim()))
                })
                .and_then(|opt| option_label(opt)),
            QuestionKind::TrueFalse => TRUE_FALSE_OPTIONS
                .iter()
                .find(|opt| answers_match(opt, choice.trim()))
                .map(|opt| (*opt).to_string()),
            QuestionKind::ShortAnswer => None,
        };

        let Some(answer) = recorded else {
            return Err(StudyError::invalid_choice(question.id, choice));
        };

        tracing::debug!(question_id = question.id, answer = %answer, "Answer selected");
        self.answers.insert(question.id, answer);
        Ok(())
    }

    /// Stores free text for a short-answer question.
    ///
    /// # Errors
    ///
    /// - `AlreadyGraded` once the quiz has been submitted
    /// - `InvalidChoice` if the question is not a short answer
    pub fn write_short_answer(&mut self, question: &Question, text: impl Into<String>) -> Result<()> {
        self.ensure_answering()?;
        let text = text.into();
        if question.kind != QuestionKind::ShortAnswer {
            return Err(StudyError::invalid_choice(question.id, text));
        }
        self.short_answers.insert(question.id, text);
        Ok(())
    }

    /// The recorded answer for a gradable question.
    #[must_use]
    pub fn answer(&self, question_id: u32) -> Option<&str> {
        self.answers.get(&question_id).map(String::as_str)
    }

    /// The free text written for a short-answer question.
    #[must_use]
    pub fn short_answer(&self, question_id: u32) -> Option<&str> {
        self.short_answers.get(&question_id).map(String::as_str)
    }

    /// Number of gradable answers recorded.
    #[must_use]
    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// Returns `true` if the quiz can be submitted for grading.
    #[must_use]
    pub fn can_submit(&self) -> bool {
        !self.is_graded() && !self.answers.is_empty()
    }

    /// Grades the quiz against `set` and locks the answers.
    ///
    /// # Errors
    ///
    /// - `AlreadyGraded` if called a second time
    /// - `NothingAnswered` if no gradable answer was recorded
    pub fn submit(&mut self, set: &PracticeSet) -> Result<&GradeReport> {
        self.ensure_answering()?;
        if self.answers.is_empty() {
            return Err(StudyError::NothingAnswered);
        }

        let report = grade(set, &self.answers);
        tracing::info!(
            score = report.score,
            denominator = report.denominator,
            percentage = report.percentage,
            "Practice set graded"
        );
        self.phase = QuizPhase::Graded(report);
        self.report().ok_or(StudyError::NotGraded)
    }

    /// The grade report, once graded.
    #[must_use]
    pub const fn report(&self) -> Option<&GradeReport> {
        match &self.phase {
            QuizPhase::Graded(report) => Some(report),
            QuizPhase::Answering => None,
        }
    }

    /// Returns `true` once the quiz has been graded.
    #[must_use]
    pub const fn is_graded(&self) -> bool {
        matches!(self.phase, QuizPhase::Graded(_))
    }

    /// The current phase.
    #[must_use]
    pub const fn phase(&self) -> &QuizPhase {
        &self.phase
    }

    const fn ensure_answering(&self) -> Result<()> {
        if self.is_graded() {
            return Err(StudyError::AlreadyGraded);
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================
