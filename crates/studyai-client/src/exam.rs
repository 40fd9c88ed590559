//! Printable exam layout.
//!
//! [`ExamFormatter`] turns an [`Exam`] into a renderer-neutral structure:
//! numbered questions, point labels and the response area each question
//! needs. It holds no state of its own; the only interactive piece of an
//! exam is which tab is visible, tracked by [`ExamTab`].

use crate::artifact::{Exam, ExamQuestion, ExamQuestionKind};

/// Blank lines left for a short answer.
pub const SHORT_ANSWER_LINES: usize = 3;

/// Blank lines left for an essay.
pub const ESSAY_LINES: usize = 8;

/// Which part of an exam is shown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExamTab {
    /// The question paper.
    #[default]
    Exam,
    /// The answer key.
    AnswerKey,
}

impl ExamTab {
    /// Returns the other tab.
    #[must_use]
    pub const fn toggled(self) -> Self {
        match self {
            Self::Exam => Self::AnswerKey,
            Self::AnswerKey => Self::Exam,
        }
    }
}

// ============================================================================
// Formatted Output
// ============================================================================

/// Where a student writes the answer to a question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseArea {
    /// Options listed under the question.
    Choices(Vec<String>),
    /// `True / False` on one line.
    TrueFalse,
    /// Blank writing lines, with an optional rubric hint.
    Lines {
        /// Number of blank lines.
        count: usize,
        /// Grading guidance shown beneath the lines.
        rubric: Option<String>,
    },
    /// Nothing beneath the question.
    None,
}

/// One question as it appears on the paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedQuestion {
    /// Number within its section, from 1.
    pub ordinal: usize,
    /// Backend identifier.
    pub id: u32,
    /// Question text.
    pub prompt: String,
    /// `1 pt` or `N pts`.
    pub points_label: String,
    /// Response area.
    pub response: ResponseArea,
}

/// A section as it appears on the paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormattedSection {
    /// Section title.
    pub title: String,
    /// Section instructions.
    pub instructions: String,
    /// Questions in order.
    pub questions: Vec<FormattedQuestion>,
}

/// Header block of the paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamHeader {
    /// Exam title.
    pub title: String,
    /// Subject.
    pub subject: String,
    /// Total points.
    pub total_points: u32,
    /// Time limit in minutes.
    pub time_limit_minutes: u32,
    /// Difficulty.
    pub difficulty: String,
    /// General instructions.
    pub instructions: String,
}

/// The full question paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExamBody {
    /// Header block.
    pub header: ExamHeader,
    /// Sections in order.
    pub sections: Vec<FormattedSection>,
    /// Question type to points, with type names humanized.
    pub point_distribution: Vec<(String, u32)>,
    /// Letter grade to range.
    pub grading_scale: Vec<(String, String)>,
}

/// One answer key line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnswerKeyEntry {
    /// Question number as keyed by the backend.
    pub question: String,
    /// Expected answer.
    pub answer: String,
}

// ============================================================================
// Formatter
// ============================================================================

/// Lays out an exam for display or print.
#[derive(Debug, Clone, Copy)]
pub struct ExamFormatter<'a> {
    exam: &'a Exam,
}

impl<'a> ExamFormatter<'a> {
    /// Creates a formatter over `exam`.
    #[must_use]
    pub const fn new(exam: &'a Exam) -> Self {
        Self { exam }
    }

    /// Builds the question paper.
    #[must_use]
    pub fn body(&self) -> ExamBody {
        let exam = self.exam;
        ExamBody {
            header: ExamHeader {
                title: exam.title.clone(),
                subject: exam.subject.clone(),
                total_points: exam.total_points,
                time_limit_minutes: exam.time_limit_minutes,
                difficulty: exam.difficulty.clone(),
                instructions: exam.instructions.clone(),
            },
            sections: exam
                .sections
                .iter()
                .map(|section| FormattedSection {
                    title: section.title.clone(),
                    instructions: section.instructions.clone(),
                    questions: section
                        .questions
                        .iter()
                        .enumerate()
                        .map(|(i, q)| format_question(i + 1, q))
                        .collect(),
                })
                .collect(),
            point_distribution: exam
                .point_distribution
                .iter()
                .map(|(kind, points)| (humanize(kind), *points))
                .collect(),
            grading_scale: exam
                .grading_scale
                .iter()
                .map(|(grade, range)| (grade.clone(), range.clone()))
                .collect(),
        }
    }

    /// Answer key entries, numbered questions first in ascending order.
    #[must_use]
    pub fn answer_key(&self) -> Vec<AnswerKeyEntry> {
        self.exam
            .ordered_answer_key()
            .into_iter()
            .map(|(question, answer)| AnswerKeyEntry {
                question: question.to_string(),
                answer: answer.to_string(),
            })
            .collect()
    }

    /// Total number of questions across all sections.
    #[must_use]
    pub fn question_count(&self) -> usize {
        self.exam.sections.iter().map(|s| s.questions.len()).sum()
    }
}

/// `1 pt` for one point, `N pts` otherwise.
#[must_use]
pub fn points_label(points: u32) -> String {
    if points == 1 {
        "1 pt".to_string()
    } else {
        format!("{points} pts")
    }
}

fn format_question(ordinal: usize, question: &ExamQuestion) -> FormattedQuestion {
    let response = match question.kind {
        ExamQuestionKind::MultipleChoice => question
            .options
            .clone()
            .filter(|options| !options.is_empty())
            .map_or(ResponseArea::None, ResponseArea::Choices),
        ExamQuestionKind::TrueFalse => ResponseArea::TrueFalse,
        ExamQuestionKind::ShortAnswer => ResponseArea::Lines {
            count: SHORT_ANSWER_LINES,
            rubric: question.rubric.clone(),
        },
        ExamQuestionKind::Essay => ResponseArea::Lines {
            count: ESSAY_LINES,
            rubric: question.rubric.clone(),
        },
        ExamQuestionKind::Other => ResponseArea::None,
    };

    FormattedQuestion {
        ordinal,
        id: question.id,
        prompt: question.prompt.clone(),
        points_label: points_label(question.points),
        response,
    }
}

/// `multiple_choice` becomes `Multiple choice`.
fn humanize(kind: &str) -> String {
    let spaced = kind.replace('_', " ");
    let mut chars = spaced.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}
