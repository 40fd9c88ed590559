//! Markdown rendering of study artifacts.
//!
//! This module provides the [`MarkdownGenerator`] struct for converting the
//! artifact on screen into a printable Markdown document:
//!
//! - An exam paper with blank response lines, or its answer key
//! - A flashcard deck as a list with known markers
//! - A practice set, with the score and per-question review once graded
//! - A clarification prompt with numbered options
//!
//! # Example
//!
//! ```rust
//! use studyai_client::{Artifact, Clarification};
//! use studyai_print::MarkdownGenerator;
//!
//! let artifact = Artifact::Clarification(Clarification {
//!     message: "Which subject?".to_string(),
//!     options: vec!["Biology".to_string(), "Chemistry".to_string()],
//! });
//!
//! let markdown = MarkdownGenerator::new(&artifact).generate();
//! assert!(markdown.contains("1. Biology"));
//! ```

use std::fmt::Write;

use chrono::{DateTime, Utc};
use studyai_client::exam::{points_label, ExamFormatter, FormattedQuestion, ResponseArea};
use studyai_client::flashcards::FlashcardNavigator;
use studyai_client::grading::{PracticeQuiz, Verdict};
use studyai_client::{
    Artifact, Clarification, Exam, ExamTab, FlashcardDeck, Interaction, PracticeSet, Question,
    QuestionKind,
};

/// A blank writing line on the printed paper.
const BLANK_LINE: &str = "\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_\\_";

/// Generates printable Markdown for the artifact on screen.
///
/// Interactive state is optional. Without it a deck prints without known
/// markers, a practice set prints without answers, and an exam prints its
/// question paper.
pub struct MarkdownGenerator<'a> {
    artifact: &'a Artifact,
    interaction: Option<&'a Interaction>,
    footer: bool,
}

impl<'a> MarkdownGenerator<'a> {
    /// Creates a new Markdown generator for the given artifact.
    #[must_use]
    pub const fn new(artifact: &'a Artifact) -> Self {
        Self {
            artifact,
            interaction: None,
            footer: true,
        }
    }

    /// Uses the interactive state that goes with the artifact.
    #[must_use]
    pub const fn with_interaction(mut self, interaction: &'a Interaction) -> Self {
        self.interaction = Some(interaction);
        self
    }

    /// Leaves out the generated-at footer.
    #[must_use]
    pub const fn without_footer(mut self) -> Self {
        self.footer = false;
        self
    }

    /// Generates the complete document.
    #[must_use]
    pub fn generate(&self) -> String {
        let mut output = String::new();

        match (self.artifact, self.interaction) {
            (Artifact::Flashcards(deck), Some(Interaction::Flashcards(nav))) => {
                write_deck(&mut output, deck, Some(nav));
            }
            (Artifact::Flashcards(deck), _) => write_deck(&mut output, deck, None),
            (Artifact::Practice(set), Some(Interaction::Practice(quiz))) => {
                write_practice(&mut output, set, Some(quiz));
            }
            (Artifact::Practice(set), _) => write_practice(&mut output, set, None),
            (Artifact::Exam(exam), Some(Interaction::Exam(ExamTab::AnswerKey))) => {
                write_answer_key(&mut output, exam);
            }
            (Artifact::Exam(exam), _) => write_exam(&mut output, exam),
            (Artifact::Clarification(clarification), _) => {
                write_clarification(&mut output, clarification);
            }
        }

        if self.footer {
            write_footer(&mut output, &Utc::now());
        }
        output
    }

    /// Generates the answer key of an exam, whatever tab is visible.
    ///
    /// Returns `None` for other artifacts.
    #[must_use]
    pub fn generate_answer_key(&self) -> Option<String> {
        let Artifact::Exam(exam) = self.artifact else {
            return None;
        };
        let mut output = String::new();
        write_answer_key(&mut output, exam);
        if self.footer {
            write_footer(&mut output, &Utc::now());
        }
        Some(output)
    }
}

// ============================================================================
// Exam
// ============================================================================

fn write_exam(output: &mut String, exam: &Exam) {
    let body = ExamFormatter::new(exam).body();
    let header = &body.header;

    let _ = writeln!(output, "# {}\n", escape_markdown(&header.title));
    let _ = writeln!(output, "**Subject**: {}\n", escape_markdown(&header.subject));
    let _ = writeln!(output, "| Total Points | Time Limit | Difficulty |");
    let _ = writeln!(output, "|--------------|------------|------------|");
    let _ = writeln!(
        output,
        "| {} | {} minutes | {} |\n",
        header.total_points,
        header.time_limit_minutes,
        escape_markdown(&capitalize(&header.difficulty))
    );
    if !header.instructions.is_empty() {
        let _ = writeln!(
            output,
            "> **Instructions**: {}\n",
            escape_markdown(&header.instructions)
        );
    }
    let _ = writeln!(output, "Name: {BLANK_LINE}\n");
    let _ = writeln!(output, "Date: {BLANK_LINE}\n");

    for (section, formatted) in exam.sections.iter().zip(&body.sections) {
        let _ = writeln!(
            output,
            "## Section {}: {}\n",
            section.number,
            escape_markdown(&formatted.title)
        );
        if !formatted.instructions.is_empty() {
            let _ = writeln!(output, "*{}*\n", escape_markdown(&formatted.instructions));
        }
        for question in &formatted.questions {
            write_exam_question(output, question);
        }
    }

    if !body.point_distribution.is_empty() {
        let _ = writeln!(output, "## Point Distribution\n");
        let _ = writeln!(output, "| Question Type | Points |");
        let _ = writeln!(output, "|---------------|--------|");
        for (kind, points) in &body.point_distribution {
            let _ = writeln!(
                output,
                "| {} | {} |",
                escape_markdown(kind),
                points_label(*points)
            );
        }
        let _ = writeln!(output);
    }

    if !body.grading_scale.is_empty() {
        let _ = writeln!(output, "## Grading Scale\n");
        let _ = writeln!(output, "| Grade | Range |");
        let _ = writeln!(output, "|-------|-------|");
        for (grade, range) in &body.grading_scale {
            let _ = writeln!(
                output,
                "| {} | {} |",
                escape_markdown(grade),
                escape_markdown(range)
            );
        }
        let _ = writeln!(output);
    }
}

fn write_exam_question(output: &mut String, question: &FormattedQuestion) {
    let _ = writeln!(
        output,
        "**{}.** {} *({})*\n",
        question.ordinal,
        escape_markdown(&question.prompt),
        question.points_label
    );

    match &question.response {
        ResponseArea::Choices(options) => {
            for option in options {
                let _ = writeln!(output, "- {}", escape_markdown(option));
            }
            let _ = writeln!(output);
        }
        ResponseArea::TrueFalse => {
            let _ = writeln!(output, "True / False\n");
        }
        ResponseArea::Lines { count, rubric } => {
            for _ in 0..*count {
                let _ = writeln!(output, "{BLANK_LINE}\n");
            }
            if let Some(rubric) = rubric {
                let _ = writeln!(output, "*(Rubric: {})*\n", escape_markdown(rubric));
            }
        }
        ResponseArea::None => {}
    }
}

fn write_answer_key(output: &mut String, exam: &Exam) {
    let _ = writeln!(output, "# {}: Answer Key\n", escape_markdown(&exam.title));

    let key = ExamFormatter::new(exam).answer_key();
    if key.is_empty() {
        let _ = writeln!(output, "*No answer key provided.*\n");
        return;
    }

    let _ = writeln!(output, "| Question | Answer |");
    let _ = writeln!(output, "|----------|--------|");
    for entry in key {
        let _ = writeln!(
            output,
            "| {} | {} |",
            escape_markdown(&entry.question),
            escape_markdown(&entry.answer)
        );
    }
    let _ = writeln!(output);
}

// ============================================================================
// Flashcards
// ============================================================================

fn write_deck(output: &mut String, deck: &FlashcardDeck, nav: Option<&FlashcardNavigator>) {
    let _ = writeln!(output, "# {}\n", escape_markdown(&deck.title));
    let _ = writeln!(
        output,
        "**Subject**: {} | **Difficulty**: {} | **Cards**: {}\n",
        escape_markdown(&deck.subject),
        escape_markdown(&capitalize(&deck.difficulty)),
        deck.len()
    );
    if let Some(nav) = nav {
        let _ = writeln!(output, "*{}*\n", nav.progress());
    }

    if deck.is_empty() {
        let _ = writeln!(output, "*This deck has no cards.*\n");
    }

    for (i, card) in deck.cards.iter().enumerate() {
        let known = nav.is_some_and(|nav| nav.is_known(card.id));
        let marker = if known { " (known)" } else { "" };
        let _ = writeln!(
            output,
            "## {}. {}{marker}\n",
            i + 1,
            escape_markdown(&card.term)
        );
        let _ = writeln!(output, "{}\n", escape_markdown(&card.definition));

        let extras = [
            ("Hint", card.hint.as_deref()),
            ("Example", card.example.as_deref()),
            ("Category", card.category.as_deref()),
        ];
        let mut wrote_extra = false;
        for (label, value) in extras {
            if let Some(value) = value {
                let _ = writeln!(output, "- *{label}*: {}", escape_markdown(value));
                wrote_extra = true;
            }
        }
        if wrote_extra {
            let _ = writeln!(output);
        }
    }

    write_bullets(output, "Study Tips", &deck.tips);
}

// ============================================================================
// Practice
// ============================================================================

fn write_practice(output: &mut String, set: &PracticeSet, quiz: Option<&PracticeQuiz>) {
    let _ = writeln!(output, "# Practice: {}\n", escape_markdown(&set.topic));
    let _ = writeln!(
        output,
        "**Difficulty**: {} | **Questions**: {}\n",
        escape_markdown(&capitalize(&set.difficulty)),
        set.questions.len()
    );
    if !set.bloom_levels.is_empty() {
        let levels: Vec<String> = set
            .bloom_levels
            .iter()
            .map(|level| escape_markdown(&capitalize(level)))
            .collect();
        let _ = writeln!(output, "**Bloom levels**: {}\n", levels.join(", "));
    }

    let report = quiz.and_then(PracticeQuiz::report);
    if let Some(report) = report {
        let _ = writeln!(output, "## Score\n");
        let _ = writeln!(
            output,
            "**{} / {} ({}%)**: {}\n",
            report.score,
            report.denominator,
            report.percentage,
            report.band.feedback()
        );
        if report.has_ungraded {
            let _ = writeln!(
                output,
                "> Short answer questions are not graded. Compare your answers with the model answers below.\n"
            );
        }
    }

    let _ = writeln!(output, "## Questions\n");
    for (i, question) in set.questions.iter().enumerate() {
        let _ = writeln!(
            output,
            "### {}. {}\n",
            i + 1,
            escape_markdown(&question.prompt)
        );
        let _ = writeln!(
            output,
            "*{} | {}*\n",
            capitalize(&question.kind.to_string()),
            escape_markdown(&capitalize(&question.bloom_level))
        );

        if let Some(options) = &question.options {
            for option in options {
                let _ = writeln!(output, "- {}", escape_markdown(option));
            }
            let _ = writeln!(output);
        } else if question.kind == QuestionKind::TrueFalse {
            let _ = writeln!(output, "True / False\n");
        }

        if let Some(quiz) = quiz {
            write_practice_answer(output, question, quiz);
        }
    }

    write_bullets(output, "Study Recommendations", &set.recommendations);
}

fn write_practice_answer(output: &mut String, question: &Question, quiz: &PracticeQuiz) {
    let given = if question.kind.is_gradable() {
        quiz.answer(question.id)
    } else {
        quiz.short_answer(question.id)
    };
    if let Some(given) = given {
        let _ = writeln!(output, "**Your answer**: {}\n", escape_markdown(given));
    }

    let Some(outcome) = quiz.report().and_then(|report| report.outcome(question.id)) else {
        return;
    };

    let verdict = match outcome.verdict {
        Verdict::Correct => "Correct",
        Verdict::Incorrect => "Incorrect",
        Verdict::Unanswered => "Not answered",
        Verdict::NotGraded => "Not graded",
    };
    if outcome.verdict == Verdict::NotGraded {
        let _ = writeln!(
            output,
            "**Model answer**: {}\n",
            escape_markdown(&question.correct_answer)
        );
        if let Some(points) = &question.key_points {
            for point in points {
                let _ = writeln!(output, "- {}", escape_markdown(point));
            }
            let _ = writeln!(output);
        }
    } else {
        let _ = writeln!(
            output,
            "**{verdict}**. Correct answer: {}\n",
            escape_markdown(&question.correct_answer)
        );
    }

    if !question.explanation.is_empty() {
        let _ = writeln!(output, "> {}\n", escape_markdown(&question.explanation));
    }
}

// ============================================================================
// Clarification
// ============================================================================

fn write_clarification(output: &mut String, clarification: &Clarification) {
    let _ = writeln!(output, "## {}\n", escape_markdown(&clarification.message));
    for (i, option) in clarification.options.iter().enumerate() {
        let _ = writeln!(output, "{}. {}", i + 1, escape_markdown(option));
    }
    let _ = writeln!(output);
}

// ============================================================================
// Helper Functions
// ============================================================================

fn write_bullets(output: &mut String, title: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    let _ = writeln!(output, "## {title}\n");
    for item in items {
        let _ = writeln!(output, "- {}", escape_markdown(item));
    }
    let _ = writeln!(output);
}

/// Writes the document footer.
fn write_footer(output: &mut String, now: &DateTime<Utc>) {
    let _ = writeln!(output, "---");
    let timestamp = format_timestamp(now);
    let _ = writeln!(output, "*Generated by StudyAI at {timestamp}*");
}

/// Formats a timestamp to a human-readable string.
///
/// Format: "YYYY-MM-DD HH:MM:SS UTC"
fn format_timestamp(dt: &DateTime<Utc>) -> String {
    dt.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}

/// Upper-cases the first character.
fn capitalize(text: &str) -> String {
    let mut chars = text.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

/// Escapes special Markdown characters in text.
///
/// This prevents user content from being interpreted as Markdown formatting.
fn escape_markdown(text: &str) -> String {
    let mut result = String::with_capacity(text.len());

    for ch in text.chars() {
        match ch {
            '*' | '_' | '`' | '#' | '[' | ']' | '(' | ')' | '!' | '\\' | '<' | '>' | '|' => {
                result.push('\\');
                result.push(ch);
            }
            // Keeps table rows on one line
            '\n' => result.push_str("<br>"),
            _ => result.push(ch),
        }
    }

    result
}

// ============================================================================
// Tests
// ============================================================================
