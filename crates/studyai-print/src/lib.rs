//! StudyAI print rendering
//!
//! This crate turns the artifact a study session is showing into a printable
//! Markdown document and writes it to disk.
//!
//! # Generators
//!
//! - [`MarkdownGenerator`] - Renders exams, answer keys, flashcard decks,
//!   practice sets and clarification prompts
//!
//! # Example
//!
//! ```rust
//! use studyai_client::{Artifact, Clarification};
//! use studyai_print::{default_file_name, MarkdownGenerator};
//!
//! let artifact = Artifact::Clarification(Clarification {
//!     message: "Which subject?".to_string(),
//!     options: vec!["Biology".to_string()],
//! });
//!
//! let markdown = MarkdownGenerator::new(&artifact).without_footer().generate();
//! assert!(markdown.starts_with("## Which subject?"));
//!
//! let name = default_file_name(&artifact, &chrono::Utc::now());
//! assert!(name.starts_with("studyai-clarification-"));
//! ```

mod markdown;

pub use markdown::MarkdownGenerator;

use std::path::Path;

use chrono::{DateTime, Utc};
use studyai_client::Artifact;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while printing an artifact.
#[derive(Debug, Error)]
pub enum PrintError {
    /// Failed to write the document.
    #[error("failed to write '{path}': {source}")]
    Io {
        /// Destination path.
        path: String,
        /// Underlying error.
        source: std::io::Error,
    },
}

/// Result type for print operations.
pub type Result<T> = std::result::Result<T, PrintError>;

// ============================================================================
// Output
// ============================================================================

/// File name for a printout: `studyai-<mode>-<YYYYMMDD-HHMMSS>.md`.
#[must_use]
pub fn default_file_name(artifact: &Artifact, now: &DateTime<Utc>) -> String {
    format!(
        "studyai-{}-{}.md",
        artifact.mode(),
        now.format("%Y%m%d-%H%M%S")
    )
}

/// Writes `markdown` to `path`, replacing any existing file.
///
/// # Errors
///
/// Returns `PrintError::Io` if the file cannot be written.
pub fn write_markdown(path: &Path, markdown: &str) -> Result<()> {
    std::fs::write(path, markdown).map_err(|source| PrintError::Io {
        path: path.display().to_string(),
        source,
    })
}
