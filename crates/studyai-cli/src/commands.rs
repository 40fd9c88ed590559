//! Parsing of the lines typed at the prompt.
//!
//! Anything not starting with `:` is a study request.

use std::path::PathBuf;

/// Command reference printed by `:help`.
pub const HELP: &str = "\
Commands:
  <text>                    Send a study request
  :send                     Send the current input (after :choose)
  :status                   Show connection and session state
  :reset                    Clear the current artifact
  :next / :prev             Move through flashcards
  :flip                     Flip the current flashcard
  :known                    Mark the current flashcard known and advance
  :list                     Toggle the list-all deck view
  :answer <q> <choice>      Answer practice question <q>
  :grade                    Grade the practice set
  :key                      Toggle the exam answer key
  :choose <n>               Pick clarification option <n>
  :print [file]             Save the current artifact as Markdown
  :quit                     Exit";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Empty,
    Help,
    Quit,
    Status,
    Submit(String),
    Send,
    Reset,
    Next,
    Prev,
    Flip,
    Known,
    List,
    Answer { question: u32, choice: String },
    Grade,
    Key,
    Choose(usize),
    Print(Option<PathBuf>),
    /// A known command with bad arguments; carries the usage line.
    Invalid(&'static str),
    Unknown(String),
}

impl Command {
    /// Parses one input line.
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(rest) = line.strip_prefix(':') else {
            return Self::Submit(line.to_string());
        };

        let (name, args) = rest
            .split_once(char::is_whitespace)
            .map_or((rest, ""), |(name, args)| (name, args.trim()));

        match name {
            "help" | "h" | "?" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            "status" => Self::Status,
            "send" => Self::Send,
            "reset" | "new" => Self::Reset,
            "next" | "n" => Self::Next,
            "prev" | "p" => Self::Prev,
            "flip" | "f" => Self::Flip,
            "known" | "k" => Self::Known,
            "list" => Self::List,
            "grade" => Self::Grade,
            "key" => Self::Key,
            "answer" | "a" => parse_answer(args),
            "choose" | "c" => args
                .parse()
                .map_or(Self::Invalid("usage: :choose <n>"), Self::Choose),
            "print" => Self::Print((!args.is_empty()).then(|| PathBuf::from(args))),
            _ => Self::Unknown(line.to_string()),
        }
    }
}

fn parse_answer(args: &str) -> Command {
    const USAGE: &str = "usage: :answer <question> <choice>";

    let Some((question, choice)) = args.split_once(char::is_whitespace) else {
        return Command::Invalid(USAGE);
    };
    let choice = choice.trim();
    match question.parse() {
        Ok(question) if !choice.is_empty() => Command::Answer {
            question,
            choice: choice.to_string(),
        },
        _ => Command::Invalid(USAGE),
    }
}
