//! StudyAI CLI
//!
//! Terminal host for a StudyAI session: type a study request, then work
//! through the flashcards, practice quiz or exam the backend sends back.

mod commands;

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use studyai_client::{
    Artifact, ClientId, Config, ConnectionEvent, ConnectionManager, DeckView, ErrorClass,
    QuestionKind, ServerMessage, SessionController, StudyError, SERVER_URL_ENV,
};
use studyai_print::{default_file_name, write_markdown, MarkdownGenerator};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use crate::commands::{Command, HELP};

type Session = SessionController<ConnectionManager>;

/// StudyAI - AI-Powered Study Assistant
///
/// Connects to a StudyAI backend and turns study requests into flashcards,
/// graded practice quizzes and printable exams.
#[derive(Parser, Debug)]
#[command(name = "studyai")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (default: studyai.json in current directory)
    #[arg(short, long, value_name = "FILE")]
    config: Option<String>,

    /// Backend address, e.g. ws://localhost:8000
    #[arg(short, long, value_name = "URL", env = SERVER_URL_ENV)]
    server_url: Option<String>,

    /// Enable verbose output (sets log level to debug)
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Priority: RUST_LOG env var > --verbose flag > default (info)
    let filter = if args.verbose {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"))
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::debug!(config = ?args.config, "Config file");

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::from(1)
        }
    }
}

/// Runs one interactive session until `:quit`, end of input or Ctrl+C.
async fn run(args: Args) -> anyhow::Result<()> {
    let mut config = load_config(args.config.as_deref())?;
    config.apply_env_override(args.server_url);
    config.validate()?;

    let client_id = ClientId::generate();
    println!("StudyAI");
    println!("Backend: {}", config.server_url);
    println!("Client:  {client_id}");
    println!("Type what you want to study, or :help for commands.");
    println!();

    let (mut manager, mut events) = ConnectionManager::new(config.clone(), client_id);
    manager.connect();
    let mut session = SessionController::new(manager);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            Ok(()) = tokio::signal::ctrl_c() => {
                tracing::info!("Received Ctrl+C, shutting down");
                break;
            }
            Some(event) = events.recv() => {
                let new_content = matches!(
                    event,
                    ConnectionEvent::Message(ServerMessage::StudyContent { .. })
                );
                let before = Snapshot::of(&session);
                session.handle_event(event);
                report_changes(&session, &before, new_content);
            }
            line = lines.next_line() => match line {
                Ok(Some(line)) => match Command::parse(&line) {
                    Command::Quit => break,
                    command => {
                        if let Err(e) = apply(&mut session, command, config.flip_back_delay()).await {
                            report_error(&e);
                        }
                    }
                },
                Ok(None) => break,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to read input");
                    break;
                }
            },
        }
    }

    println!("Closing connection...");
    session.into_sink().shutdown().await;
    Ok(())
}

/// Applies one user command.
async fn apply(
    session: &mut Session,
    command: Command,
    flip_back_delay: Duration,
) -> Result<(), StudyError> {
    match command {
        Command::Empty | Command::Quit => {}
        Command::Help => println!("{HELP}"),
        Command::Unknown(text) => println!("Unknown command '{text}'. Type :help for commands."),
        Command::Invalid(usage) => println!("! {usage}"),
        Command::Submit(text) => {
            session.submit(&text)?;
            println!("Requesting...");
        }
        Command::Send => {
            session.submit_input()?;
            println!("Requesting: {}", session.input());
        }
        Command::Status => print_status(session),
        Command::Reset => {
            session.reset()?;
            println!("Cleared. Type a new study request.");
        }
        Command::Next => step(session, true, flip_back_delay).await?,
        Command::Prev => step(session, false, flip_back_delay).await?,
        Command::Flip => {
            let (_, nav) = session.flashcards_mut()?;
            if !nav.toggle_flip() {
                println!("(switch to single-card view with :list to flip)");
            }
            render_card(session);
        }
        Command::Known => {
            let (deck, nav) = session.flashcards_mut()?;
            if let Some(id) = nav.mark_known(deck) {
                tracing::debug!(card_id = id, "Marked known");
            }
            render_card(session);
        }
        Command::List => {
            let (_, nav) = session.flashcards_mut()?;
            if nav.toggle_view() == DeckView::ListAll {
                render_document(session);
            } else {
                render_card(session);
            }
        }
        Command::Answer { question, choice } => {
            let (set, quiz) = session.practice_mut()?;
            let q = set
                .question(question)
                .ok_or_else(|| StudyError::not_found("question", question))?;
            if q.kind == QuestionKind::ShortAnswer {
                quiz.write_short_answer(q, choice)?;
                println!("Saved answer for question {question}.");
            } else {
                quiz.select(q, &choice)?;
                let recorded = quiz.answer(question).unwrap_or_default();
                println!("Question {question}: {recorded}");
            }
        }
        Command::Grade => {
            let (set, quiz) = session.practice_mut()?;
            let report = quiz.submit(set)?;
            println!(
                "Score: {} / {} ({}%) - {}",
                report.score,
                report.denominator,
                report.percentage,
                report.band.feedback()
            );
            render_document(session);
        }
        Command::Key => {
            session.toggle_exam_tab()?;
            render_document(session);
        }
        Command::Choose(n) => {
            let index = n.checked_sub(1).ok_or_else(|| StudyError::not_found("option", n))?;
            let choice = session.choose_clarification(index)?;
            println!("Selected '{choice}'. Type :send to request it, or type a new request.");
        }
        Command::Print(path) => print_document(session, path.as_deref())?,
    }
    Ok(())
}

/// Prints a failed command according to its error class.
fn report_error(e: &StudyError) {
    match e.class() {
        ErrorClass::InputValidation => println!("! {e}"),
        ErrorClass::Backend => println!("{e}"),
        ErrorClass::ConnectionLoss => println!("! {e}. Reconnecting..."),
        class @ (ErrorClass::Protocol | ErrorClass::Configuration) => {
            tracing::warn!(error = %e, ?class, "Command failed");
            println!("! {e}");
        }
    }
}

/// Moves through the deck, letting a flipped card turn back first.
async fn step(session: &mut Session, forward: bool, flip_back_delay: Duration) -> Result<(), StudyError> {
    let (_, nav) = session.flashcards_mut()?;
    let moved = if forward { nav.next() } else { nav.prev() };
    if nav.is_transitioning() {
        tokio::time::sleep(flip_back_delay).await;
        nav.finish_transition();
    }
    if !moved {
        println!("(no more cards in that direction)");
    }
    render_card(session);
    Ok(())
}

/// Loads configuration from the specified path or default location.
fn load_config(config_path: Option<&str>) -> anyhow::Result<Config> {
    match config_path {
        Some(path_str) => {
            let path = Path::new(path_str);
            if !path.exists() {
                anyhow::bail!(
                    "Config file not found: '{}'\n\nSuggestion: Check the path or remove the --config flag to use defaults",
                    path.display()
                );
            }
            Config::load_from_file(path).map_err(|e| anyhow::anyhow!("{e}"))
        }
        None => Config::load().map_err(|e| anyhow::anyhow!("{e}")),
    }
}

// ============================================================================
// Output
// ============================================================================

/// Session fields shown to the user, captured before an event.
struct Snapshot {
    status: Option<String>,
    connected: bool,
}

impl Snapshot {
    fn of(session: &Session) -> Self {
        Self {
            status: session.status().map(str::to_owned),
            connected: session.is_connected(),
        }
    }
}

/// Prints what changed after a connection event.
fn report_changes(session: &Session, before: &Snapshot, new_content: bool) {
    if session.is_connected() != before.connected {
        if session.is_connected() {
            println!("[connected]");
        } else {
            println!("[reconnecting...]");
        }
    }

    if session.status() != before.status.as_deref() {
        if let Some(status) = session.status() {
            println!("{status}");
        }
    }

    if new_content {
        render_artifact(session);
    }
}

fn render_artifact(session: &Session) {
    match session.artifact() {
        Some(Artifact::Flashcards(_)) => {
            render_card(session);
            println!(":next :prev :flip :known :list :print");
        }
        Some(Artifact::Practice(_)) => {
            render_document(session);
            println!(":answer <question> <choice> then :grade");
        }
        Some(Artifact::Exam(_)) => {
            render_document(session);
            println!(":key toggles the answer key, :print saves a copy");
        }
        Some(Artifact::Clarification(_)) => {
            render_document(session);
            println!(":choose <n> to pick an option");
        }
        None => {}
    }
}

/// Prints the current card, front or back.
fn render_card(session: &Session) {
    let Some((deck, nav)) = session.flashcards() else {
        return;
    };
    if nav.view() == DeckView::ListAll {
        render_document(session);
        return;
    }
    let Some(card) = nav.current(deck) else {
        println!("(empty deck)");
        return;
    };

    let known = if nav.is_known(card.id) { " *known*" } else { "" };
    println!("{}{known}", nav.progress());
    if nav.is_flipped() {
        println!("  {}", card.definition);
        if let Some(hint) = &card.hint {
            println!("  Hint: {hint}");
        }
        if let Some(example) = &card.example {
            println!("  Example: {example}");
        }
    } else {
        match &card.category {
            Some(category) => println!("  {} [{category}]", card.term),
            None => println!("  {}", card.term),
        }
    }
}

/// Prints the Markdown rendering of the artifact on screen.
fn render_document(session: &Session) {
    if let Some((artifact, interaction)) = session.displayed() {
        let markdown = MarkdownGenerator::new(artifact)
            .with_interaction(interaction)
            .without_footer()
            .generate();
        println!("{markdown}");
    }
}

fn print_document(session: &Session, path: Option<&Path>) -> Result<(), StudyError> {
    let Some((artifact, interaction)) = session.displayed() else {
        return Err(StudyError::wrong_artifact("artifact", session.phase()));
    };
    let markdown = MarkdownGenerator::new(artifact)
        .with_interaction(interaction)
        .generate();
    let path = path.map_or_else(
        || PathBuf::from(default_file_name(artifact, &chrono::Utc::now())),
        Path::to_path_buf,
    );

    match write_markdown(&path, &markdown) {
        Ok(()) => println!("Saved {}", path.display()),
        Err(e) => println!("! {e}"),
    }
    Ok(())
}

fn print_status(session: &Session) {
    let connection = if session.is_connected() {
        "connected"
    } else {
        "reconnecting"
    };
    println!("Connection: {connection}");
    println!("Session:    {}", session.phase());
    if let Some(id) = session.server_session_id() {
        println!("Server id:  {id}");
    }
    if !session.input().is_empty() {
        println!("Input:      {}", session.input());
    }
    if let Some(status) = session.status() {
        println!("Status:     {status}");
    }
}
