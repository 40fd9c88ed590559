//! End-to-end tests: a session controller driven by a live connection to a
//! mock backend.

mod common;

use std::time::Duration;

use common::{
    clarification_data, connect, content_frame, deck_data, error_frame, next_event,
    practice_data, status_frame, MockBackend,
};
use serde_json::json;
use studyai_client::{
    ConnectionEvent, ConnectionManager, RejectReason, SessionController, SessionPhase, StudyError,
};
use studyai_print::MarkdownGenerator;
use tokio::sync::mpsc::UnboundedReceiver;

type Session = SessionController<ConnectionManager>;

/// A backend that answers by keyword, the way the real one routes intents.
fn study_backend() -> MockBackend {
    MockBackend::new(|request| {
        let lower = request.to_lowercase();
        if lower.contains("flashcards") {
            vec![
                status_frame("Creating flashcards..."),
                content_frame(deck_data()),
            ]
        } else if lower.contains("practice") {
            vec![
                status_frame("Generating questions..."),
                content_frame(practice_data()),
            ]
        } else if lower.contains("fail") {
            vec![error_frame("model unavailable")]
        } else if lower.contains("broken exam") {
            vec![content_frame(json!({
                "mode": "exam",
                "exam_title": "Cells",
                "sections": [{ "title": "Part I" }]
            }))]
        } else if lower.contains("exam") {
            vec![content_frame(json!({
                "mode": "exam",
                "exam_title": "Cells",
                "subject": "Biology",
                "total_points": null,
                "time_limit_minutes": null,
                "instructions": null,
                "sections": [{
                    "section_number": 1,
                    "title": "Part I",
                    "questions": [
                        { "id": 1, "type": "true_false", "question": "Cells divide.", "points": 1 }
                    ]
                }],
                "answer_key": { "1": "True" }
            }))]
        } else {
            vec![content_frame(clarification_data())]
        }
    })
}

/// Connects a session and waits until it reports connected.
async fn open_session(url: &str) -> (Session, UnboundedReceiver<ConnectionEvent>) {
    let (manager, mut events) = connect(url);
    let mut session = SessionController::new(manager);
    while !session.is_connected() {
        session.handle_event(next_event(&mut events).await);
    }
    (session, events)
}

/// Feeds events into the session until `done` holds.
async fn drive_until(
    session: &mut Session,
    events: &mut UnboundedReceiver<ConnectionEvent>,
    done: impl Fn(&Session) -> bool,
) {
    while !done(session) {
        session.handle_event(next_event(events).await);
    }
}

// ============================================================================
// Study Flows
// ============================================================================

/// A flashcard request shows a status, then the deck.
#[tokio::test]
async fn test_flashcard_request_end_to_end() {
    let backend = study_backend();
    let url = backend.spawn().await;
    let (mut session, mut events) = open_session(&url).await;

    session.submit("Create flashcards for: Mitosis").unwrap();
    assert_eq!(session.phase(), SessionPhase::Awaiting);

    drive_until(&mut session, &mut events, |s| s.status().is_some()).await;
    assert_eq!(session.status(), Some("Creating flashcards..."));

    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Displaying
    })
    .await;
    assert_eq!(session.status(), None);

    let (deck, nav) = session.flashcards().expect("deck displayed");
    assert_eq!(deck.len(), 2);
    assert_eq!(nav.card_count(), 2);
    assert_eq!(nav.progress().to_string(), "Card 1 of 2 (0 known)");

    let (deck, nav) = session.flashcards_mut().unwrap();
    assert_eq!(nav.mark_known(deck), Some(1));
    assert_eq!(nav.progress().to_string(), "Card 2 of 2 (1 known)");

    assert_eq!(backend.received(), vec!["Create flashcards for: Mitosis"]);
    session.into_sink().shutdown().await;
}

/// Two correct answers and one blank out of three score 67%.
#[tokio::test]
async fn test_practice_grading_end_to_end() {
    let backend = study_backend();
    let url = backend.spawn().await;
    let (mut session, mut events) = open_session(&url).await;

    session.submit("Give me practice questions on cells").unwrap();
    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Displaying
    })
    .await;

    let (set, quiz) = session.practice_mut().expect("practice displayed");
    quiz.select(set.question(1).unwrap(), "A").unwrap();
    quiz.select(set.question(2).unwrap(), "B) second").unwrap();

    let report = quiz.submit(set).unwrap();
    assert_eq!((report.score, report.denominator), (2, 3));
    assert_eq!(report.percentage, 67);
    assert_eq!(report.band.feedback(), "Good job! Review the missed ones.");

    let (artifact, interaction) = session.displayed().unwrap();
    let markdown = MarkdownGenerator::new(artifact)
        .with_interaction(interaction)
        .without_footer()
        .generate();
    assert!(markdown.contains("67%"), "{markdown}");

    session.into_sink().shutdown().await;
}

/// Choosing a clarification option makes it the next request.
#[tokio::test]
async fn test_clarification_round_trip() {
    let backend = study_backend();
    let url = backend.spawn().await;
    let (mut session, mut events) = open_session(&url).await;

    session.submit("help me study").unwrap();
    drive_until(&mut session, &mut events, |s| s.clarification().is_some()).await;

    assert_eq!(session.choose_clarification(1).unwrap(), "Chemistry");
    assert_eq!(session.input(), "Chemistry");
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert!(session.artifact().is_none());

    session.submit_input().unwrap();
    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Displaying
    })
    .await;
    assert_eq!(backend.received(), vec!["help me study", "Chemistry"]);

    session.into_sink().shutdown().await;
}

/// A backend error returns the session to idle with the error as status.
#[tokio::test]
async fn test_backend_error_returns_to_idle() {
    let backend = study_backend();
    let url = backend.spawn().await;
    let (mut session, mut events) = open_session(&url).await;

    session.submit("this will fail").unwrap();
    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Idle
    })
    .await;

    assert_eq!(session.status(), Some("Error: model unavailable"));
    assert!(session.artifact().is_none());

    session.into_sink().shutdown().await;
}

/// Null fields in an artifact fall back to defaults instead of failing.
#[tokio::test]
async fn test_exam_with_null_fields_is_displayed() {
    let backend = study_backend();
    let url = backend.spawn().await;
    let (mut session, mut events) = open_session(&url).await;

    session.submit("Make an exam on cells").unwrap();
    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Displaying
    })
    .await;

    let (exam, _) = session.exam().expect("exam displayed");
    assert_eq!(exam.time_limit_minutes, 0);
    assert_eq!(exam.total_points, 0);
    assert!(exam.instructions.is_empty());

    session.into_sink().shutdown().await;
}

/// Study content that cannot be decoded ends the request so it can be retried.
#[tokio::test]
async fn test_undecodable_content_allows_retry() {
    let backend = study_backend();
    let url = backend.spawn().await;
    let (mut session, mut events) = open_session(&url).await;

    session.submit("Make a broken exam").unwrap();
    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Idle
    })
    .await;

    let status = session.status().expect("error status");
    assert!(status.starts_with("Error: Invalid exam payload"), "{status}");
    assert_eq!(session.input(), "Make a broken exam");
    assert!(session.artifact().is_none());

    session.submit("Make an exam on cells").unwrap();
    drive_until(&mut session, &mut events, |s| {
        s.phase() == SessionPhase::Displaying
    })
    .await;
    assert_eq!(
        backend.received(),
        vec!["Make a broken exam", "Make an exam on cells"]
    );

    session.into_sink().shutdown().await;
}

// ============================================================================
// Rejected Submissions
// ============================================================================

/// A second request while one is outstanding is rejected and not sent.
#[tokio::test]
async fn test_second_submit_while_awaiting_is_busy() {
    let backend = MockBackend::new(|_| Vec::new());
    let url = backend.spawn().await;
    let (mut session, _events) = open_session(&url).await;

    session.submit("Create flashcards for: Mitosis").unwrap();
    let err = session.submit("Create an exam").unwrap_err();
    assert!(matches!(
        err,
        StudyError::SubmitRejected {
            reason: RejectReason::Busy
        }
    ));
    assert_eq!(session.input(), "Create flashcards for: Mitosis");

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(backend.received(), vec!["Create flashcards for: Mitosis"]);

    session.into_sink().shutdown().await;
}

/// Submitting before the channel opens is rejected without a state change.
#[tokio::test]
async fn test_submit_before_connected_is_rejected() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let url = format!("ws://{}", listener.local_addr().unwrap());
    drop(listener);

    let (manager, _events) = connect(&url);
    let mut session = SessionController::new(manager);

    let err = session.submit("Create flashcards for: Mitosis").unwrap_err();
    assert!(matches!(
        err,
        StudyError::SubmitRejected {
            reason: RejectReason::NotConnected
        }
    ));
    assert_eq!(session.phase(), SessionPhase::Idle);
    assert_eq!(session.input(), "");

    session.into_sink().shutdown().await;
}
