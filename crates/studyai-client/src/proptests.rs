//! Property-based tests for grading and flashcard navigation.
//!
//! These tests verify key invariants hold across all possible inputs.

use std::collections::HashMap;

use proptest::prelude::*;

use crate::artifact::{Flashcard, FlashcardDeck, PracticeSet, Question, QuestionKind};
use crate::flashcards::FlashcardNavigator;
use crate::grading::{grade, percentage};

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_kind() -> impl Strategy<Value = QuestionKind> {
    prop_oneof![
        Just(QuestionKind::MultipleChoice),
        Just(QuestionKind::TrueFalse),
        Just(QuestionKind::ShortAnswer),
    ]
}

/// A question plus the answer a user gave, if any.
fn arb_answered_question() -> impl Strategy<Value = (QuestionKind, String, Option<String>)> {
    (
        arb_kind(),
        "[A-Da-d]|True|False",
        proptest::option::of("[A-Da-d]|True|False|true|false"),
    )
}

fn practice_set(questions: &[(QuestionKind, String, Option<String>)]) -> (PracticeSet, HashMap<u32, String>) {
    let mut answers = HashMap::new();
    let questions = questions
        .iter()
        .zip(1u32..)
        .map(|((kind, correct, given), id)| {
            if let Some(given) = given {
                answers.insert(id, given.clone());
            }
            Question {
                id,
                kind: *kind,
                bloom_level: "apply".to_string(),
                prompt: format!("Q{id}"),
                options: (*kind == QuestionKind::MultipleChoice)
                    .then(|| vec!["A) a".to_string(), "B) b".to_string()]),
                correct_answer: correct.clone(),
                explanation: String::new(),
                key_points: None,
            }
        })
        .collect();

    let set = PracticeSet {
        topic: "Any".to_string(),
        question_count: None,
        difficulty: "beginner".to_string(),
        bloom_levels: vec![],
        questions,
        recommendations: vec![],
    };
    (set, answers)
}

fn deck(n: u32) -> FlashcardDeck {
    FlashcardDeck {
        title: "Deck".to_string(),
        subject: "Any".to_string(),
        difficulty: "beginner".to_string(),
        card_count: Some(n),
        cards: (1..=n)
            .map(|id| Flashcard {
                id,
                term: format!("t{id}"),
                definition: format!("d{id}"),
                hint: None,
                example: None,
                category: None,
            })
            .collect(),
        tips: vec![],
    }
}

#[derive(Debug, Clone, Copy)]
enum NavAction {
    Next,
    Prev,
    MarkKnown,
    Flip,
    ToggleView,
    FinishTransition,
}

fn arb_nav_action() -> impl Strategy<Value = NavAction> {
    prop_oneof![
        Just(NavAction::Next),
        Just(NavAction::Prev),
        Just(NavAction::MarkKnown),
        Just(NavAction::Flip),
        Just(NavAction::ToggleView),
        Just(NavAction::FinishTransition),
    ]
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    #[test]
    fn prop_percentage_is_bounded(score in 0u32..1000, denominator in 0u32..1000) {
        let pct = percentage(score, denominator);
        prop_assert!(pct <= 100);
        if denominator == 0 {
            prop_assert_eq!(pct, 0);
        }
    }

    #[test]
    fn prop_short_answers_never_score(questions in proptest::collection::vec(arb_answered_question(), 0..12)) {
        let (set, answers) = practice_set(&questions);
        let report = grade(&set, &answers);

        let gradable = questions.iter().filter(|(kind, _, _)| kind.is_gradable()).count();
        prop_assert_eq!(report.denominator as usize, gradable);
        prop_assert!(report.score <= report.denominator);
        prop_assert!(report.percentage <= 100);
    }

    #[test]
    fn prop_grading_ignores_case(questions in proptest::collection::vec(arb_answered_question(), 1..12)) {
        let (set, answers) = practice_set(&questions);
        let upper: HashMap<u32, String> = answers
            .iter()
            .map(|(id, answer)| (*id, answer.to_uppercase()))
            .collect();

        prop_assert_eq!(grade(&set, &answers).score, grade(&set, &upper).score);
    }

    #[test]
    fn prop_grading_ignores_question_order(questions in proptest::collection::vec(arb_answered_question(), 1..12)) {
        let (set, answers) = practice_set(&questions);
        let mut reversed = set.clone();
        reversed.questions.reverse();

        let forward = grade(&set, &answers);
        let backward = grade(&reversed, &answers);
        prop_assert_eq!(forward.score, backward.score);
        prop_assert_eq!(forward.percentage, backward.percentage);
    }

    #[test]
    fn prop_navigator_stays_in_bounds(
        cards in 0u32..8,
        actions in proptest::collection::vec(arb_nav_action(), 0..40)
    ) {
        let deck = deck(cards);
        let mut nav = FlashcardNavigator::new(&deck);
        let mut known_before = 0;

        for action in actions {
            match action {
                NavAction::Next => { nav.next(); }
                NavAction::Prev => { nav.prev(); }
                NavAction::MarkKnown => { nav.mark_known(&deck); }
                NavAction::Flip => { nav.toggle_flip(); }
                NavAction::ToggleView => { nav.toggle_view(); }
                NavAction::FinishTransition => nav.finish_transition(),
            }

            if cards > 0 {
                prop_assert!(nav.index() < cards as usize);
                prop_assert!(nav.displayed_index() < cards as usize);
            } else {
                prop_assert_eq!(nav.index(), 0);
            }
            prop_assert!(nav.known_count() <= cards as usize);
            prop_assert!(nav.known_count() >= known_before, "known set shrank");
            known_before = nav.known_count();
        }
    }
}
