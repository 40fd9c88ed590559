//! Flashcard deck navigation.
//!
//! The navigator keeps the position, flip state and "known" set for the deck
//! currently on screen. It never copies cards; lookups borrow the deck the
//! session controller owns.

use std::collections::HashSet;
use std::time::Duration;

use crate::artifact::{Flashcard, FlashcardDeck};

/// Time a renderer lets a flipped card turn back before showing the next one.
pub const FLIP_BACK_DELAY: Duration = Duration::from_millis(100);

/// How the deck is presented.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DeckView {
    /// One card at a time, flippable.
    #[default]
    SingleCard,
    /// Every card listed with its known marker. Read-only.
    ListAll,
}

/// Position summary for the deck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 1-based position of the current card; 0 for an empty deck.
    pub position: usize,
    /// Number of cards.
    pub total: usize,
    /// Cards marked known.
    pub known: usize,
}

impl std::fmt::Display for Progress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Card {} of {} ({} known)",
            self.position, self.total, self.known
        )
    }
}

/// Interactive state for one flashcard deck.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashcardNavigator {
    card_count: usize,
    index: usize,
    flipped: bool,
    known: HashSet<u32>,
    view: DeckView,
    /// Index still on screen while the flip-back finishes.
    flip_back_from: Option<usize>,
}

impl FlashcardNavigator {
    /// Creates a navigator at the first card of `deck`, front side up.
    #[must_use]
    pub fn new(deck: &FlashcardDeck) -> Self {
        Self::with_len(deck.len())
    }

    /// Creates a navigator for a deck of `card_count` cards.
    #[must_use]
    pub fn with_len(card_count: usize) -> Self {
        Self {
            card_count,
            index: 0,
            flipped: false,
            known: HashSet::new(),
            view: DeckView::SingleCard,
            flip_back_from: None,
        }
    }

    /// Index of the current card.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }

    /// Index a renderer should show right now.
    ///
    /// Differs from [`index`](Self::index) only while a flip-back is in flight.
    #[must_use]
    pub fn displayed_index(&self) -> usize {
        self.flip_back_from.unwrap_or(self.index)
    }

    /// Returns `true` while the previous card is still turning back.
    #[must_use]
    pub const fn is_transitioning(&self) -> bool {
        self.flip_back_from.is_some()
    }

    /// Ends the flip-back started by a move away from a flipped card.
    ///
    /// Renderers call this once [`FLIP_BACK_DELAY`] has elapsed.
    pub fn finish_transition(&mut self) {
        self.flip_back_from = None;
    }

    /// Returns `true` if the current card shows its definition.
    #[must_use]
    pub const fn is_flipped(&self) -> bool {
        self.flipped
    }

    /// The current presentation.
    #[must_use]
    pub const fn view(&self) -> DeckView {
        self.view
    }

    /// Number of cards in the deck.
    #[must_use]
    pub const fn card_count(&self) -> usize {
        self.card_count
    }

    /// Returns `true` if the card with `card_id` has been marked known.
    #[must_use]
    pub fn is_known(&self, card_id: u32) -> bool {
        self.known.contains(&card_id)
    }

    /// Number of cards marked known.
    #[must_use]
    pub fn known_count(&self) -> usize {
        self.known.len()
    }

    /// Moves to the next card. Returns `false` at the last card.
    pub fn next(&mut self) -> bool {
        if self.index + 1 >= self.card_count {
            return false;
        }
        self.move_to(self.index + 1);
        true
    }

    /// Moves to the previous card. Returns `false` at the first card.
    pub fn prev(&mut self) -> bool {
        if self.index == 0 || self.card_count == 0 {
            return false;
        }
        self.move_to(self.index - 1);
        true
    }

    /// Marks the card on screen known, then advances.
    ///
    /// During a flip-back the card still on screen is the one marked.
    /// Returns the id that was marked, or `None` for an empty deck.
    pub fn mark_known(&mut self, deck: &FlashcardDeck) -> Option<u32> {
        let id = self.current(deck)?.id;
        if self.known.insert(id) {
            tracing::debug!(card_id = id, known = self.known.len(), "Card marked known");
        }
        self.next();
        Some(id)
    }

    /// Flips the current card. Only applies in single-card view.
    pub fn toggle_flip(&mut self) -> bool {
        if self.view != DeckView::SingleCard || self.card_count == 0 {
            return false;
        }
        self.finish_transition();
        self.flipped = !self.flipped;
        true
    }

    /// Switches between single-card and list-all view.
    pub fn toggle_view(&mut self) -> DeckView {
        self.view = match self.view {
            DeckView::SingleCard => DeckView::ListAll,
            DeckView::ListAll => DeckView::SingleCard,
        };
        self.view
    }

    /// Position, total and known count.
    #[must_use]
    pub fn progress(&self) -> Progress {
        Progress {
            position: if self.card_count == 0 {
                0
            } else {
                self.index + 1
            },
            total: self.card_count,
            known: self.known.len(),
        }
    }

    /// The card a renderer should show.
    #[must_use]
    pub fn current<'d>(&self, deck: &'d FlashcardDeck) -> Option<&'d Flashcard> {
        deck.cards.get(self.displayed_index())
    }

    fn move_to(&mut self, target: usize) {
        if self.flipped && self.flip_back_from.is_none() {
            self.flip_back_from = Some(self.index);
        }
        self.flipped = false;
        self.index = target;
    }
}

// ============================================================================
// Tests
// ============================================================================
