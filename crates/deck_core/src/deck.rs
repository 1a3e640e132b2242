//! Deck lifecycle: instruction card, active cards, completion.
//!
//! `position` indexes into the card buffer and `history` holds one answer per
//! committed question. Insight cards move `position` without touching `history`,
//! so the two counters are kept separately and never derived from each other.

use std::collections::HashSet;

use shared::{
    domain::{CardId, ClientId, SwipeDirection},
    protocol::{Answer, Card, SessionSnapshot},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckPhase {
    Instruction,
    Active(usize),
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActiveCardKind {
    Instruction,
    Question,
    Insight,
    Terminal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeckAction {
    Swipe(SwipeDirection),
    /// Neutral acknowledgement of an insight card.
    Continue,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    LeftInstruction,
    Answered(Answer),
    Continued,
    Ignored,
}

impl AdvanceOutcome {
    pub fn moved_position(&self) -> bool {
        matches!(self, AdvanceOutcome::Answered(_) | AdvanceOutcome::Continued)
    }
}

#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<Card>,
    position: usize,
    history: Vec<Answer>,
    in_instruction: bool,
}

impl Deck {
    pub fn new(cards: Vec<Card>) -> Self {
        Self {
            cards: unique_ids(cards),
            position: 0,
            history: Vec::new(),
            in_instruction: true,
        }
    }

    /// Rebuilds a deck from a persisted session. A session that already moved past
    /// the first card resumes on that card; otherwise the instruction is shown.
    pub fn restore(cards: Vec<Card>, history: Vec<Answer>, position: usize) -> Self {
        let cards = unique_ids(cards);
        let position = position.min(cards.len());
        Self {
            cards,
            position,
            history,
            in_instruction: position == 0,
        }
    }

    pub fn phase(&self) -> DeckPhase {
        if self.in_instruction {
            DeckPhase::Instruction
        } else if self.position >= self.cards.len() {
            DeckPhase::Completed
        } else {
            DeckPhase::Active(self.position)
        }
    }

    pub fn active_kind(&self) -> ActiveCardKind {
        match self.phase() {
            DeckPhase::Instruction => ActiveCardKind::Instruction,
            DeckPhase::Completed => ActiveCardKind::Terminal,
            DeckPhase::Active(index) => {
                if self.cards[index].is_insight() {
                    ActiveCardKind::Insight
                } else {
                    ActiveCardKind::Question
                }
            }
        }
    }

    pub fn current_card(&self) -> Option<&Card> {
        match self.phase() {
            DeckPhase::Active(index) => self.cards.get(index),
            _ => None,
        }
    }

    pub fn cards(&self) -> &[Card] {
        &self.cards
    }

    pub fn history(&self) -> &[Answer] {
        &self.history
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn answered(&self) -> usize {
        self.history.len()
    }

    pub fn remaining(&self) -> usize {
        self.cards.len().saturating_sub(self.position)
    }

    pub fn is_completed(&self) -> bool {
        self.phase() == DeckPhase::Completed
    }

    /// Whether a gesture on the top card would do anything. Used to guard against
    /// commits while the buffer is momentarily empty.
    pub fn accepts_input(&self) -> bool {
        match self.phase() {
            DeckPhase::Instruction => true,
            DeckPhase::Active(index) => self.cards.get(index).is_some(),
            DeckPhase::Completed => false,
        }
    }

    pub fn apply(&mut self, action: DeckAction) -> AdvanceOutcome {
        match self.phase() {
            DeckPhase::Completed => AdvanceOutcome::Ignored,
            DeckPhase::Instruction => match action {
                DeckAction::Swipe(_) => {
                    self.in_instruction = false;
                    AdvanceOutcome::LeftInstruction
                }
                DeckAction::Continue => AdvanceOutcome::Ignored,
            },
            DeckPhase::Active(index) => {
                let Some(card) = self.cards.get(index) else {
                    return AdvanceOutcome::Ignored;
                };
                if card.is_insight() {
                    // Any exit from an insight is a neutral continue.
                    self.position += 1;
                    return AdvanceOutcome::Continued;
                }
                match action {
                    DeckAction::Swipe(direction) => {
                        let answer = Answer::new(card.prompt.clone(), direction.decision());
                        self.history.push(answer.clone());
                        self.position += 1;
                        AdvanceOutcome::Answered(answer)
                    }
                    DeckAction::Continue => AdvanceOutcome::Ignored,
                }
            }
        }
    }

    /// Appends supplied cards in order. Ids that collide with cards already in the
    /// buffer are renumbered past the current maximum.
    pub fn append_cards(&mut self, incoming: Vec<Card>) -> usize {
        let mut seen: HashSet<CardId> = self.cards.iter().map(|card| card.id).collect();
        let mut next_id = self.next_free_id();
        let mut appended = 0;
        for mut card in incoming {
            if !seen.insert(card.id) {
                card.id = CardId(free_id(&seen, next_id));
                seen.insert(card.id);
            }
            next_id = next_id.max(card.id.0.saturating_add(1));
            self.cards.push(card);
            appended += 1;
        }
        appended
    }

    pub fn restart(&mut self, cards: Vec<Card>) {
        self.cards = unique_ids(cards);
        self.history.clear();
        self.position = 0;
        self.in_instruction = true;
    }

    pub fn snapshot(&self, client_id: &ClientId) -> SessionSnapshot {
        SessionSnapshot {
            client_id: client_id.clone(),
            history: self.history.clone(),
            position: self.position,
            cards: self.cards.clone(),
        }
    }

    fn next_free_id(&self) -> i64 {
        self.cards
            .iter()
            .map(|card| card.id.0.saturating_add(1))
            .max()
            .unwrap_or_default()
    }
}

/// `hint` unless it is taken, which only happens once ids reach `i64::MAX`;
/// then the lowest unused non-negative id.
fn free_id(seen: &HashSet<CardId>, hint: i64) -> i64 {
    if !seen.contains(&CardId(hint)) {
        return hint;
    }
    (0..=i64::MAX)
        .find(|id| !seen.contains(&CardId(*id)))
        .unwrap_or(hint)
}

fn unique_ids(cards: Vec<Card>) -> Vec<Card> {
    let mut deck = Deck {
        cards: Vec::with_capacity(cards.len()),
        position: 0,
        history: Vec::new(),
        in_instruction: true,
    };
    deck.append_cards(cards);
    deck.cards
}

#[cfg(test)]
#[path = "tests/deck_tests.rs"]
mod tests;
