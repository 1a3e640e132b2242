//! Pure mapping from engine state to what the host should draw.

use std::time::Duration;

use shared::{domain::SwipeDirection, protocol::Card};

use crate::{
    deck::{Deck, DeckPhase},
    gesture::{visuals_for, GestureState, Offset},
    transition::Transition,
};

#[derive(Debug, Clone, Copy)]
pub struct DeckView<'a> {
    pub loaded: bool,
    pub phase: DeckPhase,
    pub card: Option<&'a Card>,
    pub total: usize,
    pub answered: usize,
}

impl<'a> DeckView<'a> {
    pub fn of(deck: &'a Deck, loaded: bool) -> Self {
        Self {
            loaded,
            phase: deck.phase(),
            card: deck.current_card(),
            total: deck.cards().len(),
            answered: deck.answered(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Motion {
    Resting,
    /// Follows the pointer with no easing.
    Tracking,
    Exiting { duration: Duration },
    SpringBack { duration: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardFrame {
    pub offset: Offset,
    pub rotation_degrees: f32,
    pub opacity: f32,
    pub hint: Option<SwipeDirection>,
    pub motion: Motion,
    pub interactive: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderInstruction {
    Loading,
    Instruction(CardFrame),
    Question {
        card: Card,
        frame: CardFrame,
        ordinal: usize,
        total: usize,
    },
    Insight {
        card: Card,
        text: String,
        frame: CardFrame,
    },
    Completed {
        answered: usize,
    },
}

pub fn frame_for(gesture: &GestureState, transition: &Transition) -> CardFrame {
    match transition {
        Transition::Exiting(exit) => CardFrame {
            offset: exit.target,
            rotation_degrees: 0.0,
            opacity: 0.0,
            hint: None,
            motion: Motion::Exiting {
                duration: exit.duration,
            },
            interactive: false,
        },
        _ => {
            let visuals = visuals_for(gesture);
            let motion = match transition {
                _ if gesture.active => Motion::Tracking,
                Transition::SpringingBack(spring) => Motion::SpringBack {
                    duration: spring.duration,
                },
                _ => Motion::Resting,
            };
            CardFrame {
                offset: gesture.offset,
                rotation_degrees: visuals.rotation_degrees,
                opacity: visuals.opacity,
                hint: visuals.hint,
                motion,
                interactive: true,
            }
        }
    }
}

pub fn render(view: &DeckView<'_>, gesture: &GestureState, transition: &Transition) -> RenderInstruction {
    if !view.loaded {
        return RenderInstruction::Loading;
    }
    let frame = frame_for(gesture, transition);
    match (view.phase, view.card) {
        (DeckPhase::Instruction, _) => RenderInstruction::Instruction(frame),
        (DeckPhase::Active(_), Some(card)) if card.is_insight() => RenderInstruction::Insight {
            card: card.clone(),
            text: card.display_text().to_string(),
            frame,
        },
        (DeckPhase::Active(index), Some(card)) => RenderInstruction::Question {
            card: card.clone(),
            frame,
            ordinal: index + 1,
            total: view.total,
        },
        (DeckPhase::Active(_), None) | (DeckPhase::Completed, _) => RenderInstruction::Completed {
            answered: view.answered,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        deck::DeckAction,
        gesture::{GestureTracker, Point},
        transition::TransitionAnimator,
    };
    use shared::protocol::Card;

    fn deck() -> Deck {
        Deck::new(vec![
            Card::question(0, "Do you feel anxious?", "screening"),
            Card::insight(1, "Checkpoint", "insight", "Mostly yes so far"),
        ])
    }

    #[test]
    fn unloaded_deck_renders_loading() {
        let deck = deck();
        let view = DeckView::of(&deck, false);
        assert_eq!(
            render(&view, &GestureState::default(), &Transition::Idle),
            RenderInstruction::Loading
        );
    }

    #[test]
    fn dragging_question_tracks_pointer() {
        let mut deck = deck();
        deck.apply(DeckAction::Swipe(SwipeDirection::Right));
        let mut tracker = GestureTracker::new();
        tracker.begin(Point::new(0.0, 0.0));
        tracker.update(Point::new(-60.0, 0.0));

        let view = DeckView::of(&deck, true);
        match render(&view, &tracker.state(), &Transition::Idle) {
            RenderInstruction::Question {
                frame,
                ordinal,
                total,
                ..
            } => {
                assert_eq!((ordinal, total), (1, 2));
                assert_eq!(frame.motion, Motion::Tracking);
                assert_eq!(frame.rotation_degrees, -3.0);
                assert_eq!(frame.hint, Some(SwipeDirection::Left));
                assert!(frame.interactive);
            }
            other => panic!("unexpected render: {other:?}"),
        }
    }

    #[test]
    fn exiting_card_is_parked_offscreen_and_inert() {
        let deck = deck();
        let mut animator = TransitionAnimator::default();
        let exit = animator.begin_exit(SwipeDirection::Right, Offset::new(140.0, 0.0));
        let view = DeckView::of(&deck, true);
        match render(&view, &GestureState::default(), &animator.state()) {
            RenderInstruction::Instruction(frame) => {
                assert_eq!(frame.offset, exit.target);
                assert_eq!(frame.opacity, 0.0);
                assert!(!frame.interactive);
            }
            other => panic!("unexpected render: {other:?}"),
        }
    }

    #[test]
    fn insight_renders_its_summary_text() {
        let mut deck = deck();
        deck.apply(DeckAction::Swipe(SwipeDirection::Right));
        deck.apply(DeckAction::Swipe(SwipeDirection::Left));
        let view = DeckView::of(&deck, true);
        match render(&view, &GestureState::default(), &Transition::Idle) {
            RenderInstruction::Insight { text, frame, .. } => {
                assert_eq!(text, "Mostly yes so far");
                assert_eq!(frame.motion, Motion::Resting);
            }
            other => panic!("unexpected render: {other:?}"),
        }
    }

    #[test]
    fn exhausted_deck_renders_completion() {
        let mut deck = deck();
        deck.apply(DeckAction::Swipe(SwipeDirection::Right));
        deck.apply(DeckAction::Swipe(SwipeDirection::Left));
        deck.apply(DeckAction::Continue);
        let view = DeckView::of(&deck, true);
        assert_eq!(
            render(&view, &GestureState::default(), &Transition::Idle),
            RenderInstruction::Completed { answered: 1 }
        );
    }
}
