//! Pointer tracking for the top card.
//!
//! Mouse and touch streams are folded into a single accumulated offset. Only one
//! gesture is tracked at a time; events from a second pointer kind are dropped
//! until the active gesture ends.

use std::ops::Sub;

use shared::domain::SwipeDirection;

pub const COMMIT_THRESHOLD_PX: f32 = 100.0;
pub const HINT_THRESHOLD_PX: f32 = 50.0;
pub const MIN_OPACITY: f32 = 0.5;
const ROTATION_DIVISOR: f32 = 20.0;
const OPACITY_FALLOFF_PX: f32 = 300.0;

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Offset {
    pub x: f32,
    pub y: f32,
}

impl Offset {
    pub const ZERO: Offset = Offset { x: 0.0, y: 0.0 };

    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }
}

impl Sub for Point {
    type Output = Offset;

    fn sub(self, rhs: Point) -> Offset {
        Offset {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PointerKind {
    Mouse,
    Touch,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PointerEvent {
    Down { kind: PointerKind, point: Point },
    Move { kind: PointerKind, point: Point },
    Up { kind: PointerKind },
    /// The pointer left the interactive surface.
    Leave { kind: PointerKind },
}

impl PointerEvent {
    pub fn kind(&self) -> PointerKind {
        match self {
            PointerEvent::Down { kind, .. }
            | PointerEvent::Move { kind, .. }
            | PointerEvent::Up { kind }
            | PointerEvent::Leave { kind } => *kind,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GestureOutcome {
    Commit(SwipeDirection),
    Cancel,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum GestureSignal {
    Started,
    Moved(Offset),
    Ended(GestureOutcome),
    Ignored,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct GestureState {
    pub active: bool,
    pub origin: Point,
    pub offset: Offset,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CardVisuals {
    pub rotation_degrees: f32,
    pub opacity: f32,
    pub hint: Option<SwipeDirection>,
}

pub fn rotation_degrees(offset: Offset, active: bool) -> f32 {
    if active {
        offset.x / ROTATION_DIVISOR
    } else {
        0.0
    }
}

pub fn opacity(offset: Offset) -> f32 {
    (1.0 - offset.x.abs() / OPACITY_FALLOFF_PX).max(MIN_OPACITY)
}

pub fn visuals_for(state: &GestureState) -> CardVisuals {
    let hint = (state.active && state.offset.x.abs() > HINT_THRESHOLD_PX)
        .then(|| SwipeDirection::from_offset(state.offset.x));
    CardVisuals {
        rotation_degrees: rotation_degrees(state.offset, state.active),
        opacity: opacity(state.offset),
        hint,
    }
}

#[derive(Debug, Clone)]
pub struct GestureTracker {
    state: GestureState,
    pointer: Option<PointerKind>,
    commit_threshold: f32,
}

impl Default for GestureTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::with_commit_threshold(COMMIT_THRESHOLD_PX)
    }

    pub fn with_commit_threshold(commit_threshold: f32) -> Self {
        Self {
            state: GestureState::default(),
            pointer: None,
            commit_threshold,
        }
    }

    pub fn state(&self) -> GestureState {
        self.state
    }

    pub fn offset(&self) -> Offset {
        self.state.offset
    }

    pub fn is_active(&self) -> bool {
        self.state.active
    }

    pub fn visuals(&self) -> CardVisuals {
        visuals_for(&self.state)
    }

    pub fn begin(&mut self, point: Point) -> bool {
        if self.state.active {
            return false;
        }
        self.state = GestureState {
            active: true,
            origin: point,
            offset: Offset::ZERO,
        };
        true
    }

    pub fn update(&mut self, point: Point) -> Option<Offset> {
        if !self.state.active {
            return None;
        }
        self.state.offset = point - self.state.origin;
        Some(self.state.offset)
    }

    /// Resolves the gesture. A commit keeps the offset so the exit can start from
    /// where the card was released; a cancel springs the offset back to zero.
    pub fn end(&mut self) -> Option<GestureOutcome> {
        if !self.state.active {
            return None;
        }
        self.state.active = false;
        self.pointer = None;

        if self.state.offset.x.abs() > self.commit_threshold {
            Some(GestureOutcome::Commit(SwipeDirection::from_offset(
                self.state.offset.x,
            )))
        } else {
            self.state.offset = Offset::ZERO;
            Some(GestureOutcome::Cancel)
        }
    }

    pub fn handle(&mut self, event: PointerEvent) -> GestureSignal {
        if let Some(active_kind) = self.pointer {
            if self.state.active && active_kind != event.kind() {
                return GestureSignal::Ignored;
            }
        }

        match event {
            PointerEvent::Down { kind, point } => {
                if self.begin(point) {
                    self.pointer = Some(kind);
                    GestureSignal::Started
                } else {
                    GestureSignal::Ignored
                }
            }
            PointerEvent::Move { point, .. } => self
                .update(point)
                .map(GestureSignal::Moved)
                .unwrap_or(GestureSignal::Ignored),
            PointerEvent::Up { .. } | PointerEvent::Leave { .. } => self
                .end()
                .map(GestureSignal::Ended)
                .unwrap_or(GestureSignal::Ignored),
        }
    }

    pub fn reset(&mut self) {
        self.state = GestureState::default();
        self.pointer = None;
    }
}

#[cfg(test)]
#[path = "tests/gesture_tests.rs"]
mod tests;
