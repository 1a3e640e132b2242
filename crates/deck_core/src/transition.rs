//! Exit and spring-back animation bookkeeping.
//!
//! The animator never sleeps itself. It hands out a ticket per exit and the engine
//! schedules the settle timer; only the ticket of the current exit can finish it.

use std::time::Duration;

use shared::domain::SwipeDirection;

use crate::gesture::Offset;

pub const SETTLE_DURATION: Duration = Duration::from_millis(300);
pub const SPRING_BACK_DURATION: Duration = Duration::from_millis(200);
pub const DEFAULT_VIEWPORT_WIDTH: f32 = 420.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Easing {
    EaseIn,
    EaseOut,
}

impl Easing {
    pub fn apply(self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::EaseIn => t * t,
            Easing::EaseOut => 1.0 - (1.0 - t) * (1.0 - t),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExitAnimation {
    pub ticket: u64,
    pub direction: SwipeDirection,
    pub from: Offset,
    pub target: Offset,
    pub duration: Duration,
    pub easing: Easing,
}

impl ExitAnimation {
    pub fn offset_at(&self, elapsed: Duration) -> Offset {
        interpolate(self.from, self.target, progress(elapsed, self.duration), self.easing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpringBack {
    pub from: Offset,
    pub duration: Duration,
    pub easing: Easing,
}

impl SpringBack {
    pub fn offset_at(&self, elapsed: Duration) -> Offset {
        interpolate(self.from, Offset::ZERO, progress(elapsed, self.duration), self.easing)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    Idle,
    Exiting(ExitAnimation),
    SpringingBack(SpringBack),
}

#[derive(Debug, Clone)]
pub struct TransitionAnimator {
    viewport_width: f32,
    settle: Duration,
    spring_back: Duration,
    state: Transition,
    next_ticket: u64,
}

impl Default for TransitionAnimator {
    fn default() -> Self {
        Self::new(DEFAULT_VIEWPORT_WIDTH, SETTLE_DURATION, SPRING_BACK_DURATION)
    }
}

impl TransitionAnimator {
    pub fn new(viewport_width: f32, settle: Duration, spring_back: Duration) -> Self {
        Self {
            viewport_width,
            settle,
            spring_back,
            state: Transition::Idle,
            next_ticket: 1,
        }
    }

    pub fn state(&self) -> Transition {
        self.state
    }

    pub fn settle_duration(&self) -> Duration {
        self.settle
    }

    /// Interactive unless an exit is waiting to settle.
    pub fn is_interactive(&self) -> bool {
        !matches!(self.state, Transition::Exiting(_))
    }

    pub fn begin_exit(&mut self, direction: SwipeDirection, from: Offset) -> ExitAnimation {
        let exit = ExitAnimation {
            ticket: self.next_ticket,
            direction,
            from,
            target: Offset::new(direction.sign() * self.viewport_width, from.y),
            duration: self.settle,
            easing: Easing::EaseIn,
        };
        self.next_ticket += 1;
        self.state = Transition::Exiting(exit);
        exit
    }

    pub fn begin_spring_back(&mut self, from: Offset) -> SpringBack {
        let spring = SpringBack {
            from,
            duration: self.spring_back,
            easing: Easing::EaseOut,
        };
        self.state = Transition::SpringingBack(spring);
        spring
    }

    /// Returns true when `ticket` belongs to the exit in progress.
    pub fn finish_exit(&mut self, ticket: u64) -> bool {
        match self.state {
            Transition::Exiting(exit) if exit.ticket == ticket => {
                self.state = Transition::Idle;
                true
            }
            _ => false,
        }
    }

    /// A new drag takes over from a spring-back that is still easing out.
    pub fn settle_input(&mut self) {
        if matches!(self.state, Transition::SpringingBack(_)) {
            self.state = Transition::Idle;
        }
    }

    pub fn reset(&mut self) {
        self.state = Transition::Idle;
    }
}

fn progress(elapsed: Duration, duration: Duration) -> f32 {
    if duration.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / duration.as_secs_f32()).min(1.0)
}

fn interpolate(from: Offset, to: Offset, t: f32, easing: Easing) -> Offset {
    let eased = easing.apply(t);
    Offset::new(
        from.x + (to.x - from.x) * eased,
        from.y + (to.y - from.y) * eased,
    )
}
