use anyhow::{bail, Result};
use deck_core::{
    gesture::{Point, PointerEvent, PointerKind},
    render::{CardFrame, RenderInstruction},
};
use shared::domain::SwipeDirection;

/// Horizontal travel of a scripted swipe, past the commit threshold.
pub const SWIPE_DISTANCE_PX: f32 = 160.0;
const SWIPE_STEPS: u16 = 8;
const ORIGIN: Point = Point::new(200.0, 320.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Drag the card off screen.
    Swipe(SwipeDirection),
    /// Press the accept or reject button.
    Decide(SwipeDirection),
    Continue,
    Restart,
    ToggleDark,
    Show,
    Quit,
}

impl Command {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "r" | "right" => Some(Command::Swipe(SwipeDirection::Right)),
            "l" | "left" => Some(Command::Swipe(SwipeDirection::Left)),
            "y" | "yes" => Some(Command::Decide(SwipeDirection::Right)),
            "n" | "no" => Some(Command::Decide(SwipeDirection::Left)),
            "c" | "continue" => Some(Command::Continue),
            "restart" => Some(Command::Restart),
            "dark" => Some(Command::ToggleDark),
            "show" | "s" => Some(Command::Show),
            "q" | "quit" | "exit" => Some(Command::Quit),
            _ => None,
        }
    }
}

/// Parses a `--swipes` script such as `r,l,c,r`. Blank entries are skipped.
pub fn parse_script(script: &str) -> Result<Vec<Command>> {
    let mut commands = Vec::new();
    for entry in script.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        match Command::parse(entry) {
            Some(command) => commands.push(command),
            None => bail!("unknown command {entry:?} in swipe script"),
        }
    }
    Ok(commands)
}

/// A touch drag from the card centre, ending `distance` pixels sideways.
pub fn drag_events(direction: SwipeDirection, distance: f32) -> Vec<PointerEvent> {
    let kind = PointerKind::Touch;
    let mut events = Vec::with_capacity(usize::from(SWIPE_STEPS) + 2);
    events.push(PointerEvent::Down {
        kind,
        point: ORIGIN,
    });
    for step in 1..=SWIPE_STEPS {
        let dx = direction.sign() * distance * f32::from(step) / f32::from(SWIPE_STEPS);
        events.push(PointerEvent::Move {
            kind,
            point: Point::new(ORIGIN.x + dx, ORIGIN.y),
        });
    }
    events.push(PointerEvent::Up { kind });
    events
}

pub fn describe(instruction: &RenderInstruction, dark_mode: bool) -> String {
    let theme = if dark_mode { "dark" } else { "light" };
    let body = match instruction {
        RenderInstruction::Loading => "loading…".to_string(),
        RenderInstruction::Instruction(frame) => {
            format!("Swipe right for yes, left for no. Swipe to begin.{}", hint(frame))
        }
        RenderInstruction::Question {
            card,
            frame,
            ordinal,
            total,
        } => format!(
            "[{ordinal}/{total}] ({}) {}{}",
            card.category,
            card.prompt,
            hint(frame)
        ),
        RenderInstruction::Insight { text, .. } => format!("insight: {text} (c to continue)"),
        RenderInstruction::Completed { answered } => {
            format!("session complete: {answered} answers recorded")
        }
    };
    format!("[{theme}] {body}")
}

fn hint(frame: &CardFrame) -> &'static str {
    match frame.hint {
        Some(SwipeDirection::Right) => " -> yes",
        Some(SwipeDirection::Left) => " <- no",
        None => "",
    }
}

#[cfg(test)]
#[path = "tests/commands_tests.rs"]
mod tests;
