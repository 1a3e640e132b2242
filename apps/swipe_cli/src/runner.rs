use std::{sync::Arc, time::Duration};

use anyhow::Result;
use deck_core::{preferences::AppSettings, SwipeDeck};
use tracing::{debug, info};

use crate::commands::{describe, drag_events, Command, SWIPE_DISTANCE_PX};

/// Extra wait past the settle window so the exit timer has fired.
const SETTLE_SLACK: Duration = Duration::from_millis(20);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

pub struct Runner {
    deck: Arc<SwipeDeck>,
    preferences: AppSettings,
}

impl Runner {
    pub fn new(deck: Arc<SwipeDeck>, preferences: AppSettings) -> Self {
        Self { deck, preferences }
    }

    pub async fn execute(&self, command: Command) -> Result<Flow> {
        debug!(?command, "cli: executing");
        match command {
            Command::Swipe(direction) => {
                for event in drag_events(direction, SWIPE_DISTANCE_PX) {
                    self.deck.handle_pointer(event).await;
                }
                self.wait_for_settle().await;
            }
            Command::Decide(direction) => {
                if self.deck.decide(direction).await {
                    self.wait_for_settle().await;
                } else {
                    info!(?direction, "cli: decision ignored");
                }
            }
            Command::Continue => {
                if self.deck.continue_insight().await {
                    self.wait_for_settle().await;
                } else {
                    info!("cli: no insight card to continue");
                }
            }
            Command::Restart => self.deck.restart().await,
            Command::ToggleDark => {
                let enabled = self.preferences.toggle_dark_mode()?;
                info!(dark_mode = enabled, "cli: theme changed");
            }
            Command::Show => {}
            Command::Quit => return Ok(Flow::Quit),
        }
        Ok(Flow::Continue)
    }

    pub async fn show(&self) -> String {
        describe(&self.deck.render().await, self.preferences.dark_mode())
    }

    pub async fn flush(&self) {
        self.deck.flush().await;
    }

    async fn wait_for_settle(&self) {
        tokio::time::sleep(self.deck.config().settle + SETTLE_SLACK).await;
    }
}

#[cfg(test)]
#[path = "tests/runner_tests.rs"]
mod tests;
