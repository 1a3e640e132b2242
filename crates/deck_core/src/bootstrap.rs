use std::{fs, path::Path};

use anyhow::{Context, Result};
use shared::protocol::Card;

/// Supplies the fallback buffer used when there is no session to resume.
pub trait BootstrapProvider: Send + Sync {
    fn cards(&self) -> Vec<Card>;
}

#[derive(Debug, Clone)]
pub struct StaticBootstrap {
    cards: Vec<Card>,
}

impl StaticBootstrap {
    pub fn new(cards: Vec<Card>) -> Self {
        Self { cards }
    }

    /// Reads a JSON array of cards, e.g. `[{"id": 0, "question": "..."}]`.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path)
            .with_context(|| format!("failed to read bootstrap cards '{}'", path.display()))?;
        let cards: Vec<Card> = serde_json::from_str(&raw)
            .with_context(|| format!("invalid bootstrap cards in '{}'", path.display()))?;
        Ok(Self::new(cards))
    }
}

impl Default for StaticBootstrap {
    fn default() -> Self {
        Self::new(vec![
            Card::question(0, "Do you often feel anxious without a clear reason?", "screening"),
            Card::question(1, "Has worry made it hard to sleep lately?", "screening"),
            Card::question(2, "Do you notice your heart racing when you are stressed?", "screening"),
            Card::question(3, "Do you avoid situations because they make you nervous?", "screening"),
            Card::question(4, "Is it hard to stop a worrying thought once it starts?", "screening"),
        ])
    }
}

impl BootstrapProvider for StaticBootstrap {
    fn cards(&self) -> Vec<Card> {
        self.cards.clone()
    }
}
