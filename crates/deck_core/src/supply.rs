use anyhow::Result;
use async_trait::async_trait;
use shared::protocol::{Answer, Card, GenerateCardsRequest};
use tracing::{info, warn};

pub const DEFAULT_REFILL_THRESHOLD: usize = 3;

#[async_trait]
pub trait CardSource: Send + Sync {
    async fn generate(&self, request: GenerateCardsRequest) -> Result<Vec<Card>>;
}

pub struct MissingCardSource;

#[async_trait]
impl CardSource for MissingCardSource {
    async fn generate(&self, _request: GenerateCardsRequest) -> Result<Vec<Card>> {
        Err(anyhow::anyhow!("card generator is unavailable"))
    }
}

/// Decides when the buffer needs topping up.
///
/// A request fires at most once per `(buffer length, position)` gap: while one is
/// in flight nothing else fires, and after it lands the same gap stays quiet until
/// the buffer grows or the position moves.
#[derive(Debug, Clone)]
pub struct RefillGuard {
    threshold: usize,
    in_flight: bool,
    last_gap: Option<(usize, usize)>,
}

impl RefillGuard {
    pub fn new(threshold: usize) -> Self {
        Self {
            threshold,
            in_flight: false,
            last_gap: None,
        }
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn try_begin(&mut self, cards_len: usize, position: usize) -> bool {
        if self.in_flight {
            return false;
        }
        if cards_len.saturating_sub(position) > self.threshold {
            return false;
        }
        let gap = (cards_len, position);
        if self.last_gap == Some(gap) {
            return false;
        }
        self.in_flight = true;
        self.last_gap = Some(gap);
        true
    }

    pub fn complete(&mut self) {
        self.in_flight = false;
    }

    pub fn reset(&mut self) {
        self.in_flight = false;
        self.last_gap = None;
    }
}

/// Asks the generator for more cards. Failures are logged and read as "nothing to
/// add right now".
pub async fn fetch_more(
    source: &dyn CardSource,
    history: Vec<Answer>,
    current_count: usize,
) -> Vec<Card> {
    let answered = history.len();
    match source
        .generate(GenerateCardsRequest {
            history,
            current_count,
        })
        .await
    {
        Ok(cards) => {
            info!(
                current_count,
                answered,
                received = cards.len(),
                "supply: generator returned cards"
            );
            cards
        }
        Err(err) => {
            warn!(current_count, answered, error = %err, "supply: card request failed");
            Vec::new()
        }
    }
}
