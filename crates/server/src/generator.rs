//! Deterministic card generation for a staged screening session.
//!
//! Cards are laid out in slots: each block of `insight_every` questions is followed
//! by one insight slot. A card's id is its slot number, so a request that says the
//! client already holds `current_count` cards continues at slot `current_count`.

use shared::protocol::{Answer, Card, GenerateCardsRequest};

pub trait CardGenerator: Send + Sync {
    fn generate(&self, request: &GenerateCardsRequest) -> Vec<Card>;
}

struct Stage {
    category: &'static str,
    prompts: [&'static str; 5],
}

const STAGES: [Stage; 6] = [
    Stage {
        category: "screening",
        prompts: [
            "Do you often feel anxious without a clear reason?",
            "Has worry made it hard to sleep lately?",
            "Do you notice your heart racing when you are stressed?",
            "Do you avoid situations because they make you nervous?",
            "Is it hard to stop a worrying thought once it starts?",
        ],
    },
    Stage {
        category: "triggers",
        prompts: [
            "Do certain people make the feeling stronger?",
            "Does it get worse at a particular time of day?",
            "Do crowded places set it off?",
            "Does work or study pressure bring it on?",
            "Do you feel it more when you are alone?",
        ],
    },
    Stage {
        category: "cognition",
        prompts: [
            "Do you expect the worst outcome in uncertain situations?",
            "Do you see things as a total success or a total failure?",
            "Do you assume others judge you negatively?",
            "Do you blame yourself when things go wrong?",
            "Do you believe you must stay in control at all times?",
        ],
    },
    Stage {
        category: "behavior",
        prompts: [
            "Do you put off tasks that make you uneasy?",
            "Do you seek reassurance from others often?",
            "Do you freeze up when the feeling hits?",
            "Has physical activity helped you feel calmer?",
            "Do you use your phone to distract yourself from worry?",
        ],
    },
    Stage {
        category: "resources",
        prompts: [
            "Is there someone you can talk to openly?",
            "Do you have a hobby that absorbs your attention?",
            "Have you tried a breathing or relaxation technique?",
            "Would you be willing to try a short daily practice?",
            "Do you get outside for some fresh air most days?",
        ],
    },
    Stage {
        category: "action",
        prompts: [
            "Can you name one small step to take tomorrow?",
            "Will you try slow breathing the next time worry starts?",
            "Could you write down a worrying thought and question it?",
            "Will you reach out to someone you trust this week?",
            "Are you ready to notice one thing that went well today?",
        ],
    },
];

const PROMPTS_PER_STAGE: usize = 5;
const TOTAL_QUESTIONS: usize = STAGES.len() * PROMPTS_PER_STAGE;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Slot {
    Question(usize),
    /// Insight closing the block that ends before question `next_question`.
    Insight { next_question: usize },
}

#[derive(Debug, Clone)]
pub struct StagedGenerator {
    batch_size: usize,
    insight_every: usize,
}

impl Default for StagedGenerator {
    fn default() -> Self {
        Self::new(10, 5)
    }
}

impl StagedGenerator {
    /// `insight_every == 0` disables insight cards.
    pub fn new(batch_size: usize, insight_every: usize) -> Self {
        Self {
            batch_size,
            insight_every,
        }
    }

    fn slot(&self, slot: usize) -> Slot {
        if self.insight_every == 0 {
            return Slot::Question(slot);
        }
        let block_len = self.insight_every + 1;
        let block = slot / block_len;
        let offset = slot % block_len;
        if offset == self.insight_every {
            Slot::Insight {
                next_question: (block + 1) * self.insight_every,
            }
        } else {
            Slot::Question(block * self.insight_every + offset)
        }
    }
}

impl CardGenerator for StagedGenerator {
    fn generate(&self, request: &GenerateCardsRequest) -> Vec<Card> {
        let mut cards = Vec::with_capacity(self.batch_size);
        for i in 0..self.batch_size {
            let id = request.current_count + i;
            let card = match self.slot(id) {
                Slot::Question(index) if index < TOTAL_QUESTIONS => {
                    let stage = &STAGES[index / PROMPTS_PER_STAGE];
                    Card::question(
                        id as i64,
                        stage.prompts[index % PROMPTS_PER_STAGE],
                        stage.category,
                    )
                }
                Slot::Insight { next_question } if next_question <= TOTAL_QUESTIONS => {
                    Card::insight(
                        id as i64,
                        "Checkpoint",
                        "insight",
                        insight_text(&request.history, next_question),
                    )
                }
                _ => break,
            };
            cards.push(card);
        }
        cards
    }
}

fn insight_text(history: &[Answer], next_question: usize) -> String {
    let yes = history.iter().filter(|answer| answer.decision).count();
    let summary = if history.is_empty() {
        "No answers recorded yet.".to_string()
    } else {
        format!("So far you answered yes to {yes} of {} questions.", history.len())
    };
    match STAGES.get(next_question / PROMPTS_PER_STAGE) {
        Some(stage) if next_question < TOTAL_QUESTIONS => {
            format!("{summary} Next we look at {}.", stage.category)
        }
        _ => format!("{summary} That completes the session plan."),
    }
}

#[cfg(test)]
#[path = "tests/generator_tests.rs"]
mod tests;
