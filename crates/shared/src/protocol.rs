use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::{CardId, CardKind, ClientId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Card {
    pub id: CardId,
    #[serde(rename = "question")]
    pub prompt: String,
    #[serde(default)]
    pub category: String,
    #[serde(rename = "type", default)]
    pub kind: CardKind,
    #[serde(rename = "insight", default, skip_serializing_if = "Option::is_none")]
    pub insight_text: Option<String>,
}

impl Card {
    pub fn question(id: i64, prompt: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: CardId(id),
            prompt: prompt.into(),
            category: category.into(),
            kind: CardKind::Question,
            insight_text: None,
        }
    }

    pub fn insight(
        id: i64,
        prompt: impl Into<String>,
        category: impl Into<String>,
        insight_text: impl Into<String>,
    ) -> Self {
        Self {
            id: CardId(id),
            prompt: prompt.into(),
            category: category.into(),
            kind: CardKind::Insight,
            insight_text: Some(insight_text.into()),
        }
    }

    pub fn is_insight(&self) -> bool {
        self.kind == CardKind::Insight
    }

    /// Body text shown for the card; insights fall back to the prompt.
    pub fn display_text(&self) -> &str {
        match (&self.kind, &self.insight_text) {
            (CardKind::Insight, Some(text)) if !text.trim().is_empty() => text,
            _ => &self.prompt,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    #[serde(rename = "question")]
    pub prompt_text: String,
    #[serde(rename = "answer")]
    pub decision: bool,
}

impl Answer {
    pub fn new(prompt_text: impl Into<String>, decision: bool) -> Self {
        Self {
            prompt_text: prompt_text.into(),
            decision,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub client_id: ClientId,
    #[serde(default)]
    pub history: Vec<Answer>,
    #[serde(rename = "current_index", default)]
    pub position: usize,
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// Body of a session read. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionReadResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<ClientId>,
    #[serde(default)]
    pub history: Vec<Answer>,
    #[serde(rename = "current_index", default)]
    pub position: usize,
    #[serde(default)]
    pub cards: Vec<Card>,
}

impl SessionReadResponse {
    /// An absent or empty card buffer means there is no session to resume.
    pub fn has_session(&self) -> bool {
        !self.cards.is_empty()
    }

    /// Tolerant decode: malformed history or cards collapse to empty and a
    /// non-numeric index to zero.
    pub fn from_value_lenient(value: &Value) -> Self {
        let client_id = value
            .get("client_id")
            .and_then(Value::as_str)
            .and_then(ClientId::parse);
        let history = value
            .get("history")
            .and_then(|raw| serde_json::from_value::<Vec<Answer>>(raw.clone()).ok())
            .unwrap_or_default();
        let position = value
            .get("current_index")
            .and_then(Value::as_u64)
            .map(|raw| raw as usize)
            .unwrap_or_default();
        Self {
            client_id,
            history,
            position,
            cards: cards_from_value(value),
        }
    }
}

impl From<SessionSnapshot> for SessionReadResponse {
    fn from(value: SessionSnapshot) -> Self {
        Self {
            client_id: Some(value.client_id),
            history: value.history,
            position: value.position,
            cards: value.cards,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionWriteResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateCardsRequest {
    #[serde(default)]
    pub history: Vec<Answer>,
    #[serde(default)]
    pub current_count: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerateCardsResponse {
    #[serde(default)]
    pub cards: Vec<Card>,
}

/// Reads the `cards` array of a response body, skipping entries that do not
/// decode. A missing or non-array field yields an empty list.
pub fn cards_from_value(value: &Value) -> Vec<Card> {
    let Some(items) = value.get("cards").and_then(Value::as_array) else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| serde_json::from_value::<Card>(item.clone()).ok())
        .collect()
}
