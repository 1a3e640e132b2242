use std::sync::Arc;

use serde::{Deserialize, Serialize};
use shared::{
    domain::ClientId,
    error::{ApiError, ErrorCode},
    protocol::{
        Answer, Card, GenerateCardsRequest, GenerateCardsResponse, SessionReadResponse,
        SessionSnapshot, SessionWriteResponse,
    },
};
use storage::Storage;
use tracing::{debug, info};

use crate::generator::CardGenerator;

#[derive(Clone)]
pub struct ApiContext {
    pub storage: Storage,
    pub generator: Arc<dyn CardGenerator>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct ClientQuery {
    pub client_id: Option<String>,
}

/// Body of `POST /session`. The client id is validated here rather than by serde so
/// that a blank id is reported as a validation error.
#[derive(Debug, Deserialize)]
pub struct SessionWriteRequest {
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub history: Vec<Answer>,
    #[serde(rename = "current_index", default)]
    pub position: usize,
    #[serde(default)]
    pub cards: Vec<Card>,
}

pub fn session_route() -> &'static str {
    "/session"
}

pub fn cards_route() -> &'static str {
    "/cards"
}

pub async fn read_session(
    ctx: &ApiContext,
    client_id: Option<&str>,
) -> Result<SessionReadResponse, ApiError> {
    let client_id = require_client_id(client_id)?;
    let stored = ctx
        .storage
        .load_session(&client_id)
        .await
        .map_err(internal)?;

    Ok(match stored {
        Some(stored) => {
            debug!(%client_id, position = stored.snapshot.position, "session: loaded");
            SessionReadResponse::from(stored.snapshot)
        }
        None => SessionReadResponse {
            client_id: Some(client_id),
            ..SessionReadResponse::default()
        },
    })
}

pub async fn write_session(
    ctx: &ApiContext,
    request: SessionWriteRequest,
) -> Result<SessionWriteResponse, ApiError> {
    let client_id = require_client_id(request.client_id.as_deref())?;
    if request.position > request.cards.len() {
        return Err(ApiError::new(
            ErrorCode::Validation,
            "current_index is past the end of cards",
        ));
    }
    let snapshot = SessionSnapshot {
        client_id,
        history: request.history,
        position: request.position,
        cards: request.cards,
    };
    ctx.storage
        .upsert_session(&snapshot)
        .await
        .map_err(internal)?;
    debug!(
        client_id = %snapshot.client_id,
        position = snapshot.position,
        cards = snapshot.cards.len(),
        "session: saved"
    );
    Ok(SessionWriteResponse { success: true })
}

pub async fn delete_session(
    ctx: &ApiContext,
    client_id: Option<&str>,
) -> Result<SessionWriteResponse, ApiError> {
    let client_id = require_client_id(client_id)?;
    let removed = ctx
        .storage
        .delete_session(&client_id)
        .await
        .map_err(internal)?;
    info!(%client_id, removed, "session: cleared");
    Ok(SessionWriteResponse { success: true })
}

pub fn generate_cards(ctx: &ApiContext, request: &GenerateCardsRequest) -> GenerateCardsResponse {
    let cards = ctx.generator.generate(request);
    debug!(
        current_count = request.current_count,
        answered = request.history.len(),
        generated = cards.len(),
        "cards: generated batch"
    );
    GenerateCardsResponse { cards }
}

fn require_client_id(raw: Option<&str>) -> Result<ClientId, ApiError> {
    raw.and_then(ClientId::parse)
        .ok_or_else(|| ApiError::new(ErrorCode::Validation, "client_id required"))
}

fn internal(err: anyhow::Error) -> ApiError {
    ApiError::new(ErrorCode::Internal, err.to_string())
}

#[cfg(test)]
#[path = "tests/mod_tests.rs"]
mod tests;
