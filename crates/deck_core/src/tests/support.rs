//! In-memory collaborators shared by the engine tests.

use std::{
    collections::{HashMap, VecDeque},
    sync::Arc,
};

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use shared::{
    domain::ClientId,
    protocol::{Card, GenerateCardsRequest, SessionReadResponse, SessionSnapshot},
};
use tokio::sync::{oneshot, Mutex};

use crate::{session_sync::SessionStore, supply::CardSource};

pub(crate) fn questions(range: std::ops::Range<i64>) -> Vec<Card> {
    range
        .map(|i| Card::question(i, format!("question {i}"), "screening"))
        .collect()
}

#[derive(Default)]
pub(crate) struct MemorySessionStore {
    pub sessions: Mutex<HashMap<ClientId, SessionSnapshot>>,
    pub writes: Arc<Mutex<Vec<SessionSnapshot>>>,
    pub deletes: Arc<Mutex<Vec<ClientId>>>,
    pub fail_with: Option<String>,
    pub read_gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl MemorySessionStore {
    pub fn with_session(snapshot: SessionSnapshot) -> Self {
        let store = Self::default();
        store
            .sessions
            .try_lock()
            .expect("fresh store")
            .insert(snapshot.client_id.clone(), snapshot);
        store
    }

    pub fn failing(err: impl Into<String>) -> Self {
        Self {
            fail_with: Some(err.into()),
            ..Self::default()
        }
    }

    /// Holds the next read until the returned sender fires.
    pub fn gate_reads(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.read_gate.try_lock().expect("fresh store") = Some(rx);
        tx
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn read(&self, client_id: &ClientId) -> Result<Option<SessionReadResponse>> {
        let gate = self.read_gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        Ok(self
            .sessions
            .lock()
            .await
            .get(client_id)
            .cloned()
            .map(SessionReadResponse::from))
    }

    async fn write(&self, snapshot: &SessionSnapshot) -> Result<()> {
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        self.writes.lock().await.push(snapshot.clone());
        self.sessions
            .lock()
            .await
            .insert(snapshot.client_id.clone(), snapshot.clone());
        Ok(())
    }

    async fn delete(&self, client_id: &ClientId) -> Result<()> {
        if let Some(err) = &self.fail_with {
            return Err(anyhow!(err.clone()));
        }
        self.deletes.lock().await.push(client_id.clone());
        self.sessions.lock().await.remove(client_id);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct ScriptedCardSource {
    pub batches: Mutex<VecDeque<Result<Vec<Card>, String>>>,
    pub requests: Arc<Mutex<Vec<GenerateCardsRequest>>>,
    pub gate: Mutex<Option<oneshot::Receiver<()>>>,
}

impl ScriptedCardSource {
    pub fn with_batches(batches: Vec<Result<Vec<Card>, String>>) -> Self {
        Self {
            batches: Mutex::new(batches.into()),
            ..Self::default()
        }
    }

    /// Holds the next response until the returned sender fires.
    pub fn gate_next(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        *self.gate.try_lock().expect("fresh source") = Some(rx);
        tx
    }
}

#[async_trait]
impl CardSource for ScriptedCardSource {
    async fn generate(&self, request: GenerateCardsRequest) -> Result<Vec<Card>> {
        self.requests.lock().await.push(request);
        let gate = self.gate.lock().await.take();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        match self.batches.lock().await.pop_front() {
            Some(Ok(cards)) => Ok(cards),
            Some(Err(err)) => Err(anyhow!(err)),
            None => Ok(Vec::new()),
        }
    }
}
