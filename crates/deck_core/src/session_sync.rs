//! Remote session persistence.
//!
//! Writes go through a single background writer so they land in issue order. Each
//! write is tagged with the session generation it was produced in; a restart bumps
//! the generation and anything queued before it is dropped instead of resurrecting
//! the cleared session.

use std::sync::{
    atomic::{AtomicU64, Ordering},
    Arc,
};

use anyhow::Result;
use async_trait::async_trait;
use shared::{
    domain::ClientId,
    protocol::{Answer, Card, SessionReadResponse, SessionSnapshot},
};
use tokio::{
    sync::{mpsc, oneshot},
    task::JoinHandle,
};
use tracing::{debug, info, warn};

#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn read(&self, client_id: &ClientId) -> Result<Option<SessionReadResponse>>;
    async fn write(&self, snapshot: &SessionSnapshot) -> Result<()>;
    async fn delete(&self, client_id: &ClientId) -> Result<()>;
}

pub struct MissingSessionStore;

#[async_trait]
impl SessionStore for MissingSessionStore {
    async fn read(&self, _client_id: &ClientId) -> Result<Option<SessionReadResponse>> {
        Err(anyhow::anyhow!("session store is unavailable"))
    }

    async fn write(&self, _snapshot: &SessionSnapshot) -> Result<()> {
        Err(anyhow::anyhow!("session store is unavailable"))
    }

    async fn delete(&self, _client_id: &ClientId) -> Result<()> {
        Err(anyhow::anyhow!("session store is unavailable"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreSource {
    Remote,
    Bootstrap,
}

#[derive(Debug, Clone)]
pub struct RestoredSession {
    pub cards: Vec<Card>,
    pub history: Vec<Answer>,
    pub position: usize,
    pub source: RestoreSource,
}

enum SyncCommand {
    Persist {
        generation: u64,
        snapshot: SessionSnapshot,
    },
    Clear {
        client_id: ClientId,
    },
    Flush(oneshot::Sender<()>),
}

pub struct SessionSynchronizer {
    store: Arc<dyn SessionStore>,
    client_id: ClientId,
    generation: Arc<AtomicU64>,
    queue: mpsc::UnboundedSender<SyncCommand>,
    _writer: JoinHandle<()>,
}

impl SessionSynchronizer {
    /// Starts the background writer; must be called inside a tokio runtime.
    pub fn spawn(store: Arc<dyn SessionStore>, client_id: ClientId) -> Self {
        let generation = Arc::new(AtomicU64::new(0));
        let (queue, rx) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(Arc::clone(&store), Arc::clone(&generation), rx));
        Self {
            store,
            client_id,
            generation,
            queue,
            _writer: writer,
        }
    }

    pub fn client_id(&self) -> &ClientId {
        &self.client_id
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    pub async fn restore(&self, bootstrap: Vec<Card>) -> RestoredSession {
        match self.store.read(&self.client_id).await {
            Ok(Some(session)) if session.has_session() => {
                info!(
                    client_id = %self.client_id,
                    position = session.position,
                    cards = session.cards.len(),
                    answered = session.history.len(),
                    "sync: resuming remote session"
                );
                RestoredSession {
                    cards: session.cards,
                    history: session.history,
                    position: session.position,
                    source: RestoreSource::Remote,
                }
            }
            Ok(_) => {
                info!(client_id = %self.client_id, "sync: no remote session; seeding bootstrap cards");
                bootstrap_session(bootstrap)
            }
            Err(err) => {
                warn!(
                    client_id = %self.client_id,
                    error = %err,
                    "sync: session read failed; seeding bootstrap cards"
                );
                bootstrap_session(bootstrap)
            }
        }
    }

    /// Queues a full snapshot upsert. Never waits on the network.
    pub fn persist(&self, generation: u64, snapshot: SessionSnapshot) {
        if self
            .queue
            .send(SyncCommand::Persist {
                generation,
                snapshot,
            })
            .is_err()
        {
            warn!(client_id = %self.client_id, "sync: writer stopped; snapshot not persisted");
        }
    }

    /// Starts a new session generation and queues deletion of the remote snapshot.
    /// Writes queued under the previous generation are discarded.
    pub fn clear(&self) -> u64 {
        let next = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        if self
            .queue
            .send(SyncCommand::Clear {
                client_id: self.client_id.clone(),
            })
            .is_err()
        {
            warn!(client_id = %self.client_id, "sync: writer stopped; remote session not cleared");
        }
        next
    }

    /// Resolves once every write queued before this call has been attempted.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.queue.send(SyncCommand::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

fn bootstrap_session(cards: Vec<Card>) -> RestoredSession {
    RestoredSession {
        cards,
        history: Vec::new(),
        position: 0,
        source: RestoreSource::Bootstrap,
    }
}

async fn run_writer(
    store: Arc<dyn SessionStore>,
    generation: Arc<AtomicU64>,
    mut rx: mpsc::UnboundedReceiver<SyncCommand>,
) {
    while let Some(command) = rx.recv().await {
        match command {
            SyncCommand::Persist {
                generation: issued,
                snapshot,
            } => {
                let current = generation.load(Ordering::Acquire);
                if issued != current {
                    debug!(
                        client_id = %snapshot.client_id,
                        issued,
                        current,
                        "sync: dropping snapshot from an earlier session generation"
                    );
                    continue;
                }
                match store.write(&snapshot).await {
                    Ok(()) => debug!(
                        client_id = %snapshot.client_id,
                        position = snapshot.position,
                        "sync: snapshot persisted"
                    ),
                    Err(err) => warn!(
                        client_id = %snapshot.client_id,
                        position = snapshot.position,
                        error = %err,
                        "sync: snapshot persist failed"
                    ),
                }
            }
            SyncCommand::Clear { client_id } => match store.delete(&client_id).await {
                Ok(()) => info!(%client_id, "sync: remote session cleared"),
                Err(err) => warn!(%client_id, error = %err, "sync: remote session clear failed"),
            },
            SyncCommand::Flush(done) => {
                let _ = done.send(());
            }
        }
    }
}

#[cfg(test)]
#[path = "tests/session_sync_tests.rs"]
mod tests;
