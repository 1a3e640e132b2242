use super::*;
use crate::test_support::{questions, MemorySessionStore};
use shared::protocol::Answer;

fn client() -> ClientId {
    ClientId::parse("client-1").expect("client id")
}

fn snapshot(position: usize) -> SessionSnapshot {
    SessionSnapshot {
        client_id: client(),
        history: vec![Answer::new("question 0", true); position],
        position,
        cards: questions(0..10),
    }
}

#[tokio::test]
async fn restore_adopts_a_remote_session_with_cards() {
    let store = Arc::new(MemorySessionStore::with_session(snapshot(7)));
    let sync = SessionSynchronizer::spawn(store, client());

    let restored = sync.restore(questions(100..105)).await;
    assert_eq!(restored.source, RestoreSource::Remote);
    assert_eq!(restored.position, 7);
    assert_eq!(restored.cards.len(), 10);
    assert_eq!(restored.history.len(), 7);
}

#[tokio::test]
async fn restore_seeds_bootstrap_when_remote_buffer_is_empty() {
    let mut empty = snapshot(3);
    empty.cards.clear();
    let store = Arc::new(MemorySessionStore::with_session(empty));
    let sync = SessionSynchronizer::spawn(store, client());

    let restored = sync.restore(questions(100..105)).await;
    assert_eq!(restored.source, RestoreSource::Bootstrap);
    assert_eq!(restored.position, 0);
    assert!(restored.history.is_empty());
    assert_eq!(restored.cards[0].id.0, 100);
}

#[tokio::test]
async fn restore_treats_read_failure_as_no_session() {
    let store = Arc::new(MemorySessionStore::failing("connection refused"));
    let sync = SessionSynchronizer::spawn(store, client());

    let restored = sync.restore(questions(0..5)).await;
    assert_eq!(restored.source, RestoreSource::Bootstrap);
    assert_eq!(restored.cards.len(), 5);
}

#[tokio::test]
async fn persists_land_in_issue_order() {
    let store = Arc::new(MemorySessionStore::default());
    let writes = store.writes.clone();
    let sync = SessionSynchronizer::spawn(store, client());

    for position in 1..=3 {
        sync.persist(sync.generation(), snapshot(position));
    }
    sync.flush().await;

    let positions: Vec<usize> = writes.lock().await.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![1, 2, 3]);
}

#[tokio::test]
async fn clear_discards_writes_from_the_previous_generation() {
    let store = Arc::new(MemorySessionStore::default());
    let writes = store.writes.clone();
    let deletes = store.deletes.clone();
    let sync = SessionSynchronizer::spawn(store, client());

    let before = sync.generation();
    sync.persist(before, snapshot(4));
    let after = sync.clear();
    assert_eq!(after, before + 1);
    sync.persist(before, snapshot(5));
    sync.persist(after, snapshot(0));
    sync.flush().await;

    let positions: Vec<usize> = writes.lock().await.iter().map(|s| s.position).collect();
    assert_eq!(positions, vec![0]);
    assert_eq!(deletes.lock().await.as_slice(), &[client()]);
}

#[tokio::test]
async fn persist_failures_are_swallowed() {
    let store = Arc::new(MemorySessionStore::failing("503"));
    let sync = SessionSynchronizer::spawn(store, client());

    sync.persist(sync.generation(), snapshot(1));
    sync.clear();
    sync.flush().await;
}
