use std::{sync::Arc, time::Duration};

use shared::{
    domain::{ClientId, SwipeDirection},
    protocol::{Answer, SessionSnapshot},
};
use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

pub mod bootstrap;
pub mod deck;
pub mod error;
pub mod gesture;
pub mod identity;
pub mod preferences;
pub mod render;
pub mod session_sync;
pub mod supply;
pub mod transition;
pub mod transport;

use bootstrap::{BootstrapProvider, StaticBootstrap};
use deck::{AdvanceOutcome, Deck, DeckAction, DeckPhase};
use gesture::{
    GestureOutcome, GestureSignal, GestureTracker, Offset, PointerEvent, COMMIT_THRESHOLD_PX,
};
use render::{DeckView, RenderInstruction};
use session_sync::{MissingSessionStore, RestoreSource, SessionStore, SessionSynchronizer};
use supply::{fetch_more, CardSource, MissingCardSource, RefillGuard, DEFAULT_REFILL_THRESHOLD};
use transition::{
    ExitAnimation, SpringBack, TransitionAnimator, DEFAULT_VIEWPORT_WIDTH, SETTLE_DURATION,
    SPRING_BACK_DURATION,
};

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineConfig {
    pub refill_threshold: usize,
    pub commit_threshold: f32,
    pub viewport_width: f32,
    pub settle: Duration,
    pub spring_back: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            refill_threshold: DEFAULT_REFILL_THRESHOLD,
            commit_threshold: COMMIT_THRESHOLD_PX,
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            settle: SETTLE_DURATION,
            spring_back: SPRING_BACK_DURATION,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DeckEvent {
    Loaded {
        source: RestoreSource,
        position: usize,
        cards: usize,
    },
    GestureMoved(Offset),
    ExitStarted(ExitAnimation),
    SpringBack(SpringBack),
    Advanced {
        outcome: AdvanceOutcome,
        position: usize,
    },
    CardsAppended {
        appended: usize,
        total: usize,
    },
    Completed {
        answered: usize,
    },
    Restarted,
}

/// Drives one deck: pointer input in, render instructions and events out.
///
/// Everything mutable lives behind one lock that is never held across a network
/// call. Background work (settle timers, refills, restores) is tagged with the
/// session generation it started in and dropped if a restart happened meanwhile.
pub struct SwipeDeck {
    config: EngineConfig,
    card_source: Arc<dyn CardSource>,
    bootstrap: Arc<dyn BootstrapProvider>,
    sync: SessionSynchronizer,
    inner: Mutex<DeckState>,
    events: broadcast::Sender<DeckEvent>,
}

struct DeckState {
    deck: Deck,
    gesture: GestureTracker,
    animator: TransitionAnimator,
    refill: RefillGuard,
    generation: u64,
    loaded: bool,
}

impl SwipeDeck {
    /// Offline deck: no generator, no remote session, default bootstrap cards.
    pub fn new(client_id: ClientId) -> Arc<Self> {
        Self::new_with_dependencies(
            EngineConfig::default(),
            client_id,
            Arc::new(MissingCardSource),
            Arc::new(MissingSessionStore),
            Arc::new(StaticBootstrap::default()),
        )
    }

    /// Must be called inside a tokio runtime; the session writer is spawned here.
    pub fn new_with_dependencies(
        config: EngineConfig,
        client_id: ClientId,
        card_source: Arc<dyn CardSource>,
        session_store: Arc<dyn SessionStore>,
        bootstrap: Arc<dyn BootstrapProvider>,
    ) -> Arc<Self> {
        let sync = SessionSynchronizer::spawn(session_store, client_id);
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let state = DeckState {
            deck: Deck::new(Vec::new()),
            gesture: GestureTracker::with_commit_threshold(config.commit_threshold),
            animator: TransitionAnimator::new(
                config.viewport_width,
                config.settle,
                config.spring_back,
            ),
            refill: RefillGuard::new(config.refill_threshold),
            generation: sync.generation(),
            loaded: false,
        };
        Arc::new(Self {
            config,
            card_source,
            bootstrap,
            sync,
            inner: Mutex::new(state),
            events,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn client_id(&self) -> &ClientId {
        self.sync.client_id()
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<DeckEvent> {
        self.events.subscribe()
    }

    /// Restores the remote session or seeds the bootstrap buffer.
    pub async fn load(self: &Arc<Self>) -> RestoreSource {
        let generation = self.inner.lock().await.generation;
        let restored = self.sync.restore(self.bootstrap.cards()).await;

        let mut state = self.inner.lock().await;
        if state.generation != generation {
            debug!(
                client_id = %self.client_id(),
                "deck: discarding restore from an earlier session generation"
            );
            return restored.source;
        }
        state.deck = Deck::restore(restored.cards, restored.history, restored.position);
        state.gesture.reset();
        state.animator.reset();
        state.refill.reset();
        state.loaded = true;
        info!(
            client_id = %self.client_id(),
            source = ?restored.source,
            position = state.deck.position(),
            cards = state.deck.cards().len(),
            "deck: loaded"
        );
        let _ = self.events.send(DeckEvent::Loaded {
            source: restored.source,
            position: state.deck.position(),
            cards: state.deck.cards().len(),
        });
        self.maybe_refill(&mut state);
        restored.source
    }

    pub async fn handle_pointer(self: &Arc<Self>, event: PointerEvent) -> GestureSignal {
        let mut state = self.inner.lock().await;
        if !state.loaded || !state.animator.is_interactive() {
            return GestureSignal::Ignored;
        }
        if matches!(event, PointerEvent::Down { .. }) {
            if !state.deck.accepts_input() {
                return GestureSignal::Ignored;
            }
            state.animator.settle_input();
        }

        let released_at = state.gesture.offset();
        let signal = state.gesture.handle(event);
        match signal {
            GestureSignal::Moved(offset) => {
                let _ = self.events.send(DeckEvent::GestureMoved(offset));
            }
            GestureSignal::Ended(GestureOutcome::Commit(direction)) => {
                self.start_exit(&mut state, direction, DeckAction::Swipe(direction));
            }
            GestureSignal::Ended(GestureOutcome::Cancel) => {
                let spring = state.animator.begin_spring_back(released_at);
                let _ = self.events.send(DeckEvent::SpringBack(spring));
            }
            GestureSignal::Started | GestureSignal::Ignored => {}
        }
        signal
    }

    /// Commits the top card in `direction` without a drag, as the accept and
    /// reject buttons do. Runs the same exit animation as a swipe. Returns false
    /// when input is blocked or there is nothing to decide.
    pub async fn decide(self: &Arc<Self>, direction: SwipeDirection) -> bool {
        let mut state = self.inner.lock().await;
        if !state.loaded
            || !state.animator.is_interactive()
            || state.gesture.is_active()
            || !state.deck.accepts_input()
        {
            return false;
        }
        state.animator.settle_input();
        debug!(client_id = %self.client_id(), ?direction, "deck: button decision");
        self.start_exit(&mut state, direction, DeckAction::Swipe(direction));
        true
    }

    /// Acknowledges the insight card on top. Returns false when there is none or
    /// input is blocked.
    pub async fn continue_insight(self: &Arc<Self>) -> bool {
        let mut state = self.inner.lock().await;
        let on_insight = state
            .deck
            .current_card()
            .is_some_and(|card| card.is_insight());
        if !state.loaded
            || !on_insight
            || !state.animator.is_interactive()
            || state.gesture.is_active()
        {
            return false;
        }
        self.start_exit(&mut state, SwipeDirection::Right, DeckAction::Continue);
        true
    }

    /// Starts a fresh session: clears the remote copy, reseeds the bootstrap buffer
    /// and shows the instruction card again.
    pub async fn restart(self: &Arc<Self>) {
        let mut state = self.inner.lock().await;
        let generation = self.sync.clear();
        state.generation = generation;
        state.deck.restart(self.bootstrap.cards());
        state.gesture.reset();
        state.animator.reset();
        state.refill.reset();
        state.loaded = true;
        self.sync
            .persist(generation, state.deck.snapshot(self.client_id()));
        info!(
            client_id = %self.client_id(),
            generation,
            cards = state.deck.cards().len(),
            "deck: session restarted"
        );
        let _ = self.events.send(DeckEvent::Restarted);
        self.maybe_refill(&mut state);
    }

    pub async fn render(&self) -> RenderInstruction {
        let state = self.inner.lock().await;
        let view = DeckView::of(&state.deck, state.loaded);
        render::render(&view, &state.gesture.state(), &state.animator.state())
    }

    pub async fn phase(&self) -> DeckPhase {
        self.inner.lock().await.deck.phase()
    }

    pub async fn position(&self) -> usize {
        self.inner.lock().await.deck.position()
    }

    pub async fn history(&self) -> Vec<Answer> {
        self.inner.lock().await.deck.history().to_vec()
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.deck.snapshot(self.client_id())
    }

    /// Waits until every queued session write has been attempted.
    pub async fn flush(&self) {
        self.sync.flush().await;
    }

    fn start_exit(self: &Arc<Self>, state: &mut DeckState, direction: SwipeDirection, action: DeckAction) {
        let exit = state.animator.begin_exit(direction, state.gesture.offset());
        let generation = state.generation;
        let _ = self.events.send(DeckEvent::ExitStarted(exit));

        let deck = Arc::clone(self);
        tokio::spawn(async move {
            tokio::time::sleep(exit.duration).await;
            deck.finish_exit(exit.ticket, action, generation).await;
        });
    }

    async fn finish_exit(self: &Arc<Self>, ticket: u64, action: DeckAction, generation: u64) {
        let mut state = self.inner.lock().await;
        if state.generation != generation || !state.animator.finish_exit(ticket) {
            debug!(ticket, "deck: dropping stale settle");
            return;
        }
        state.gesture.reset();

        let outcome = state.deck.apply(action);
        let position = state.deck.position();
        if outcome.moved_position() {
            self.sync
                .persist(generation, state.deck.snapshot(self.client_id()));
        }
        debug!(
            client_id = %self.client_id(),
            position,
            answered = state.deck.answered(),
            outcome = ?outcome,
            "deck: advanced"
        );
        let _ = self.events.send(DeckEvent::Advanced { outcome, position });
        if state.deck.is_completed() {
            info!(
                client_id = %self.client_id(),
                answered = state.deck.answered(),
                "deck: session completed"
            );
            let _ = self.events.send(DeckEvent::Completed {
                answered: state.deck.answered(),
            });
        }
        self.maybe_refill(&mut state);
    }

    fn maybe_refill(self: &Arc<Self>, state: &mut DeckState) {
        let cards_len = state.deck.cards().len();
        let position = state.deck.position();
        if !state.loaded || !state.refill.try_begin(cards_len, position) {
            return;
        }

        let history = state.deck.history().to_vec();
        let generation = state.generation;
        let deck = Arc::clone(self);
        tokio::spawn(async move {
            let cards = fetch_more(deck.card_source.as_ref(), history, cards_len).await;

            let mut state = deck.inner.lock().await;
            if state.generation != generation {
                debug!(
                    client_id = %deck.client_id(),
                    "deck: discarding cards from an earlier session generation"
                );
                return;
            }
            state.refill.complete();
            if !cards.is_empty() {
                let appended = state.deck.append_cards(cards);
                let total = state.deck.cards().len();
                deck.sync
                    .persist(generation, state.deck.snapshot(deck.client_id()));
                let _ = deck
                    .events
                    .send(DeckEvent::CardsAppended { appended, total });
            }
            deck.maybe_refill(&mut state);
        });
    }
}

#[cfg(test)]
#[path = "tests/support.rs"]
mod test_support;

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
