use super::*;
use deck_core::{
    deck::DeckPhase,
    preferences::{FilePreferenceStore, Preferences, PreferenceStore},
};
use shared::domain::{ClientId, SwipeDirection};

async fn offline_runner(dir: &tempfile::TempDir) -> Runner {
    let deck = SwipeDeck::new(ClientId::parse("cli-test").expect("client id"));
    deck.load().await;
    let store = FilePreferenceStore::new(dir.path().join("prefs.json"));
    Runner::new(deck, AppSettings::load(Box::new(store)))
}

#[tokio::test(start_paused = true)]
async fn scripted_swipes_complete_the_offline_deck() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = offline_runner(&dir).await;
    assert!(runner.show().await.contains("Swipe to begin"));

    let script = [
        Command::Swipe(SwipeDirection::Right),
        Command::Swipe(SwipeDirection::Right),
        Command::Swipe(SwipeDirection::Left),
        Command::Swipe(SwipeDirection::Right),
    ];
    for command in script {
        assert_eq!(runner.execute(command).await.expect("execute"), Flow::Continue);
    }
    assert!(runner.show().await.starts_with("[light] [4/5]"));

    for _ in 0..3 {
        runner
            .execute(Command::Swipe(SwipeDirection::Left))
            .await
            .expect("execute");
    }
    assert_eq!(runner.deck.phase().await, DeckPhase::Completed);
    assert_eq!(
        runner.show().await,
        "[light] session complete: 5 answers recorded"
    );

    let answers: Vec<bool> = runner
        .deck
        .history()
        .await
        .iter()
        .map(|answer| answer.decision)
        .collect();
    assert_eq!(answers, vec![true, false, true, false, false]);
}

#[tokio::test(start_paused = true)]
async fn continue_without_an_insight_changes_nothing() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = offline_runner(&dir).await;
    runner
        .execute(Command::Swipe(SwipeDirection::Right))
        .await
        .expect("leave instruction");
    let before = runner.deck.position().await;
    runner.execute(Command::Continue).await.expect("execute");
    assert_eq!(runner.deck.position().await, before);
}

#[tokio::test(start_paused = true)]
async fn restart_returns_to_the_instruction_card() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = offline_runner(&dir).await;
    for _ in 0..3 {
        runner
            .execute(Command::Swipe(SwipeDirection::Right))
            .await
            .expect("execute");
    }
    runner.execute(Command::Restart).await.expect("restart");
    assert_eq!(runner.deck.phase().await, DeckPhase::Instruction);
    assert!(runner.deck.history().await.is_empty());
}

#[tokio::test]
async fn dark_toggle_is_persisted_and_quit_stops() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = offline_runner(&dir).await;
    runner.execute(Command::ToggleDark).await.expect("toggle");
    assert!(runner.show().await.starts_with("[dark]"));

    let stored = FilePreferenceStore::new(dir.path().join("prefs.json"))
        .load()
        .expect("read prefs");
    assert_eq!(stored, Some(Preferences { dark_mode: true }));

    assert_eq!(runner.execute(Command::Quit).await.expect("quit"), Flow::Quit);
}

#[tokio::test(start_paused = true)]
async fn button_commands_answer_without_dragging() {
    let dir = tempfile::tempdir().expect("tempdir");
    let runner = offline_runner(&dir).await;
    for command in [
        Command::Decide(SwipeDirection::Right),
        Command::Decide(SwipeDirection::Left),
        Command::Decide(SwipeDirection::Right),
    ] {
        runner.execute(command).await.expect("execute");
    }
    let answers: Vec<bool> = runner
        .deck
        .history()
        .await
        .iter()
        .map(|answer| answer.decision)
        .collect();
    assert_eq!(answers, vec![false, true]);
    assert!(runner.show().await.starts_with("[light] [3/5]"));
}
