use score_core::{
    Color, Command, FinalizedResult, Legend, Player, RawObservation, RegistryEvent, Rejection,
    Score, Storage, StorageError,
};
use score_server::{
    BufferedSink, EventCursor, MatchKind, MemoryStorage, ScoreServer, Scraper, ScraperConfig,
    ScraperHandle, ScraperState, Screen, ScriptStep, ScriptedCapture,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::sleep;

/// Memory storage the test can inspect and make fail after the scraper owns it.
#[derive(Clone)]
struct SharedStorage {
    inner: Arc<Mutex<MemoryStorage>>,
    fail_writes: Arc<AtomicBool>,
}

impl SharedStorage {
    fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MemoryStorage::new(MatchKind::default()))),
            fail_writes: Arc::new(AtomicBool::new(false)),
        }
    }

    fn failing(&self) -> bool {
        self.fail_writes.load(Ordering::Relaxed)
    }

    fn match_count(&self) -> usize {
        self.inner.lock().unwrap().document().matches.len()
    }
}

impl Storage for SharedStorage {
    fn connect(&mut self) -> Result<(), StorageError> {
        self.inner.lock().unwrap().connect()
    }

    fn disconnect(&mut self) {
        self.inner.lock().unwrap().disconnect()
    }

    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().is_connected()
    }

    fn load_accounts(&self) -> Vec<String> {
        self.inner.lock().unwrap().load_accounts()
    }

    fn load_players(&self) -> Vec<Player> {
        self.inner.lock().unwrap().load_players()
    }

    fn add_account(&mut self, name: &str) -> bool {
        !self.failing() && self.inner.lock().unwrap().add_account(name)
    }

    fn remove_account(&mut self, name: &str) -> bool {
        !self.failing() && self.inner.lock().unwrap().remove_account(name)
    }

    fn add_player(&mut self, player: &Player) -> bool {
        !self.failing() && self.inner.lock().unwrap().add_player(player)
    }

    fn remove_player(&mut self, name: &str) -> bool {
        !self.failing() && self.inner.lock().unwrap().remove_player(name)
    }

    fn persist_result(&mut self, result: &FinalizedResult) -> bool {
        !self.failing() && self.inner.lock().unwrap().persist_result(result)
    }
}

fn player(name: &str) -> Player {
    Player::new(name, &name[..2], Color::new(200, 10, 10))
}

fn score(rank: u32) -> Score {
    Score::new(rank, [300 - 100 * rank as i64, 3, 1, 0, 420, 180])
}

fn fast_config() -> ScraperConfig {
    ScraperConfig {
        tick_interval_ms: 5,
        ..Default::default()
    }
}

/// Script: one gameplay frame, the result screen held for `hold` frames,
/// then character select.
fn one_round(observations: Vec<RawObservation>, hold: u32) -> ScriptedCapture {
    ScriptedCapture::new(vec![
        ScriptStep::new(Screen::Gameplay, 1),
        ScriptStep::new(Screen::Results { observations }, hold),
        ScriptStep::new(Screen::CharacterSelect, 1),
    ])
}

fn build(capture: ScriptedCapture) -> (ScraperHandle, SharedStorage, Arc<BufferedSink>) {
    let mut storage = SharedStorage::new();
    storage.connect().unwrap();
    let sink = Arc::new(BufferedSink::new(256));
    let scraper = Scraper::new(
        fast_config(),
        Box::new(storage.clone()),
        Box::new(capture),
        sink.clone(),
    );
    (ScraperHandle::new(scraper), storage, sink)
}

fn new_results(sink: &BufferedSink) -> Vec<FinalizedResult> {
    let (events, _) = sink.poll(EventCursor(0));
    events
        .into_iter()
        .filter_map(|e| match e.event {
            RegistryEvent::NewResult(result) => Some(result),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_round_is_finalized_and_announced() {
    let (handle, storage, sink) = build(one_round(
        vec![
            RawObservation::new("ORION", "acct1", score(1)),
            RawObservation::new("PETRA", "acct2", score(2)),
        ],
        2,
    ));
    handle.enqueue_all([
        Command::AddPlayer(player("Alice")),
        Command::AddPlayer(player("Bobby")),
    ]);

    // Tick 1 applies the queued players; the screen shows gameplay.
    let report = handle.step_one_tick().await;
    assert_eq!(report.commands_applied, 2);
    assert_eq!(report.state, ScraperState::AwaitingResult);

    handle.set_live_assignment("Alice", Legend::new("orion")).await.unwrap();
    handle.set_live_assignment("Bobby", Legend::new("PETRA")).await.unwrap();

    let report = handle.step_one_tick().await;
    assert_eq!(report.state, ScraperState::AwaitingAttribution);

    let report = handle.step_one_tick().await;
    assert_eq!(report.state, ScraperState::AwaitingNextRound);
    let finalization = report.finalized.expect("round should finalize");
    assert!(finalization.persisted);
    assert_eq!(finalization.result.entries[0].player.name, "Alice");
    assert_eq!(finalization.result.entries[1].player.name, "Bobby");

    // The announced result is exactly the extracted one.
    assert_eq!(new_results(&sink), vec![finalization.result]);
    assert_eq!(storage.match_count(), 1);

    let report = handle.step_one_tick().await;
    assert_eq!(report.state, ScraperState::AwaitingResult);
}

#[tokio::test]
async fn test_shared_legend_waits_for_manual_binding() {
    let (handle, _storage, sink) = build(one_round(
        vec![
            RawObservation::new("ORION", "acct1", score(1)),
            RawObservation::new("ORION", "acct2", score(2)),
        ],
        1,
    ));
    handle.enqueue_all([
        Command::AddPlayer(player("PlayerX")),
        Command::AddPlayer(player("PlayerY")),
        Command::AddAccount("acct1".into()),
        Command::AddAccount("acct2".into()),
    ]);
    handle.step_one_tick().await;

    handle.set_live_assignment("PlayerX", Legend::new("ORION")).await.unwrap();
    handle.set_live_assignment("PlayerY", Legend::new("ORION")).await.unwrap();
    handle.bind_account("PlayerY", "acct2").await.unwrap();

    assert_eq!(handle.step_one_tick().await.state, ScraperState::AwaitingAttribution);

    // Ready by count, but acct1 is unbound: no Nobody substitution.
    for _ in 0..3 {
        let report = handle.step_one_tick().await;
        assert_eq!(report.state, ScraperState::AwaitingAttribution);
        assert!(report.finalized.is_none());
    }
    assert_eq!(handle.snapshot().await.unbound_accounts, vec!["acct1".to_string()]);

    handle.bind_account("PlayerX", "acct1").await.unwrap();
    let report = handle.step_one_tick().await;
    let result = report.finalized.expect("binding completes the round").result;
    assert_eq!(result.entries[0].player.name, "PlayerX");
    assert_eq!(result.entries[0].score, score(1));
    assert_eq!(result.entries[1].player.name, "PlayerY");
    assert_eq!(result.entries[1].score, score(2));
    assert_eq!(new_results(&sink).len(), 1);
}

#[tokio::test]
async fn test_unheld_legend_resolves_once_assigned_after_capture() {
    let (handle, _storage, sink) = build(one_round(
        vec![
            RawObservation::new("ORION", "acct1", score(1)),
            RawObservation::new("PETRA", "acct2", score(2)),
        ],
        1,
    ));
    handle.enqueue_all([
        Command::AddPlayer(player("Alice")),
        Command::AddPlayer(player("Bobby")),
    ]);
    handle.step_one_tick().await;
    handle.set_live_assignment("Alice", Legend::new("ORION")).await.unwrap();

    assert_eq!(handle.step_one_tick().await.state, ScraperState::AwaitingAttribution);
    for _ in 0..2 {
        let report = handle.step_one_tick().await;
        assert_eq!(report.state, ScraperState::AwaitingAttribution);
        assert!(report.finalized.is_none());
    }

    handle.set_live_assignment("Bobby", Legend::new("PETRA")).await.unwrap();
    let report = handle.step_one_tick().await;
    assert_eq!(report.state, ScraperState::AwaitingNextRound);
    let result = report.finalized.expect("late assignment completes the round").result;
    assert_eq!(result.entries[0].player.name, "Alice");
    assert_eq!(result.entries[1].player.name, "Bobby");
    assert_eq!(new_results(&sink), vec![result]);
    assert!(handle.snapshot().await.unbound_accounts.is_empty());
}

#[tokio::test]
async fn test_pause_skips_transitions_but_drains_queue() {
    let (handle, _storage, _sink) = build(one_round(
        vec![RawObservation::new("ORION", "acct1", score(1))],
        1,
    ));

    assert!(handle.toggle_pause().await);
    handle.enqueue(Command::AddAccount("acct1".into()));

    for _ in 0..5 {
        let report = handle.step_one_tick().await;
        assert!(report.paused);
        assert_eq!(report.state, ScraperState::AwaitingResult);
    }
    assert_eq!(handle.accounts().await, vec!["acct1".to_string()]);
    assert_eq!(handle.pending_commands(), 0);

    assert!(!handle.toggle_pause().await);
    handle.step_one_tick().await;
    assert_eq!(handle.step_one_tick().await.state, ScraperState::AwaitingAttribution);
}

#[tokio::test]
async fn test_persistence_failure_still_advances_without_announcing() {
    let (handle, storage, sink) = build(one_round(
        vec![RawObservation::new("ORION", "acct1", score(1))],
        2,
    ));
    handle.enqueue(Command::AddPlayer(player("Alice")));
    handle.step_one_tick().await;
    handle.set_live_assignment("Alice", Legend::new("ORION")).await.unwrap();

    handle.step_one_tick().await;
    storage.fail_writes.store(true, Ordering::Relaxed);

    let report = handle.step_one_tick().await;
    assert_eq!(report.state, ScraperState::AwaitingNextRound);
    assert!(!report.finalized.expect("round extracted").persisted);
    assert!(new_results(&sink).is_empty());
    assert_eq!(storage.match_count(), 0);
}

#[tokio::test]
async fn test_storage_failure_leaves_registry_unchanged() {
    let (handle, storage, _sink) = build(ScriptedCapture::new(Vec::new()));
    storage.fail_writes.store(true, Ordering::Relaxed);

    handle.enqueue(Command::AddPlayer(player("Alice")));
    handle.enqueue(Command::AddAccount("acct1".into()));
    handle.step_one_tick().await;

    let snapshot = handle.snapshot().await;
    assert!(snapshot.players.is_empty());
    assert!(snapshot.accounts.is_empty());
}

#[tokio::test]
async fn test_queue_ignores_known_and_unknown_targets() {
    let (handle, _storage, _sink) = build(ScriptedCapture::new(Vec::new()));
    handle.enqueue_all([
        Command::AddPlayer(player("Alice")),
        Command::AddPlayer(Player::new("Alice", "XX", Color::new(0, 0, 0))),
        Command::RemovePlayer("Ghost".into()),
        Command::RemoveAccount("ghost-acct".into()),
    ]);
    handle.step_one_tick().await;

    let snapshot = handle.snapshot().await;
    assert_eq!(snapshot.players, vec![player("Alice")]);

    handle.enqueue(Command::RemovePlayer("Alice".into()));
    handle.step_one_tick().await;
    assert!(handle.snapshot().await.players.is_empty());
}

#[tokio::test]
async fn test_validation_codes_combine() {
    let (handle, _storage, _sink) = build(ScriptedCapture::new(Vec::new()));
    handle.enqueue(Command::AddPlayer(player("Alice")));
    handle.step_one_tick().await;

    let rejection = handle
        .set_live_assignment("Ghost", Legend::new("PIKACHU"))
        .await
        .unwrap_err();
    assert_eq!(rejection.bits(), 3);

    let rejection = handle.bind_account("Ghost", "nope").await.unwrap_err();
    assert_eq!(rejection, Rejection::PLAYER_UNKNOWN | Rejection::ACCOUNT_UNKNOWN);

    let control = handle.control().await;
    assert!(control
        .validate_set_live_assignment("Alice", &Legend::new("ORION"))
        .is_accepted());
    assert!(control.validate_remove_player("Alice"));
    assert!(!control.validate_remove_player("Ghost"));
}

#[tokio::test]
async fn test_remove_live_player_clears_assignment_and_bindings() {
    let (handle, _storage, _sink) = build(ScriptedCapture::new(Vec::new()));
    handle.enqueue_all([
        Command::AddPlayer(player("Alice")),
        Command::AddAccount("acct1".into()),
    ]);
    handle.step_one_tick().await;
    handle.set_live_assignment("Alice", Legend::new("ORION")).await.unwrap();
    handle.bind_account("Alice", "acct1").await.unwrap();

    assert!(handle.remove_live_player("Alice").await);
    let snapshot = handle.snapshot().await;
    assert!(snapshot.live_players.is_empty());
    assert!(snapshot.player_accounts.is_empty());
    assert_eq!(snapshot.players, vec![player("Alice")]);

    assert!(!handle.remove_live_player("Ghost").await);
}

#[tokio::test]
async fn test_abandon_round_waits_for_character_select() {
    let (handle, _storage, _sink) = build(one_round(
        vec![RawObservation::new("KOJI", "acct9", score(1))],
        1,
    ));
    handle.step_one_tick().await;
    assert_eq!(handle.step_one_tick().await.state, ScraperState::AwaitingAttribution);

    handle.abandon_round().await;
    assert_eq!(handle.state().await, ScraperState::AwaitingNextRound);

    assert_eq!(handle.step_one_tick().await.state, ScraperState::AwaitingResult);
}

#[tokio::test]
async fn test_account_aliases_apply_before_ingestion() {
    let (handle, _storage, _sink) = build(one_round(
        vec![RawObservation::new("ORION", "PlayerI", score(1))],
        1,
    ));
    handle.enqueue(Command::AddPlayer(player("Alice")));
    handle.step_one_tick().await;
    handle.set_live_assignment("Alice", Legend::new("ORION")).await.unwrap();
    handle.step_one_tick().await;

    let snapshot = handle.snapshot().await;
    assert_eq!(
        snapshot.player_accounts.get("Player1").map(String::as_str),
        Some("Alice")
    );
}

#[tokio::test]
async fn test_spawned_loop_seeds_runs_and_shuts_down() {
    let mut seeded = MemoryStorage::new(MatchKind::default());
    seeded.connect().unwrap();
    seeded.add_player(&player("Alice"));
    seeded.add_account("acct1");
    seeded.disconnect();

    let storage = SharedStorage {
        inner: Arc::new(Mutex::new(seeded)),
        fail_writes: Arc::new(AtomicBool::new(false)),
    };
    let sink = Arc::new(BufferedSink::new(64));
    let server = ScoreServer::start(
        fast_config(),
        Box::new(storage.clone()),
        Box::new(ScriptedCapture::new(Vec::new())),
        sink.clone(),
    )
    .unwrap();

    let snapshot = server.handle().snapshot().await;
    assert_eq!(snapshot.players, vec![player("Alice")]);
    assert_eq!(snapshot.accounts, vec!["acct1".to_string()]);

    server.handle().enqueue(Command::AddAccount("acct2".into()));
    sleep(Duration::from_millis(100)).await;
    assert_eq!(server.handle().accounts().await.len(), 2);

    server.shutdown().await;
    assert!(!storage.is_connected());
}
