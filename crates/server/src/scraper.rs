use crate::types::{RegistrySnapshot, ScraperConfig, ScraperState};
use score_core::{
    Capture, Command, EventSink, FinalizedResult, Legend, RawObservation, RegistryEvent,
    Rejection, Storage,
};
use score_registry::{ExtractError, IdentityRegistry};
use std::sync::Arc;

/// A round finalized during a tick.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Finalization {
    pub result: FinalizedResult,
    /// Whether storage accepted the result. Only persisted results are
    /// announced to the event sink.
    pub persisted: bool,
}

/// What a single tick did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TickReport {
    pub state: ScraperState,
    pub paused: bool,
    pub commands_applied: usize,
    pub finalized: Option<Finalization>,
}

/// The match state machine. Owns the registry and the storage and capture
/// collaborators; every mutation runs on whoever holds it.
pub struct Scraper {
    config: ScraperConfig,
    registry: IdentityRegistry,
    storage: Box<dyn Storage>,
    capture: Box<dyn Capture>,
    sink: Arc<dyn EventSink>,
    state: ScraperState,
    paused: bool,
    ticks: u64,
    last_extract_error: Option<ExtractError>,
}

impl Scraper {
    pub fn new(
        config: ScraperConfig,
        storage: Box<dyn Storage>,
        capture: Box<dyn Capture>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            config,
            registry: IdentityRegistry::new(sink.clone()),
            storage,
            capture,
            sink,
            state: ScraperState::AwaitingResult,
            paused: false,
            ticks: 0,
            last_extract_error: None,
        }
    }

    /// Load known accounts and players from storage into the registry.
    pub fn seed_from_storage(&mut self) {
        let accounts = self.storage.load_accounts();
        let players = self.storage.load_players();
        tracing::info!(
            accounts = accounts.len(),
            players = players.len(),
            "seeding registry from storage"
        );
        for account in accounts {
            self.registry.add_account(&account);
        }
        for player in players {
            self.registry.add_player(player);
        }
    }

    pub fn state(&self) -> ScraperState {
        self.state
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn registry(&self) -> &IdentityRegistry {
        &self.registry
    }

    pub fn config(&self) -> &ScraperConfig {
        &self.config
    }

    /// Flip the pause flag and return the new value.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        tracing::info!(paused = self.paused, "pause toggled");
        self.paused
    }

    /// Drop the current round and wait for the next one.
    pub fn abandon_round(&mut self) {
        tracing::info!(state = ?self.state, "round abandoned");
        self.registry.clear_observations();
        self.last_extract_error = None;
        self.state = ScraperState::AwaitingNextRound;
    }

    /// Run one tick: apply `commands`, then advance the state machine unless
    /// paused.
    pub fn tick(&mut self, commands: Vec<Command>) -> TickReport {
        self.ticks += 1;

        let commands_applied = commands.len();
        for command in commands {
            self.apply_command(command);
        }

        let finalized = if self.paused {
            None
        } else {
            self.capture.refresh();
            self.advance()
        };

        TickReport {
            state: self.state,
            paused: self.paused,
            commands_applied,
            finalized,
        }
    }

    /// Apply a queued identity mutation. Storage goes first; the registry
    /// only changes when storage accepted the write.
    pub fn apply_command(&mut self, command: Command) {
        let applied = match &command {
            Command::AddAccount(name) => {
                if self.registry.has_account(name) {
                    tracing::debug!(%command, "ignored: account already known");
                    return;
                }
                self.storage.add_account(name) && self.registry.add_account(name)
            }
            Command::RemoveAccount(name) => {
                if !self.registry.has_account(name) {
                    tracing::debug!(%command, "ignored: account unknown");
                    return;
                }
                self.storage.remove_account(name) && self.registry.remove_account(name)
            }
            Command::AddPlayer(player) => {
                if self.registry.has_player(&player.name) {
                    tracing::debug!(%command, "ignored: player already known");
                    return;
                }
                self.storage.add_player(player) && self.registry.add_player(player.clone())
            }
            Command::RemovePlayer(name) => {
                if !self.registry.has_player(name) {
                    tracing::debug!(%command, "ignored: player unknown");
                    return;
                }
                self.storage.remove_player(name) && self.registry.remove_player(name)
            }
        };

        if applied {
            tracing::info!(%command, "command applied");
        } else {
            tracing::warn!(%command, "storage rejected command");
        }
    }

    fn advance(&mut self) -> Option<Finalization> {
        match self.state {
            ScraperState::AwaitingResult => {
                if self.capture.result_screen_visible() {
                    let raw = self.capture.capture_observations();
                    let batch = self.resolve_aliases(raw);
                    tracing::info!(observations = batch.len(), "result screen captured");
                    self.registry.ingest_observations(batch);
                    self.last_extract_error = None;
                    self.state = ScraperState::AwaitingAttribution;
                }
                None
            }
            ScraperState::AwaitingAttribution => {
                if !self.registry.is_ready() {
                    return None;
                }
                // Live assignments may have changed since capture.
                self.registry.infer_bindings();
                match self.registry.extract_results() {
                    Ok(result) => {
                        let finalization = self.finalize(result);
                        self.state = ScraperState::AwaitingNextRound;
                        Some(finalization)
                    }
                    Err(error) => {
                        // Report each distinct problem once, then keep waiting for bindings.
                        if self.last_extract_error.as_ref() != Some(&error) {
                            tracing::warn!(
                                %error,
                                unbound = ?self.registry.unbound_accounts(),
                                "round cannot be attributed yet"
                            );
                            self.last_extract_error = Some(error);
                        }
                        None
                    }
                }
            }
            ScraperState::AwaitingNextRound => {
                if self.capture.character_select_visible() {
                    tracing::info!("character select reached, awaiting next result");
                    self.state = ScraperState::AwaitingResult;
                }
                None
            }
        }
    }

    fn finalize(&mut self, result: FinalizedResult) -> Finalization {
        self.last_extract_error = None;
        let persisted = self.storage.persist_result(&result);
        if persisted {
            tracing::info!(entries = result.len(), "round finalized");
            self.sink.notify(&RegistryEvent::NewResult(result.clone()));
        } else {
            tracing::warn!(entries = result.len(), "storage did not persist round result");
        }
        Finalization { result, persisted }
    }

    fn resolve_aliases(&self, batch: Vec<RawObservation>) -> Vec<RawObservation> {
        batch
            .into_iter()
            .map(|mut observation| {
                if let Some(canonical) = self.config.account_aliases.get(&observation.account) {
                    observation.account = canonical.clone();
                }
                observation
            })
            .collect()
    }

    // ---------------------------------------------------------------------
    // Synchronous control surface
    // ---------------------------------------------------------------------

    pub fn validate_set_live_assignment(&self, player: &str, legend: &Legend) -> Rejection {
        Rejection::when(!self.registry.has_player(player), Rejection::PLAYER_UNKNOWN)
            | Rejection::when(!legend.is_known(), Rejection::LEGEND_UNKNOWN)
    }

    pub fn set_live_assignment(&mut self, player: &str, legend: Legend) -> bool {
        self.registry.set_live_assignment(player, legend)
    }

    /// An empty account is accepted: binding it unbinds the player.
    pub fn validate_bind_account(&self, player: &str, account: &str) -> Rejection {
        Rejection::when(!self.registry.has_player(player), Rejection::PLAYER_UNKNOWN)
            | Rejection::when(
                !account.is_empty() && !self.registry.has_account(account),
                Rejection::ACCOUNT_UNKNOWN,
            )
    }

    pub fn bind_account(&mut self, player: &str, account: &str) -> bool {
        self.registry.bind_account(player, account)
    }

    pub fn validate_remove_player(&self, name: &str) -> bool {
        self.registry.has_player(name)
    }

    /// Withdraw a player from the live match: clears the legend and unbinds
    /// its accounts. The player itself stays known.
    pub fn remove_player(&mut self, name: &str) -> bool {
        self.registry.set_live_assignment(name, Legend::none())
    }

    pub fn snapshot(&self) -> RegistrySnapshot {
        RegistrySnapshot {
            state: self.state,
            paused: self.paused,
            accounts: self.registry.accounts(),
            players: self.registry.players().cloned().collect(),
            live_players: self.registry.live_assignments().clone(),
            player_accounts: self.registry.bindings().clone(),
            unbound_accounts: self.registry.unbound_accounts(),
        }
    }

    /// Release storage and capture resources.
    pub fn close(&mut self) {
        self.storage.disconnect();
        self.capture.teardown();
        tracing::info!(ticks = self.ticks, "scraper closed");
    }
}
