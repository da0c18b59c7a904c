use crate::errors::ConfigError;
use score_core::{Legend, Player};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Lifecycle state of the match state machine.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScraperState {
    /// Waiting for the result screen of the current round.
    AwaitingResult,
    /// Observations captured; waiting until they can be attributed.
    AwaitingAttribution,
    /// Round finalized; waiting for character select.
    AwaitingNextRound,
}

/// Tracks position in an event stream for cursor-based retrieval.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EventCursor(pub u64);

/// A buffered notification with sequence number for cursor tracking.
#[derive(Clone, Debug, Serialize)]
pub struct ServerEvent<E> {
    pub sequence: u64,
    pub timestamp_ms: u64,
    pub event: E,
}

/// Describes the kind of match results are stored under.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchKind {
    pub mode: String,
    pub game_mode: String,
    pub teams: bool,
}

impl Default for MatchKind {
    fn default() -> Self {
        Self {
            mode: "couch".to_string(),
            game_mode: "stock".to_string(),
            teams: false,
        }
    }
}

/// Configuration for the scraper.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    /// Polling interval of the state machine.
    pub tick_interval_ms: u64,
    pub match_kind: MatchKind,
    /// Capacity of the buffered event sink.
    pub event_buffer_capacity: usize,
    /// Misread account name -> canonical account name.
    pub account_aliases: BTreeMap<String, String>,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 250,
            match_kind: MatchKind::default(),
            event_buffer_capacity: 1024,
            account_aliases: BTreeMap::from([("PlayerI".to_string(), "Player1".to_string())]),
        }
    }
}

impl ScraperConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read(format!("{}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| ConfigError::Parse(format!("{}: {}", path.display(), e)))
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms.max(1))
    }
}

/// Point-in-time view of the registry and state machine for control surfaces.
#[derive(Clone, Debug, Serialize)]
pub struct RegistrySnapshot {
    pub state: ScraperState,
    pub paused: bool,
    pub accounts: Vec<String>,
    pub players: Vec<Player>,
    pub live_players: BTreeMap<String, Legend>,
    pub player_accounts: BTreeMap<String, String>,
    /// Observed accounts of the current round that have no binding.
    pub unbound_accounts: Vec<String>,
}
