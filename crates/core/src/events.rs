use crate::legend::Legend;
use crate::types::{FinalizedResult, Player};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

/// A state-change notification, carrying the state it announces.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "snake_case")]
pub enum RegistryEvent {
    /// Sorted known accounts.
    AccountsUpdated(Vec<String>),
    /// Known players, sorted by name.
    PlayersUpdated(Vec<Player>),
    /// Account -> player name.
    PlayerAccountsUpdated(BTreeMap<String, String>),
    /// Player name -> legend.
    LivePlayersUpdated(BTreeMap<String, Legend>),
    NewResult(FinalizedResult),
}

impl RegistryEvent {
    pub fn name(&self) -> &'static str {
        match self {
            RegistryEvent::AccountsUpdated(_) => "accounts_updated",
            RegistryEvent::PlayersUpdated(_) => "players_updated",
            RegistryEvent::PlayerAccountsUpdated(_) => "player_accounts_updated",
            RegistryEvent::LivePlayersUpdated(_) => "live_players_updated",
            RegistryEvent::NewResult(_) => "new_result",
        }
    }
}

/// Receives notifications synchronously on the scraper's context.
/// Implementations must not block.
pub trait EventSink: Send + Sync {
    fn notify(&self, event: &RegistryEvent);
}

/// Discards every notification.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn notify(&self, _event: &RegistryEvent) {}
}

/// Forwards each notification to every inner sink, in order.
#[derive(Clone, Default)]
pub struct FanoutSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for FanoutSink {
    fn notify(&self, event: &RegistryEvent) {
        for sink in &self.sinks {
            sink.notify(event);
        }
    }
}
