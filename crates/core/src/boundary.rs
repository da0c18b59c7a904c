use crate::types::{FinalizedResult, Player, RawObservation};

/// Screen capture and result-box reading.
///
/// Predicates are side-effect free and evaluate against the most recent
/// frame grabbed by [`Capture::refresh`], which the scraper calls once per
/// tick.
pub trait Capture: Send {
    /// Grab a fresh frame.
    fn refresh(&mut self) {}

    fn result_screen_visible(&self) -> bool;

    fn character_select_visible(&self) -> bool;

    /// Read every visible result box, in on-screen order.
    fn capture_observations(&mut self) -> Vec<RawObservation>;

    /// Release capture resources.
    fn teardown(&mut self) {}
}

/// Error raised when a storage backend cannot be opened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Disconnected,
    Io(String),
    Format(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Disconnected => write!(f, "storage is not connected"),
            StorageError::Io(msg) => write!(f, "storage i/o error: {}", msg),
            StorageError::Format(msg) => write!(f, "storage format error: {}", msg),
        }
    }
}

impl std::error::Error for StorageError {}

/// Durable store for accounts, players and finalized results.
///
/// Data operations never fail loudly: while disconnected, loads return
/// empty collections and writes return `false`. A `false` write means the
/// operation did not happen.
pub trait Storage: Send {
    fn connect(&mut self) -> Result<(), StorageError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn load_accounts(&self) -> Vec<String>;

    fn load_players(&self) -> Vec<Player>;

    fn add_account(&mut self, name: &str) -> bool;

    fn remove_account(&mut self, name: &str) -> bool;

    fn add_player(&mut self, player: &Player) -> bool;

    fn remove_player(&mut self, name: &str) -> bool;

    fn persist_result(&mut self, result: &FinalizedResult) -> bool;
}
