use crate::types::MatchKind;
use score_core::{Color, FinalizedResult, Player, Score, Storage, StorageError};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPlayer {
    pub name: String,
    pub initials: String,
    /// `0xRRGGBB`.
    pub color: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub player_name: String,
    pub legend: String,
    pub team: u8,
    pub score: Score,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredMatch {
    pub id: u64,
    pub mode: String,
    pub game_mode: String,
    pub teams: bool,
    pub player_count: usize,
    pub entries: Vec<StoredEntry>,
}

/// Everything a storage backend keeps.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageDocument {
    #[serde(default)]
    pub accounts: BTreeSet<String>,
    #[serde(default)]
    pub players: BTreeMap<String, StoredPlayer>,
    #[serde(default)]
    pub matches: Vec<StoredMatch>,
}

impl StorageDocument {
    fn add_account(&mut self, name: &str) -> bool {
        !name.is_empty() && self.accounts.insert(name.to_string())
    }

    fn remove_account(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.accounts.remove(name);
        true
    }

    fn add_player(&mut self, player: &Player) -> bool {
        if player.name.is_empty() || self.players.contains_key(&player.name) {
            return false;
        }
        self.players.insert(
            player.name.clone(),
            StoredPlayer {
                name: player.name.clone(),
                initials: player.initials.clone(),
                color: player.color.to_int(),
            },
        );
        true
    }

    fn remove_player(&mut self, name: &str) -> bool {
        if name.is_empty() {
            return false;
        }
        self.players.remove(name);
        true
    }

    fn add_match(&mut self, kind: &MatchKind, result: &FinalizedResult) -> bool {
        if result.is_empty() {
            return false;
        }
        let id = self.matches.last().map(|m| m.id + 1).unwrap_or(0);
        self.matches.push(StoredMatch {
            id,
            mode: kind.mode.clone(),
            game_mode: kind.game_mode.clone(),
            teams: kind.teams,
            player_count: result.len(),
            entries: result
                .iter()
                .map(|entry| StoredEntry {
                    player_name: entry.player.name.clone(),
                    legend: entry.legend.to_string(),
                    team: 0,
                    score: entry.score,
                })
                .collect(),
        });
        true
    }

    fn players(&self) -> Vec<Player> {
        self.players
            .values()
            .map(|p| Player::new(&p.name, &p.initials, Color::from_int(p.color)))
            .collect()
    }
}

/// Storage kept in process memory; contents survive reconnects.
pub struct MemoryStorage {
    kind: MatchKind,
    document: StorageDocument,
    connected: bool,
}

impl MemoryStorage {
    pub fn new(kind: MatchKind) -> Self {
        Self::with_document(kind, StorageDocument::default())
    }

    pub fn with_document(kind: MatchKind, document: StorageDocument) -> Self {
        Self {
            kind,
            document,
            connected: false,
        }
    }

    pub fn document(&self) -> &StorageDocument {
        &self.document
    }

    fn connected_mut(&mut self) -> Option<&mut StorageDocument> {
        self.connected.then_some(&mut self.document)
    }
}

impl Storage for MemoryStorage {
    fn connect(&mut self) -> Result<(), StorageError> {
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn load_accounts(&self) -> Vec<String> {
        if !self.connected {
            return Vec::new();
        }
        self.document.accounts.iter().cloned().collect()
    }

    fn load_players(&self) -> Vec<Player> {
        if !self.connected {
            return Vec::new();
        }
        self.document.players()
    }

    fn add_account(&mut self, name: &str) -> bool {
        self.connected_mut().is_some_and(|doc| doc.add_account(name))
    }

    fn remove_account(&mut self, name: &str) -> bool {
        self.connected_mut().is_some_and(|doc| doc.remove_account(name))
    }

    fn add_player(&mut self, player: &Player) -> bool {
        self.connected_mut().is_some_and(|doc| doc.add_player(player))
    }

    fn remove_player(&mut self, name: &str) -> bool {
        self.connected_mut().is_some_and(|doc| doc.remove_player(name))
    }

    fn persist_result(&mut self, result: &FinalizedResult) -> bool {
        let kind = self.kind.clone();
        self.connected_mut()
            .is_some_and(|doc| doc.add_match(&kind, result))
    }
}

/// Storage backed by a single JSON document on disk.
///
/// Every mutation is written before it becomes visible; a failed write
/// leaves the in-memory state unchanged.
pub struct JsonFileStorage {
    path: PathBuf,
    kind: MatchKind,
    document: Option<StorageDocument>,
}

impl JsonFileStorage {
    pub fn new(path: impl Into<PathBuf>, kind: MatchKind) -> Self {
        Self {
            path: path.into(),
            kind,
            document: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn commit(&mut self, apply: impl FnOnce(&mut StorageDocument) -> bool) -> bool {
        let Some(current) = &self.document else {
            return false;
        };
        let mut next = current.clone();
        if !apply(&mut next) {
            return false;
        }
        match write_document(&self.path, &next) {
            Ok(()) => {
                self.document = Some(next);
                true
            }
            Err(error) => {
                tracing::error!("Failed to write storage file: {error}");
                false
            }
        }
    }
}

impl Storage for JsonFileStorage {
    fn connect(&mut self) -> Result<(), StorageError> {
        let document = match std::fs::read_to_string(&self.path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|e| {
                StorageError::Format(format!("{}: {}", self.path.display(), e))
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                let document = StorageDocument::default();
                write_document(&self.path, &document)?;
                document
            }
            Err(e) => return Err(StorageError::Io(format!("{}: {}", self.path.display(), e))),
        };
        tracing::info!(path = %self.path.display(), "storage connected");
        self.document = Some(document);
        Ok(())
    }

    fn disconnect(&mut self) {
        if self.document.take().is_some() {
            tracing::info!(path = %self.path.display(), "storage disconnected");
        }
    }

    fn is_connected(&self) -> bool {
        self.document.is_some()
    }

    fn load_accounts(&self) -> Vec<String> {
        self.document
            .as_ref()
            .map(|doc| doc.accounts.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn load_players(&self) -> Vec<Player> {
        self.document
            .as_ref()
            .map(StorageDocument::players)
            .unwrap_or_default()
    }

    fn add_account(&mut self, name: &str) -> bool {
        self.commit(|doc| doc.add_account(name))
    }

    fn remove_account(&mut self, name: &str) -> bool {
        self.commit(|doc| doc.remove_account(name))
    }

    fn add_player(&mut self, player: &Player) -> bool {
        self.commit(|doc| doc.add_player(player))
    }

    fn remove_player(&mut self, name: &str) -> bool {
        self.commit(|doc| doc.remove_player(name))
    }

    fn persist_result(&mut self, result: &FinalizedResult) -> bool {
        let kind = self.kind.clone();
        self.commit(|doc| doc.add_match(&kind, result))
    }
}

/// Write through a temporary file so a crash never leaves a truncated document.
fn write_document(path: &Path, document: &StorageDocument) -> Result<(), StorageError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .map_err(|e| StorageError::Io(format!("{}: {}", parent.display(), e)))?;
    }

    let serialized = serde_json::to_string_pretty(document)
        .map_err(|e| StorageError::Format(e.to_string()))?;

    let mut temp_path = path.as_os_str().to_owned();
    temp_path.push(".tmp");
    let temp_path = PathBuf::from(temp_path);

    std::fs::write(&temp_path, serialized)
        .map_err(|e| StorageError::Io(format!("{}: {}", temp_path.display(), e)))?;

    if let Err(error) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(StorageError::Io(format!("{}: {}", path.display(), error)));
    }
    Ok(())
}
