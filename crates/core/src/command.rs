use crate::types::Player;
use std::fmt;

/// A pending identity mutation, applied by the scraper when the mutation
/// queue is drained.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    AddAccount(String),
    RemoveAccount(String),
    AddPlayer(Player),
    RemovePlayer(String),
}

impl Command {
    pub const ADD_ACCOUNT: &'static str = "add_account";
    pub const REMOVE_ACCOUNT: &'static str = "remove_account";
    pub const ADD_PLAYER: &'static str = "add_player";
    pub const REMOVE_PLAYER: &'static str = "remove_player";

    /// Out-of-queue toggle; never enqueued.
    pub const PAUSE: &'static str = "pause";

    pub fn tag(&self) -> &'static str {
        match self {
            Command::AddAccount(_) => Self::ADD_ACCOUNT,
            Command::RemoveAccount(_) => Self::REMOVE_ACCOUNT,
            Command::AddPlayer(_) => Self::ADD_PLAYER,
            Command::RemovePlayer(_) => Self::REMOVE_PLAYER,
        }
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::AddAccount(name) | Command::RemoveAccount(name) | Command::RemovePlayer(name) => {
                write!(f, "{} {}", self.tag(), name)
            }
            Command::AddPlayer(player) => write!(f, "{} {}", self.tag(), player.name),
        }
    }
}
