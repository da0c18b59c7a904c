use score_core::Legend;
use std::fmt;

/// Error when a round's observations cannot be attributed to players.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtractError {
    /// The count gate does not hold for the current batch.
    NotReady,
    /// An observed account has no player binding.
    UnboundAccount { legend: Legend, account: String },
    /// No account was recorded at this position of the legend's list,
    /// e.g. two result boxes were read as the same account.
    UnaccountedObservation { legend: Legend, position: usize },
    /// The account is bound to a player the registry no longer knows.
    UnknownPlayer { account: String, player: String },
}

impl fmt::Display for ExtractError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExtractError::NotReady => write!(f, "round is not ready for attribution"),
            ExtractError::UnboundAccount { legend, account } => {
                write!(f, "account `{}` playing {} is not bound to a player", account, legend)
            }
            ExtractError::UnaccountedObservation { legend, position } => {
                write!(f, "no account recorded for {} observation #{}", legend, position)
            }
            ExtractError::UnknownPlayer { account, player } => {
                write!(f, "account `{}` is bound to unknown player `{}`", account, player)
            }
        }
    }
}

impl std::error::Error for ExtractError {}
