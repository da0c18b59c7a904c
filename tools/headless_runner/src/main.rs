//! Runs the scraper against a scripted session without timers or HTTP and
//! prints every finalized round as a JSON line.

use clap::Parser;
use score_core::{FinalizedResult, Legend, NullSink, Player, Storage};
use score_server::{
    MemoryStorage, RegistrySnapshot, ScraperConfig, ScraperHandle, ScriptStep, ScriptedCapture,
    Scraper,
};
use serde::Deserialize;
use std::{collections::BTreeMap, path::PathBuf, sync::Arc};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "headless-runner")]
#[command(about = "Replay a scripted session through the scraper")]
struct Args {
    /// Session file: seed identities plus the screen script
    session: PathBuf,

    /// Scraper configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Extra ticks to run after the script is exhausted
    #[arg(long, default_value = "2")]
    extra_ticks: u64,
}

/// Identities to seed before replay, and the screens to replay.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Session {
    /// `name,initials,r|g|b`
    players: Vec<String>,
    accounts: Vec<String>,
    /// player -> legend
    live: BTreeMap<String, String>,
    /// player -> account
    bindings: BTreeMap<String, String>,
    script: Vec<ScriptStep>,
}

impl Session {
    fn total_frames(&self) -> u64 {
        self.script.iter().map(|s| u64::from(s.hold_ticks.max(1))).sum()
    }
}

struct Replay {
    ticks: u64,
    results: Vec<FinalizedResult>,
    snapshot: RegistrySnapshot,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ScraperConfig::load(path)?,
        None => ScraperConfig::default(),
    };
    let raw = std::fs::read_to_string(&args.session)?;
    let session: Session = serde_json::from_str(&raw)?;

    let replay = replay(session, config, args.extra_ticks).await?;
    for result in &replay.results {
        println!("{}", serde_json::to_string(result)?);
    }

    eprintln!("=== Replay complete ===");
    eprintln!("Ticks: {}", replay.ticks);
    eprintln!("Rounds finalized: {}", replay.results.len());
    eprintln!("Final state: {:?}", replay.snapshot.state);
    if !replay.snapshot.unbound_accounts.is_empty() {
        eprintln!("Unbound accounts: {:?}", replay.snapshot.unbound_accounts);
    }
    Ok(())
}

/// Seed storage and the live match from `session`, then step through its
/// script plus `extra_ticks`.
async fn replay(
    session: Session,
    config: ScraperConfig,
    extra_ticks: u64,
) -> Result<Replay, Box<dyn std::error::Error>> {
    let ticks = session.total_frames() + extra_ticks;

    let mut storage = MemoryStorage::new(config.match_kind.clone());
    storage.connect()?;
    for text in &session.players {
        let player: Player = text.parse()?;
        if !storage.add_player(&player) {
            tracing::warn!(player = %player.name, "seed player skipped: duplicate or empty name");
        }
    }
    for account in &session.accounts {
        if !storage.add_account(account) {
            tracing::warn!(%account, "seed account skipped: duplicate or empty name");
        }
    }

    let capture = ScriptedCapture::new(session.script);
    let mut scraper = Scraper::new(config, Box::new(storage), Box::new(capture), Arc::new(NullSink));
    scraper.seed_from_storage();
    let handle = ScraperHandle::new(scraper);

    for (player, legend) in &session.live {
        if let Err(rejection) = handle.set_live_assignment(player, Legend::new(legend)).await {
            tracing::warn!(%player, %legend, %rejection, "seed live assignment rejected");
        }
    }
    for (player, account) in &session.bindings {
        if let Err(rejection) = handle.bind_account(player, account).await {
            tracing::warn!(%player, %account, %rejection, "seed binding rejected");
        }
    }

    let mut results = Vec::new();
    for _ in 0..ticks {
        if let Some(finalization) = handle.step_one_tick().await.finalized {
            results.push(finalization.result);
        }
    }

    let snapshot = handle.snapshot().await;
    handle.close().await;
    Ok(Replay {
        ticks,
        results,
        snapshot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_server::ScraperState;

    #[tokio::test]
    async fn shared_legend_session_finalizes_one_round() {
        let session: Session =
            serde_json::from_str(include_str!("../sessions/shared_legend.json")).unwrap();

        let replay = replay(session, ScraperConfig::default(), 2).await.unwrap();

        assert_eq!(replay.results.len(), 1);
        let names: Vec<&str> = replay.results[0]
            .iter()
            .map(|entry| entry.player.name.as_str())
            .collect();
        // ORION slots pair by capture position: acct2 first, then acct1.
        assert_eq!(names, vec!["Bobby", "Alice", "Casey"]);
        assert!(replay.snapshot.unbound_accounts.is_empty());
        assert_eq!(replay.snapshot.state, ScraperState::AwaitingResult);
    }

    #[tokio::test]
    async fn duplicate_seed_entries_are_skipped() {
        let session = Session {
            players: vec!["Alice,AL,1|2|3".into(), "Alice,AX,4|5|6".into()],
            accounts: vec!["acct1".into(), "acct1".into(), "".into()],
            ..Default::default()
        };

        let replay = replay(session, ScraperConfig::default(), 1).await.unwrap();

        assert_eq!(replay.snapshot.players.len(), 1);
        assert_eq!(replay.snapshot.players[0].initials, "AL");
        assert_eq!(replay.snapshot.accounts, vec!["acct1".to_string()]);
    }
}
