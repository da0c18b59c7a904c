//! Score server - scraper tick loop with an HTTP control surface.
//!
//! Single binary that:
//! - Seeds the identity registry from a JSON storage file and runs the tick loop
//! - Serves the control API and an SSE event stream on --port (default 5000)
//! - Reads console commands from stdin unless --no-console is given

mod api;

use api::AppState;
use clap::Parser;
use score_core::{EventSink, FanoutSink};
use score_server::{
    parse_line, BufferedSink, JsonFileStorage, LogSink, ScoreServer, ScraperConfig,
    ScraperHandle, ScriptedCapture,
};
use std::{path::PathBuf, sync::Arc};
use tokio::{
    net::TcpListener,
    sync::{mpsc, watch},
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "score-server")]
#[command(about = "Match result scraper with an HTTP control surface")]
struct Args {
    /// Address to bind the control surface on
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Port for the control surface
    #[arg(long, default_value = "5000")]
    port: u16,

    /// JSON storage file for accounts, players and match results
    #[arg(long, default_value = "scores.json")]
    data: PathBuf,

    /// Scraper configuration file (JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Screen script replayed as the capture source
    #[arg(long)]
    script: Option<PathBuf>,

    /// Do not read commands from stdin
    #[arg(long)]
    no_console: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => ScraperConfig::load(path)?,
        None => ScraperConfig::default(),
    };

    let capture = match &args.script {
        Some(path) => ScriptedCapture::load(path)?,
        None => {
            tracing::warn!("No --script given; capture stays on gameplay");
            ScriptedCapture::new(Vec::new())
        }
    };

    let events = Arc::new(BufferedSink::new(config.event_buffer_capacity));
    let sinks: Vec<Arc<dyn EventSink>> = vec![Arc::new(LogSink), events.clone()];
    let storage = JsonFileStorage::new(args.data.clone(), config.match_kind.clone());

    let server = ScoreServer::start(
        config,
        Box::new(storage),
        Box::new(capture),
        Arc::new(FanoutSink::new(sinks)),
    )?;
    let handle = server.handle().clone();

    if !args.no_console {
        let lines = spawn_console_reader()?;
        tokio::spawn(console_loop(handle.clone(), lines));
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let app = api::router(Arc::new(AppState::new(handle, events, shutdown_rx)));
    let listener = TcpListener::bind((args.host.as_str(), args.port)).await?;

    tracing::info!("Control surface: http://{}:{}", args.host, args.port);
    tracing::info!("Storage file: {:?}", args.data);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown_tx))
        .await?;

    server.shutdown().await;
    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Reads stdin on its own thread. A blocking read there never holds up
/// runtime shutdown; the thread dies with the process.
fn spawn_console_reader() -> std::io::Result<mpsc::Receiver<String>> {
    let (tx, rx) = mpsc::channel(16);
    std::thread::Builder::new()
        .name("console".to_string())
        .spawn(move || {
            for line in std::io::stdin().lines() {
                match line {
                    Ok(line) => {
                        if tx.blocking_send(line).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::error!("Failed to read console: {error}");
                        return;
                    }
                }
            }
            tracing::info!("Console closed");
        })?;
    Ok(rx)
}

/// Applies `command arg...` lines until the console closes.
async fn console_loop(handle: ScraperHandle, mut lines: mpsc::Receiver<String>) {
    while let Some(line) = lines.recv().await {
        if line.trim().is_empty() {
            continue;
        }
        match parse_line(&line) {
            Ok(command) => api::apply_control(&handle, command).await,
            Err(error) => tracing::warn!("Dropped console line {:?}: {error}", line),
        }
    }
}

async fn shutdown_signal(shutdown: watch::Sender<bool>) {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for ctrl-c: {error}");
        std::future::pending::<()>().await;
    }
    tracing::info!("Interrupt received, stopping");
    shutdown.send_replace(true);
}

#[cfg(test)]
mod tests {
    use super::*;
    use score_core::NullSink;
    use score_server::{MatchKind, MemoryStorage, Scraper};

    #[tokio::test]
    async fn console_loop_applies_lines_until_reader_closes() {
        let scraper = Scraper::new(
            ScraperConfig::default(),
            Box::new(MemoryStorage::new(MatchKind::default())),
            Box::new(ScriptedCapture::new(Vec::new())),
            Arc::new(NullSink),
        );
        let handle = ScraperHandle::new(scraper);

        let (tx, rx) = mpsc::channel(4);
        for line in ["add_account acct1 acct2", "bogus line", "", "pause"] {
            tx.send(line.to_string()).await.unwrap();
        }
        drop(tx);

        console_loop(handle.clone(), rx).await;

        assert_eq!(handle.pending_commands(), 2);
        assert!(handle.snapshot().await.paused);
    }
}
