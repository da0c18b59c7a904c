use crate::scraper_handle::ScraperHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Run the tick loop for the scraper.
/// Runs until shutdown is requested, then releases storage and capture.
pub async fn run_tick_loop(handle: ScraperHandle) {
    let mut interval = interval(handle.tick_interval());
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    tracing::info!(interval_ms = handle.tick_interval().as_millis() as u64, "tick loop started");

    loop {
        interval.tick().await;

        if handle.should_shutdown() {
            break;
        }

        let report = handle.step_one_tick().await;
        tracing::trace!(state = ?report.state, paused = report.paused, "tick");
    }

    handle.close().await;
    tracing::info!("tick loop stopped");
}

/// Spawn the tick loop as a tokio task.
/// Returns a JoinHandle that can be used to wait for the loop to finish.
pub fn spawn_tick_loop(handle: ScraperHandle) -> tokio::task::JoinHandle<()> {
    tokio::spawn(run_tick_loop(handle))
}
