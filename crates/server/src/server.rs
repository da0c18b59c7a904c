use crate::scraper::Scraper;
use crate::scraper_handle::ScraperHandle;
use crate::tick_loop::spawn_tick_loop;
use crate::types::ScraperConfig;
use score_core::{Capture, EventSink, Storage, StorageError};
use std::sync::Arc;
use tokio::task::JoinHandle;

/// A running scraper: connected storage, seeded registry and a tick loop task.
pub struct ScoreServer {
    handle: ScraperHandle,
    task: JoinHandle<()>,
}

impl ScoreServer {
    /// Connect storage, seed the registry from it and spawn the tick loop.
    pub fn start(
        config: ScraperConfig,
        mut storage: Box<dyn Storage>,
        capture: Box<dyn Capture>,
        sink: Arc<dyn EventSink>,
    ) -> Result<Self, StorageError> {
        storage.connect()?;

        let mut scraper = Scraper::new(config, storage, capture, sink);
        scraper.seed_from_storage();

        let handle = ScraperHandle::new(scraper);
        let task = spawn_tick_loop(handle.clone());

        Ok(Self { handle, task })
    }

    pub fn handle(&self) -> &ScraperHandle {
        &self.handle
    }

    /// Stop the tick loop after its current tick and wait for it to release
    /// its resources.
    pub async fn shutdown(self) {
        self.handle.request_shutdown();
        if let Err(error) = self.task.await {
            tracing::error!("tick loop task failed: {error}");
        }
    }
}
