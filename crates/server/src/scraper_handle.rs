use crate::queue::MutationQueue;
use crate::scraper::{Scraper, TickReport};
use crate::types::{RegistrySnapshot, ScraperState};
use score_core::{Command, Legend, Rejection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Thread-safe handle to the scraper.
///
/// The mutation queue has its own lock so producers never wait on a tick.
/// Everything else goes through the scraper lock.
pub struct ScraperHandle {
    inner: Arc<Mutex<Scraper>>,
    queue: MutationQueue,
    shutdown: Arc<AtomicBool>,
    tick_interval: Duration,
}

impl Clone for ScraperHandle {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            queue: self.queue.clone(),
            shutdown: Arc::clone(&self.shutdown),
            tick_interval: self.tick_interval,
        }
    }
}

impl ScraperHandle {
    pub fn new(scraper: Scraper) -> Self {
        let tick_interval = scraper.config().tick_interval();
        Self {
            inner: Arc::new(Mutex::new(scraper)),
            queue: MutationQueue::new(),
            shutdown: Arc::new(AtomicBool::new(false)),
            tick_interval,
        }
    }

    pub fn tick_interval(&self) -> Duration {
        self.tick_interval
    }

    pub fn should_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Queue an identity mutation for the next tick.
    pub fn enqueue(&self, command: Command) {
        tracing::debug!(%command, "command queued");
        self.queue.push(command);
    }

    pub fn enqueue_all(&self, commands: impl IntoIterator<Item = Command>) {
        self.queue.extend(commands);
    }

    pub fn pending_commands(&self) -> usize {
        self.queue.len()
    }

    /// Drain the queue and advance the state machine by one tick.
    pub async fn step_one_tick(&self) -> TickReport {
        let mut scraper = self.inner.lock().await;
        let commands = self.queue.drain();
        scraper.tick(commands)
    }

    /// Lock the synchronous control surface. Validation and application made
    /// through one guard cannot interleave with other requests or ticks.
    pub async fn control(&self) -> ControlGuard<'_> {
        ControlGuard {
            scraper: self.inner.lock().await,
        }
    }

    /// Validate and, if accepted, set a live assignment.
    pub async fn set_live_assignment(&self, player: &str, legend: Legend) -> Result<(), Rejection> {
        let mut control = self.control().await;
        let rejection = control.validate_set_live_assignment(player, &legend);
        if !rejection.is_accepted() {
            return Err(rejection);
        }
        control.set_live_assignment(player, legend);
        Ok(())
    }

    /// Validate and, if accepted, bind an account.
    pub async fn bind_account(&self, player: &str, account: &str) -> Result<(), Rejection> {
        let mut control = self.control().await;
        let rejection = control.validate_bind_account(player, account);
        if !rejection.is_accepted() {
            return Err(rejection);
        }
        control.bind_account(player, account);
        Ok(())
    }

    /// Validate and, if the player exists, withdraw it from the live match.
    pub async fn remove_live_player(&self, name: &str) -> bool {
        let mut control = self.control().await;
        if !control.validate_remove_player(name) {
            return false;
        }
        control.remove_player(name);
        true
    }

    /// Flip the pause flag and return the new value.
    pub async fn toggle_pause(&self) -> bool {
        self.inner.lock().await.toggle_pause()
    }

    pub async fn abandon_round(&self) {
        self.inner.lock().await.abandon_round();
    }

    pub async fn state(&self) -> ScraperState {
        self.inner.lock().await.state()
    }

    pub async fn snapshot(&self) -> RegistrySnapshot {
        self.inner.lock().await.snapshot()
    }

    /// Sorted known accounts.
    pub async fn accounts(&self) -> Vec<String> {
        self.inner.lock().await.registry().accounts()
    }

    /// Release storage and capture resources.
    pub async fn close(&self) {
        self.inner.lock().await.close();
    }
}

/// Exclusive access to the synchronous validate/apply surface.
pub struct ControlGuard<'a> {
    scraper: MutexGuard<'a, Scraper>,
}

impl ControlGuard<'_> {
    pub fn validate_set_live_assignment(&self, player: &str, legend: &Legend) -> Rejection {
        self.scraper.validate_set_live_assignment(player, legend)
    }

    pub fn set_live_assignment(&mut self, player: &str, legend: Legend) -> bool {
        self.scraper.set_live_assignment(player, legend)
    }

    pub fn validate_bind_account(&self, player: &str, account: &str) -> Rejection {
        self.scraper.validate_bind_account(player, account)
    }

    pub fn bind_account(&mut self, player: &str, account: &str) -> bool {
        self.scraper.bind_account(player, account)
    }

    pub fn validate_remove_player(&self, name: &str) -> bool {
        self.scraper.validate_remove_player(name)
    }

    pub fn remove_player(&mut self, name: &str) -> bool {
        self.scraper.remove_player(name)
    }
}
