use score_core::Command;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

/// FIFO of pending identity mutations shared between producers and the
/// scraper. Cloning yields another handle to the same queue.
#[derive(Clone, Default)]
pub struct MutationQueue {
    entries: Arc<Mutex<VecDeque<Command>>>,
}

impl MutationQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, command: Command) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push_back(command);
    }

    pub fn extend(&self, commands: impl IntoIterator<Item = Command>) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(commands);
    }

    /// Take every pending command in arrival order, leaving the queue empty.
    pub fn drain(&self) -> Vec<Command> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .drain(..)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
