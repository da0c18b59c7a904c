use crate::types::{EventCursor, ServerEvent};
use score_core::{EventSink, RegistryEvent};
use std::sync::{Mutex, PoisonError};
use std::time::{SystemTime, UNIX_EPOCH};

/// A ring buffer for storing events with cursor-based retrieval.
pub struct EventBuffer<E> {
    buffer: Vec<Option<ServerEvent<E>>>,
    capacity: usize,
    next_sequence: u64,
}

impl<E: Clone> EventBuffer<E> {
    /// Create a new event buffer with the given capacity.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            buffer: (0..capacity).map(|_| None).collect(),
            capacity,
            next_sequence: 0,
        }
    }

    /// Push a new event into the buffer.
    pub fn push(&mut self, timestamp_ms: u64, event: E) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;

        let index = (sequence as usize) % self.capacity;
        self.buffer[index] = Some(ServerEvent {
            sequence,
            timestamp_ms,
            event,
        });
    }

    /// Get events starting from the given cursor.
    /// Returns the events and a new cursor pointing past the last returned event.
    pub fn get_from_cursor(&self, cursor: EventCursor) -> (Vec<ServerEvent<E>>, EventCursor) {
        let mut events = Vec::new();

        if self.next_sequence == 0 {
            return (events, EventCursor(0));
        }

        // Older events have been overwritten
        let oldest_available = self.next_sequence.saturating_sub(self.capacity as u64);
        let effective_start = cursor.0.max(oldest_available);

        for seq in effective_start..self.next_sequence {
            let index = (seq as usize) % self.capacity;
            if let Some(event) = &self.buffer[index] {
                if event.sequence == seq {
                    events.push(event.clone());
                }
            }
        }

        (events, EventCursor(self.next_sequence))
    }

    /// Get the current sequence number (next cursor position).
    pub fn current_sequence(&self) -> u64 {
        self.next_sequence
    }
}

/// Keeps the most recent notifications for polling control surfaces.
pub struct BufferedSink {
    buffer: Mutex<EventBuffer<RegistryEvent>>,
}

impl BufferedSink {
    pub fn new(capacity: usize) -> Self {
        Self {
            buffer: Mutex::new(EventBuffer::new(capacity)),
        }
    }

    pub fn poll(&self, cursor: EventCursor) -> (Vec<ServerEvent<RegistryEvent>>, EventCursor) {
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_from_cursor(cursor)
    }

    pub fn current_cursor(&self) -> EventCursor {
        EventCursor(
            self.buffer
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .current_sequence(),
        )
    }
}

impl EventSink for BufferedSink {
    fn notify(&self, event: &RegistryEvent) {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        self.buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(timestamp_ms, event.clone());
    }
}

/// Renders notifications as tracing events.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl EventSink for LogSink {
    fn notify(&self, event: &RegistryEvent) {
        match event {
            RegistryEvent::AccountsUpdated(accounts) => {
                tracing::info!(count = accounts.len(), "accounts updated")
            }
            RegistryEvent::PlayersUpdated(players) => {
                tracing::info!(count = players.len(), "players updated")
            }
            RegistryEvent::PlayerAccountsUpdated(bindings) => {
                tracing::info!(?bindings, "player accounts updated")
            }
            RegistryEvent::LivePlayersUpdated(live) => {
                tracing::info!(?live, "live players updated")
            }
            RegistryEvent::NewResult(result) => {
                for entry in result.iter() {
                    tracing::info!(
                        player = %entry.player,
                        legend = %entry.legend,
                        rank = entry.score.rank,
                        points = entry.score.points,
                        "result"
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accounts(names: &[&str]) -> RegistryEvent {
        RegistryEvent::AccountsUpdated(names.iter().map(|n| n.to_string()).collect())
    }

    #[test]
    fn buffered_sink_records_notifications() {
        let sink = BufferedSink::new(4);
        sink.notify(&accounts(&["acct1"]));
        sink.notify(&accounts(&[]));

        let (events, cursor) = sink.poll(EventCursor(1));
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, accounts(&[]));
        assert_eq!(cursor, sink.current_cursor());

        let (events, _) = sink.poll(cursor);
        assert!(events.is_empty());
    }

    #[test]
    fn buffered_sink_keeps_only_the_newest_notifications() {
        let sink = BufferedSink::new(2);
        sink.notify(&accounts(&["a"]));
        sink.notify(&accounts(&["a", "b"]));
        sink.notify(&accounts(&["a", "b", "c"]));

        // A stale cursor resumes at the oldest retained event.
        let (events, cursor) = sink.poll(EventCursor(0));
        let sequences: Vec<u64> = events.iter().map(|e| e.sequence).collect();
        assert_eq!(sequences, vec![1, 2]);
        assert_eq!(events[1].event, accounts(&["a", "b", "c"]));
        assert_eq!(cursor, EventCursor(3));
    }

    #[test]
    fn empty_sink_polls_nothing() {
        let sink = BufferedSink::new(8);
        let (events, cursor) = sink.poll(EventCursor(0));
        assert!(events.is_empty());
        assert_eq!(cursor, EventCursor(0));
    }
}
