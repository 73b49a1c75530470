//! `WaitingQueue` - FIFO of connections seeking a partner.
//!
//! The dequeue order is the sole matching rule: the earliest-waiting
//! connection is matched first. No priorities, no timeouts.

use crate::errors::MatchError;

use std::collections::VecDeque;

/// Ordered sequence of connection ids, FIFO, no duplicates.
#[derive(Debug, Default)]
pub struct WaitingQueue {
    entries: VecDeque<String>,
}

impl WaitingQueue {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a connection id to the tail.
    ///
    /// A connection appears at most once; enqueueing an id that is already
    /// queued is a caller bug and fails with [`MatchError::AlreadyQueued`].
    pub fn enqueue(&mut self, id: &str) -> Result<(), MatchError> {
        if self.contains(id) {
            return Err(MatchError::AlreadyQueued(id.to_string()));
        }
        self.entries.push_back(id.to_string());
        Ok(())
    }

    /// Remove and return the head of the queue, or `None` if empty.
    pub fn dequeue_front(&mut self) -> Option<String> {
        self.entries.pop_front()
    }

    /// Remove an id wherever it sits in the queue (disconnect-while-waiting).
    ///
    /// No-op if absent. Preserves the relative order of remaining entries.
    pub fn remove(&mut self, id: &str) {
        self.entries.retain(|entry| entry != id);
    }

    /// Whether the id is currently queued.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.entries.iter().any(|entry| entry == id)
    }

    /// Number of waiting connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of the queue contents in order, for state introspection.
    #[must_use]
    pub fn snapshot(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }
}
