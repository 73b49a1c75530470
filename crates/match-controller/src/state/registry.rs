//! `SessionRegistry` - identity and lifecycle state for every live connection.
//!
//! A connection is born `Idle` on transport connect, becomes `Waiting` when it
//! joins without an available partner, `Matched` once paired, and returns to
//! `Idle` when its partner disconnects (it is not re-queued automatically).
//! Removal from the registry is the terminal state.

use crate::errors::MatchError;

use std::collections::HashMap;

/// Lifecycle state of a connection within the coordinator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Connected, not seeking a partner.
    Idle,
    /// Queued, waiting for a partner.
    Waiting,
    /// Paired with a partner.
    Matched,
}

/// One live connection's registry entry.
#[derive(Debug)]
struct Session {
    /// Display name, absent until the first join.
    name: Option<String>,
    /// Current lifecycle state.
    state: SessionState,
}

/// Lookup table of live connections.
///
/// Pure data structure; serialization is the coordinator's job.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<String, Session>,
}

impl SessionRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new connection in `Idle` state, with no name yet.
    ///
    /// Fails with [`MatchError::DuplicateConnection`] if the id is already
    /// present. The transport guarantees unique ids, so this is a caller bug.
    pub fn register(&mut self, id: &str) -> Result<(), MatchError> {
        if self.sessions.contains_key(id) {
            return Err(MatchError::DuplicateConnection(id.to_string()));
        }
        self.sessions.insert(
            id.to_string(),
            Session {
                name: None,
                state: SessionState::Idle,
            },
        );
        Ok(())
    }

    /// Set the display name for a connection.
    pub fn set_name(&mut self, id: &str, name: String) -> Result<(), MatchError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| MatchError::UnknownConnection(id.to_string()))?;
        session.name = Some(name);
        Ok(())
    }

    /// Look up the display name for a connection.
    #[must_use]
    pub fn name_of(&self, id: &str) -> Option<&str> {
        self.sessions.get(id).and_then(|s| s.name.as_deref())
    }

    /// Look up the lifecycle state for a connection.
    #[must_use]
    pub fn state_of(&self, id: &str) -> Option<SessionState> {
        self.sessions.get(id).map(|s| s.state)
    }

    /// Update the lifecycle state for a connection.
    pub fn set_state(&mut self, id: &str, state: SessionState) -> Result<(), MatchError> {
        let session = self
            .sessions
            .get_mut(id)
            .ok_or_else(|| MatchError::UnknownConnection(id.to_string()))?;
        session.state = state;
        Ok(())
    }

    /// Remove a connection. Idempotent: removing an absent id is a no-op.
    pub fn remove(&mut self, id: &str) {
        self.sessions.remove(id);
    }

    /// Whether the registry knows this connection.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.sessions.contains_key(id)
    }

    /// Number of live connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
