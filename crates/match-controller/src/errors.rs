//! Match Controller error types.
//!
//! The error taxonomy distinguishes programmer-invariant violations (duplicate
//! registration, double-enqueue, pairing an already-paired connection) from
//! expected races (message to a vanished partner, duplicate disconnect).
//! Invariant violations surface as errors and never corrupt shared state;
//! expected races are resolved as silent no-ops and never reach this type.

use thiserror::Error;

/// Match Controller error type.
#[derive(Debug, Error)]
pub enum MatchError {
    /// A connection id was registered twice. The transport guarantees unique
    /// ids, so this indicates a caller bug.
    #[error("connection already registered: {0}")]
    DuplicateConnection(String),

    /// An operation referenced a connection id the registry does not know.
    #[error("unknown connection: {0}")]
    UnknownConnection(String),

    /// A connection was enqueued while already waiting.
    #[error("connection already queued: {0}")]
    AlreadyQueued(String),

    /// A pairing was attempted for a connection that already has a partner.
    #[error("connection already paired: {0}")]
    AlreadyPaired(String),

    /// An inbound event carried a malformed payload (e.g. a blank username).
    /// The single event is rejected; state is left unchanged.
    #[error("invalid payload: {0}")]
    InvalidPayload(String),

    /// Internal error (actor mailbox closed, response channel dropped).
    #[error("internal error: {0}")]
    Internal(String),
}

impl MatchError {
    /// Whether this error is a programmer-invariant violation rather than a
    /// rejected inbound event.
    #[must_use]
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            MatchError::DuplicateConnection(_)
                | MatchError::AlreadyQueued(_)
                | MatchError::AlreadyPaired(_)
        )
    }
}
