//! Actor model for the Match Controller.
//!
//! A single `MatchCoordinator` actor owns all matching state and is its only
//! mutator. Transport tasks hold a [`MatchCoordinatorHandle`] and communicate
//! exclusively through typed messages over `tokio::sync::mpsc`:
//!
//! ```text
//! transport task (one per WebSocket)
//!     ── CoordinatorMessage ──▶ MatchCoordinator (singleton)
//!     ◀── OutboundEvent ────── Relay (per-connection sinks)
//! ```
//!
//! # Modules
//!
//! - [`coordinator`] - the connection-lifecycle state machine
//! - [`messages`] - mailbox message types and wire frames

pub mod coordinator;
pub mod messages;

pub use coordinator::{MatchCoordinatorHandle, COORDINATOR_CHANNEL_BUFFER};
pub use messages::{CoordinatorMessage, CoordinatorState, InboundFrame, OutboundEvent};
