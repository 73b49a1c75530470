//! Match Controller Service Library
//!
//! This library provides the core functionality for the Match Controller -
//! a stateful WebSocket pairing server for anonymous 1:1 chat:
//!
//! - Connection lifecycle tracking (connect, join, disconnect)
//! - FIFO matchmaking between waiting users
//! - Message relay between matched partners
//! - Presence fan-out (live connected-user counts to every client)
//!
//! # Architecture
//!
//! All matching state lives inside a single coordinator actor; transport
//! tasks never touch it directly:
//!
//! ```text
//! WebSocket task (one per connection)
//! ├── parses inbound frames
//! └── sends CoordinatorMessage ──▶ MatchCoordinator (singleton)
//!                                  ├── SessionRegistry (id → username, state)
//!                                  ├── WaitingQueue (FIFO)
//!                                  ├── PairingTable (symmetric partner map)
//!                                  └── Relay ──▶ per-connection outbound channels
//! ```
//!
//! # Key Design Decisions
//!
//! - **Single serialization domain**: every state transition flows through
//!   the coordinator's mailbox, so no locks and no partial pairings
//! - **Best-effort outbound**: events are delivered with `try_send`; a slow
//!   or dead socket drops events instead of stalling the coordinator
//! - **Idempotent disconnect**: duplicate disconnects for the same connection
//!   never double-decrement the user count
//!
//! # Modules
//!
//! - [`actors`] - the coordinator actor and its message types
//! - [`config`] - service configuration from environment
//! - [`errors`] - error types with invariant classification
//! - [`observability`] - liveness/readiness probes
//! - [`relay`] - outbound event delivery
//! - [`state`] - registry, queue, and pairing table
//! - [`transport`] - axum WebSocket endpoint

pub mod actors;
pub mod config;
pub mod errors;
pub mod observability;
pub mod relay;
pub mod state;
pub mod transport;
