//! Connection-lifecycle state owned by the coordinator.
//!
//! The three structures here hold all matching state:
//!
//! - [`registry`] - `SessionRegistry`, identity and lifecycle state per connection
//! - [`queue`] - `WaitingQueue`, FIFO of connections seeking a partner
//! - [`pairs`] - `PairingTable`, symmetric map of matched connections
//!
//! None of them lock internally: the coordinator actor is the single
//! serialization domain, and a connection is in at most one of
//! {waiting queue, pairing table} at any time.

pub mod pairs;
pub mod queue;
pub mod registry;

pub use pairs::PairingTable;
pub use queue::WaitingQueue;
pub use registry::{SessionRegistry, SessionState};
