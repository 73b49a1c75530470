//! Message types for the coordinator mailbox and the transport wire.
//!
//! All communication with the coordinator uses strongly-typed message passing
//! via `tokio::sync::mpsc`; request-reply operations carry a
//! `tokio::sync::oneshot` response channel. Wire frames are adjacently tagged
//! JSON: `{"event": <name>, "data": <payload>}` with camelCase names.

use crate::errors::MatchError;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

/// Messages sent to the `MatchCoordinator` actor.
#[derive(Debug)]
pub enum CoordinatorMessage {
    /// A new transport connection arrived.
    Connect {
        connection_id: String,
        /// Outbound sink for events addressed to this connection.
        outbound: mpsc::Sender<OutboundEvent>,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), MatchError>>,
    },

    /// A connection wants to be matched, carrying its display name.
    Join {
        connection_id: String,
        username: String,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<Result<(), MatchError>>,
    },

    /// A connection sent a chat message for its current partner.
    /// Fire-and-forget: a missing partner is an expected race, not an error.
    Relay {
        connection_id: String,
        text: String,
    },

    /// A transport connection closed. Idempotent.
    Disconnect {
        connection_id: String,
        /// Response channel for confirmation.
        respond_to: oneshot::Sender<()>,
    },

    /// Get a snapshot of coordinator state (for status and tests).
    GetState {
        /// Response channel for the snapshot.
        respond_to: oneshot::Sender<CoordinatorState>,
    },
}

/// Snapshot of coordinator state at a point in time.
#[derive(Debug, Clone)]
pub struct CoordinatorState {
    /// Count of currently connected connections.
    pub connected_count: usize,
    /// Waiting queue contents in FIFO order.
    pub waiting: Vec<String>,
    /// All directed pairing entries (a→b and b→a both present).
    pub pairings: Vec<(String, String)>,
}

/// Events emitted to the transport collaborator, addressed per connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum OutboundEvent {
    /// Connected-user count, broadcast to every connection.
    UserCount { count: usize },

    /// Sent to a connection that was enqueued without an available partner.
    Waiting,

    /// Sent to both newly paired connections, each with the other's name.
    #[serde(rename_all = "camelCase")]
    Matched { partner_username: String },

    /// A chat message relayed to the partner only.
    #[serde(rename_all = "camelCase")]
    Message {
        text: String,
        sender_username: String,
    },

    /// Sent to the surviving partner when its partner disconnects.
    PartnerDisconnected,
}

/// Frames received from a transport connection.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "camelCase")]
pub enum InboundFrame {
    /// Request to be matched, carrying the display name.
    Join { username: String },

    /// Raw chat text for the current partner.
    Message(String),
}
