//! WebSocket transport collaborator.
//!
//! The transport owns everything socket-shaped: accepting connections,
//! framing, and draining each connection's outbound channel. It never touches
//! matching state directly; every inbound event goes through the
//! [`MatchCoordinatorHandle`], which is the single serialization domain.
//!
//! Per socket:
//! 1. generate a connection id, open a bounded outbound channel, `connect`
//! 2. spawn a writer task pumping `OutboundEvent` → JSON text frames
//! 3. read inbound text frames as [`InboundFrame`]; a malformed frame is
//!    rejected and logged, state untouched
//! 4. on close or error, `disconnect` (idempotent)

use crate::actors::{InboundFrame, MatchCoordinatorHandle};
use crate::errors::MatchError;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

/// Shared state for the WebSocket route.
#[derive(Clone)]
pub struct TransportState {
    /// Handle to the coordinator actor.
    pub coordinator: MatchCoordinatorHandle,
    /// Capacity of each connection's outbound channel.
    pub outbound_buffer: usize,
}

/// Create the transport router with the `/ws` upgrade endpoint.
pub fn transport_router(state: TransportState) -> Router {
    Router::new().route("/ws", get(ws_handler)).with_state(state)
}

async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<TransportState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one WebSocket connection for its whole lifetime.
async fn handle_socket(socket: WebSocket, state: TransportState) {
    let connection_id = Uuid::new_v4().to_string();
    let (out_tx, mut out_rx) = mpsc::channel(state.outbound_buffer);

    if let Err(e) = state
        .coordinator
        .connect(connection_id.clone(), out_tx)
        .await
    {
        warn!(
            target: "match.transport",
            connection_id = %connection_id,
            error = %e,
            "Connection rejected"
        );
        return;
    }

    debug!(
        target: "match.transport",
        connection_id = %connection_id,
        "WebSocket connection established"
    );

    let (mut sink, mut stream) = socket.split();

    // Writer task: drains the outbound channel into the socket. Events are
    // already best-effort by the time they reach this channel; a dead socket
    // just ends the pump.
    let writer = tokio::spawn(async move {
        while let Some(event) = out_rx.recv().await {
            match serde_json::to_string(&event) {
                Ok(frame) => {
                    if sink.send(Message::Text(frame)).await.is_err() {
                        break;
                    }
                }
                Err(e) => {
                    warn!(target: "match.transport", error = %e, "Failed to encode outbound event");
                }
            }
        }
        let _ = sink.close().await;
    });

    // Reader loop: inbound frames until close or transport error.
    while let Some(message) = stream.next().await {
        let Ok(message) = message else {
            break;
        };

        match message {
            Message::Text(text) => {
                handle_frame(&state.coordinator, &connection_id, &text).await;
            }
            Message::Close(_) => break,
            Message::Binary(_) | Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    if let Err(e) = state.coordinator.disconnect(connection_id.clone()).await {
        warn!(
            target: "match.transport",
            connection_id = %connection_id,
            error = %e,
            "Disconnect delivery failed"
        );
    }

    writer.abort();

    debug!(
        target: "match.transport",
        connection_id = %connection_id,
        "WebSocket connection closed"
    );
}

/// Parse and dispatch one inbound text frame.
///
/// A malformed frame rejects that single event and leaves state unchanged.
async fn handle_frame(coordinator: &MatchCoordinatorHandle, connection_id: &str, text: &str) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            warn!(
                target: "match.transport",
                connection_id = %connection_id,
                error = %e,
                "Malformed inbound frame, rejected"
            );
            return;
        }
    };

    let result = match frame {
        InboundFrame::Join { username } => {
            coordinator.join(connection_id.to_string(), username).await
        }
        InboundFrame::Message(text) => {
            coordinator
                .relay_message(connection_id.to_string(), text)
                .await
        }
    };

    match result {
        Ok(()) => {}
        Err(MatchError::InvalidPayload(reason)) => {
            debug!(
                target: "match.transport",
                connection_id = %connection_id,
                reason = %reason,
                "Inbound event rejected"
            );
        }
        Err(e) => {
            warn!(
                target: "match.transport",
                connection_id = %connection_id,
                error = %e,
                "Inbound event failed"
            );
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::actors::COORDINATOR_CHANNEL_BUFFER;

    #[tokio::test]
    async fn test_handle_frame_join_routes_to_coordinator() {
        let coordinator = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);
        let (tx, _rx) = mpsc::channel(8);
        coordinator.connect("c1".to_string(), tx).await.unwrap();

        handle_frame(
            &coordinator,
            "c1",
            r#"{"event":"join","data":{"username":"alice"}}"#,
        )
        .await;

        let state = coordinator.state().await.unwrap();
        assert_eq!(state.waiting, vec!["c1".to_string()]);

        coordinator.cancel();
    }

    #[tokio::test]
    async fn test_handle_frame_malformed_leaves_state_unchanged() {
        let coordinator = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);
        let (tx, _rx) = mpsc::channel(8);
        coordinator.connect("c1".to_string(), tx).await.unwrap();

        handle_frame(&coordinator, "c1", "not json at all").await;
        handle_frame(&coordinator, "c1", r#"{"event":"unknown"}"#).await;

        let state = coordinator.state().await.unwrap();
        assert!(state.waiting.is_empty());
        assert!(state.pairings.is_empty());

        coordinator.cancel();
    }

    #[tokio::test]
    async fn test_handle_frame_message_relays_between_partners() {
        let coordinator = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);
        let (tx1, _rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        coordinator.connect("c1".to_string(), tx1).await.unwrap();
        coordinator.connect("c2".to_string(), tx2).await.unwrap();
        coordinator.join("c1".to_string(), "alice".to_string()).await.unwrap();
        coordinator.join("c2".to_string(), "bob".to_string()).await.unwrap();

        handle_frame(&coordinator, "c1", r#"{"event":"message","data":"hi"}"#).await;
        let _ = coordinator.state().await.unwrap();

        // Skip the lifecycle events and find the relayed message
        let mut saw_message = false;
        while let Ok(event) = rx2.try_recv() {
            if let crate::actors::OutboundEvent::Message {
                text,
                sender_username,
            } = event
            {
                assert_eq!(text, "hi");
                assert_eq!(sender_username, "alice");
                saw_message = true;
            }
        }
        assert!(saw_message);

        coordinator.cancel();
    }
}
