//! Integration tests for the matching flow.
//!
//! Drives the coordinator through realistic connect/join/message/disconnect
//! churn via its public handle and asserts the lifecycle events and the
//! structural invariants of the matching state.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::time::Duration;

use match_controller::actors::{
    CoordinatorState, MatchCoordinatorHandle, OutboundEvent, COORDINATOR_CHANNEL_BUFFER,
};
use tokio::sync::mpsc;

// ============================================================================
// Helpers
// ============================================================================

/// A connected test client: outbound event stream plus its connection id.
struct TestClient {
    id: String,
    events: mpsc::Receiver<OutboundEvent>,
}

impl TestClient {
    async fn connect(handle: &MatchCoordinatorHandle, id: &str) -> Self {
        let (tx, rx) = mpsc::channel(64);
        handle
            .connect(id.to_string(), tx)
            .await
            .expect("connect should succeed");
        Self {
            id: id.to_string(),
            events: rx,
        }
    }

    async fn join(&self, handle: &MatchCoordinatorHandle, username: &str) {
        handle
            .join(self.id.clone(), username.to_string())
            .await
            .expect("join should succeed");
    }

    async fn next_event(&mut self) -> OutboundEvent {
        tokio::time::timeout(Duration::from_secs(1), self.events.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Skip user-count broadcasts and return the next lifecycle event.
    async fn next_lifecycle_event(&mut self) -> OutboundEvent {
        loop {
            match self.next_event().await {
                OutboundEvent::UserCount { .. } => {}
                other => return other,
            }
        }
    }
}

/// Assert the structural invariants that must hold after any operation
/// sequence: pairings are symmetric and no connection is both waiting
/// and paired.
fn assert_invariants(state: &CoordinatorState) {
    for (a, b) in &state.pairings {
        assert!(
            state.pairings.contains(&(b.clone(), a.clone())),
            "pairing {a}->{b} has no reverse entry"
        );
        assert_ne!(a, b, "connection {a} is paired with itself");
    }
    for waiting_id in &state.waiting {
        assert!(
            !state.pairings.iter().any(|(a, _)| a == waiting_id),
            "{waiting_id} is both waiting and paired"
        );
    }
    let waiting_set: std::collections::HashSet<_> = state.waiting.iter().collect();
    assert_eq!(
        waiting_set.len(),
        state.waiting.len(),
        "waiting queue has duplicates"
    );
}

// ============================================================================
// Lifecycle Flow
// ============================================================================

#[tokio::test]
async fn test_two_clients_match_chat_and_part() {
    let handle = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);

    let mut alice = TestClient::connect(&handle, "conn-alice").await;
    alice.join(&handle, "alice").await;
    assert_eq!(alice.next_lifecycle_event().await, OutboundEvent::Waiting);

    let mut bob = TestClient::connect(&handle, "conn-bob").await;
    bob.join(&handle, "bob").await;

    assert_eq!(
        alice.next_lifecycle_event().await,
        OutboundEvent::Matched {
            partner_username: "bob".to_string()
        }
    );
    assert_eq!(
        bob.next_lifecycle_event().await,
        OutboundEvent::Matched {
            partner_username: "alice".to_string()
        }
    );

    // Chat flows both directions, each message tagged with the sender's name
    handle
        .relay_message("conn-alice".to_string(), "hello".to_string())
        .await
        .unwrap();
    assert_eq!(
        bob.next_lifecycle_event().await,
        OutboundEvent::Message {
            text: "hello".to_string(),
            sender_username: "alice".to_string()
        }
    );

    handle
        .relay_message("conn-bob".to_string(), "hi there".to_string())
        .await
        .unwrap();
    assert_eq!(
        alice.next_lifecycle_event().await,
        OutboundEvent::Message {
            text: "hi there".to_string(),
            sender_username: "bob".to_string()
        }
    );

    // Alice leaves; bob is notified and is idle, not re-queued
    handle.disconnect("conn-alice".to_string()).await.unwrap();
    assert_eq!(
        bob.next_lifecycle_event().await,
        OutboundEvent::PartnerDisconnected
    );

    let state = handle.state().await.unwrap();
    assert_eq!(state.connected_count, 1);
    assert!(state.waiting.is_empty());
    assert!(state.pairings.is_empty());
    assert_invariants(&state);

    handle.cancel();
}

#[tokio::test]
async fn test_user_count_tracks_connects_and_disconnects() {
    let handle = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);

    let mut observer = TestClient::connect(&handle, "observer").await;
    assert_eq!(
        observer.next_event().await,
        OutboundEvent::UserCount { count: 1 }
    );

    let _c2 = TestClient::connect(&handle, "c2").await;
    assert_eq!(
        observer.next_event().await,
        OutboundEvent::UserCount { count: 2 }
    );

    let _c3 = TestClient::connect(&handle, "c3").await;
    assert_eq!(
        observer.next_event().await,
        OutboundEvent::UserCount { count: 3 }
    );

    handle.disconnect("c2".to_string()).await.unwrap();
    assert_eq!(
        observer.next_event().await,
        OutboundEvent::UserCount { count: 2 }
    );

    handle.cancel();
}

// ============================================================================
// Churn and Invariants
// ============================================================================

#[tokio::test]
async fn test_churn_preserves_invariants() {
    let handle = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);

    // Wave 1: ten clients connect and join
    let mut clients = Vec::new();
    for i in 0..10 {
        let client = TestClient::connect(&handle, &format!("c{i}")).await;
        client.join(&handle, &format!("user{i}")).await;
        clients.push(client);
    }

    let state = handle.state().await.unwrap();
    assert_invariants(&state);
    assert_eq!(state.pairings.len(), 10); // 5 pairs, both directions
    assert!(state.waiting.is_empty());

    // Wave 2: half of them disconnect, including both sides of one pair
    for i in [0, 1, 4, 7, 8] {
        handle.disconnect(format!("c{i}")).await.unwrap();
    }

    let state = handle.state().await.unwrap();
    assert_invariants(&state);
    assert_eq!(state.connected_count, 5);

    // Wave 3: survivors whose partner vanished rejoin and re-match
    for i in [5, 6, 9] {
        handle
            .join(format!("c{i}"), format!("user{i}"))
            .await
            .unwrap();
    }

    let state = handle.state().await.unwrap();
    assert_invariants(&state);

    handle.cancel();
}

#[tokio::test]
async fn test_fifo_order_across_waves_of_joins() {
    let handle = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);

    let _w1 = TestClient::connect(&handle, "w1").await;
    let _w2 = TestClient::connect(&handle, "w2").await;
    let _w3 = TestClient::connect(&handle, "w3").await;
    handle.join("w1".to_string(), "a".to_string()).await.unwrap();
    handle.join("w2".to_string(), "b".to_string()).await.unwrap();
    handle.join("w3".to_string(), "c".to_string()).await.unwrap();

    // w1 and w2 matched immediately; w3 is the queue head
    let state = handle.state().await.unwrap();
    assert_eq!(state.waiting, vec!["w3".to_string()]);

    let _j = TestClient::connect(&handle, "j").await;
    handle.join("j".to_string(), "d".to_string()).await.unwrap();

    let state = handle.state().await.unwrap();
    assert!(state.waiting.is_empty());
    assert!(state
        .pairings
        .contains(&("j".to_string(), "w3".to_string())));
    assert_invariants(&state);

    handle.cancel();
}

// ============================================================================
// Privacy and Loss Semantics
// ============================================================================

#[tokio::test]
async fn test_messages_never_leak_outside_the_pair() {
    let handle = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);

    let _a = TestClient::connect(&handle, "a").await;
    let _b = TestClient::connect(&handle, "b").await;
    let mut outsider = TestClient::connect(&handle, "outsider").await;

    handle.join("a".to_string(), "alice".to_string()).await.unwrap();
    handle.join("b".to_string(), "bob".to_string()).await.unwrap();
    handle
        .relay_message("a".to_string(), "private".to_string())
        .await
        .unwrap();

    // Barrier: the fire-and-forget relay is processed once state() returns
    let _ = handle.state().await.unwrap();

    while let Ok(event) = outsider.events.try_recv() {
        assert!(
            matches!(event, OutboundEvent::UserCount { .. }),
            "outsider received {event:?}"
        );
    }

    handle.cancel();
}

#[tokio::test]
async fn test_message_after_partner_disconnect_is_dropped() {
    let handle = MatchCoordinatorHandle::new(COORDINATOR_CHANNEL_BUFFER);

    let mut a = TestClient::connect(&handle, "a").await;
    let _b = TestClient::connect(&handle, "b").await;
    handle.join("a".to_string(), "alice".to_string()).await.unwrap();
    handle.join("b".to_string(), "bob".to_string()).await.unwrap();

    handle.disconnect("b".to_string()).await.unwrap();
    assert_eq!(
        a.next_lifecycle_event().await,
        OutboundEvent::PartnerDisconnected
    );

    // Message sent after the pairing dissolved: no error, no delivery
    handle
        .relay_message("a".to_string(), "anyone there?".to_string())
        .await
        .unwrap();
    let _ = handle.state().await.unwrap();
    assert!(a.events.try_recv().is_err());

    handle.cancel();
}
