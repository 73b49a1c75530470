//! `Relay` - outbound event routing to transport sinks.
//!
//! The relay owns one bounded sink per live connection, handed over by the
//! transport on connect. It forwards chat text to the partner's sink and
//! emits the lifecycle notifications the coordinator asks for. Delivery is
//! best-effort at-most-once: all sends are non-blocking, and a full or closed
//! sink drops the event rather than stalling the state machine.

use crate::actors::messages::OutboundEvent;

use metrics::counter;
use std::collections::HashMap;
use tokio::sync::mpsc;
use tracing::debug;

/// Routes outbound events to per-connection transport sinks.
#[derive(Debug, Default)]
pub struct Relay {
    sinks: HashMap<String, mpsc::Sender<OutboundEvent>>,
}

impl Relay {
    /// Create a relay with no attached sinks.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the outbound sink for a connection.
    pub fn attach(&mut self, id: &str, sender: mpsc::Sender<OutboundEvent>) {
        self.sinks.insert(id.to_string(), sender);
    }

    /// Detach the outbound sink for a connection. No-op if absent.
    pub fn detach(&mut self, id: &str) {
        self.sinks.remove(id);
    }

    /// Deliver chat text from one connection to its partner only.
    ///
    /// Pure forwarding: no buffering, no history, no fan-out.
    pub fn deliver(&self, from: &str, to: &str, text: String, sender_name: String) {
        debug!(
            target: "match.relay",
            from = %from,
            to = %to,
            text_len = text.len(),
            "Relaying message to partner"
        );
        self.notify(
            to,
            OutboundEvent::Message {
                text,
                sender_username: sender_name,
            },
        );
        counter!("match_messages_relayed_total").increment(1);
    }

    /// Send a single event to a single connection.
    pub fn notify(&self, id: &str, event: OutboundEvent) {
        let Some(sink) = self.sinks.get(id) else {
            // Connection vanished between the coordinator's lookup and this
            // send: expected race, resolved by dropping the event.
            debug!(target: "match.relay", connection_id = %id, "No sink for connection, event dropped");
            counter!("match_events_dropped_total").increment(1);
            return;
        };

        if let Err(e) = sink.try_send(event) {
            debug!(
                target: "match.relay",
                connection_id = %id,
                error = %e,
                "Outbound sink full or closed, event dropped"
            );
            counter!("match_events_dropped_total").increment(1);
        }
    }

    /// Broadcast the connected-user count to every attached connection.
    pub fn broadcast_user_count(&self, count: usize) {
        for (id, sink) in &self.sinks {
            if sink.try_send(OutboundEvent::UserCount { count }).is_err() {
                debug!(
                    target: "match.relay",
                    connection_id = %id,
                    "Outbound sink full or closed, user count dropped"
                );
                counter!("match_events_dropped_total").increment(1);
            }
        }
    }

    /// Number of attached sinks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    /// Whether no sinks are attached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_notify_reaches_attached_sink() {
        let mut relay = Relay::new();
        let (tx, mut rx) = mpsc::channel(8);
        relay.attach("c1", tx);

        relay.notify("c1", OutboundEvent::Waiting);
        assert_eq!(rx.recv().await, Some(OutboundEvent::Waiting));
    }

    #[tokio::test]
    async fn test_deliver_reaches_partner_only() {
        let mut relay = Relay::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        relay.attach("c1", tx1);
        relay.attach("c2", tx2);

        relay.deliver("c1", "c2", "hi".to_string(), "alice".to_string());

        assert_eq!(
            rx2.recv().await,
            Some(OutboundEvent::Message {
                text: "hi".to_string(),
                sender_username: "alice".to_string(),
            })
        );
        assert!(rx1.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_detach_stops_delivery() {
        let mut relay = Relay::new();
        let (tx, mut rx) = mpsc::channel(8);
        relay.attach("c1", tx);
        relay.detach("c1");

        relay.notify("c1", OutboundEvent::PartnerDisconnected);
        assert!(rx.try_recv().is_err());
        assert!(relay.is_empty());
    }

    #[tokio::test]
    async fn test_broadcast_reaches_all_sinks() {
        let mut relay = Relay::new();
        let (tx1, mut rx1) = mpsc::channel(8);
        let (tx2, mut rx2) = mpsc::channel(8);
        relay.attach("c1", tx1);
        relay.attach("c2", tx2);

        relay.broadcast_user_count(2);

        assert_eq!(rx1.recv().await, Some(OutboundEvent::UserCount { count: 2 }));
        assert_eq!(rx2.recv().await, Some(OutboundEvent::UserCount { count: 2 }));
    }

    #[tokio::test]
    async fn test_full_sink_drops_event_without_blocking() {
        let mut relay = Relay::new();
        let (tx, mut rx) = mpsc::channel(1);
        relay.attach("c1", tx);

        relay.notify("c1", OutboundEvent::Waiting);
        relay.notify("c1", OutboundEvent::PartnerDisconnected); // dropped, buffer full

        assert_eq!(rx.recv().await, Some(OutboundEvent::Waiting));
        assert!(rx.try_recv().is_err());
    }
}
