//! `MatchCoordinator` - the connection-lifecycle state machine.
//!
//! A single actor owns all matching state (session registry, waiting queue,
//! pairing table, connected counter, relay sinks) and is its only mutator.
//! Transport events for different connections may arrive concurrently; they
//! are serialized through the actor mailbox, so every observer sees either
//! "fully matched" or "fully unmatched", never a half-paired table.
//!
//! # Lifecycle per connection
//!
//! Idle (connected, not joined) → Waiting (queued) → Matched (has partner)
//! → back to Idle on partner loss (not re-queued; a new join is required to
//! re-enter matching) → removed on disconnect.
//!
//! No handler awaits while the state is mid-transition: outbound emission is
//! non-blocking, so a slow socket cannot stall the state machine.

use crate::errors::MatchError;
use crate::relay::Relay;
use crate::state::{PairingTable, SessionRegistry, SessionState, WaitingQueue};

use super::messages::{CoordinatorMessage, CoordinatorState, OutboundEvent};

use metrics::{counter, gauge};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument};

/// Default channel buffer size for the coordinator mailbox.
pub const COORDINATOR_CHANNEL_BUFFER: usize = 1024;

/// Handle to the `MatchCoordinator` actor.
///
/// This is the public interface for the transport collaborator. All state
/// mutation goes through the mailbox behind this handle.
#[derive(Clone)]
pub struct MatchCoordinatorHandle {
    sender: mpsc::Sender<CoordinatorMessage>,
    cancel_token: CancellationToken,
}

impl MatchCoordinatorHandle {
    /// Spawn the coordinator actor and return a handle to it.
    #[must_use]
    pub fn new(mailbox_buffer: usize) -> Self {
        let (sender, receiver) = mpsc::channel(mailbox_buffer);
        let cancel_token = CancellationToken::new();

        let actor = MatchCoordinator {
            receiver,
            cancel_token: cancel_token.clone(),
            registry: SessionRegistry::new(),
            queue: WaitingQueue::new(),
            pairs: PairingTable::new(),
            relay: Relay::new(),
            connected: 0,
            messages_processed: 0,
        };

        tokio::spawn(actor.run());

        Self {
            sender,
            cancel_token,
        }
    }

    /// Register a new transport connection and its outbound sink.
    ///
    /// Increments the connected-user counter and broadcasts the new count to
    /// every connection, including this one.
    pub async fn connect(
        &self,
        connection_id: String,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Connect {
                connection_id,
                outbound,
                respond_to: tx,
            })
            .await
            .map_err(|e| MatchError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| MatchError::Internal(format!("response receive failed: {e}")))?
    }

    /// Ask to be matched, carrying the display name.
    ///
    /// Pairs with the earliest-waiting connection if one exists, otherwise
    /// enqueues. Blank usernames are rejected with no state change.
    pub async fn join(&self, connection_id: String, username: String) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Join {
                connection_id,
                username,
                respond_to: tx,
            })
            .await
            .map_err(|e| MatchError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| MatchError::Internal(format!("response receive failed: {e}")))?
    }

    /// Relay chat text to the sender's current partner.
    ///
    /// Fire-and-forget: if the partner vanished in flight the message is
    /// silently dropped (best-effort at-most-once).
    pub async fn relay_message(
        &self,
        connection_id: String,
        text: String,
    ) -> Result<(), MatchError> {
        self.sender
            .send(CoordinatorMessage::Relay {
                connection_id,
                text,
            })
            .await
            .map_err(|e| MatchError::Internal(format!("channel send failed: {e}")))
    }

    /// Handle a transport disconnect. Idempotent.
    pub async fn disconnect(&self, connection_id: String) -> Result<(), MatchError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::Disconnect {
                connection_id,
                respond_to: tx,
            })
            .await
            .map_err(|e| MatchError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| MatchError::Internal(format!("response receive failed: {e}")))
    }

    /// Get a snapshot of coordinator state.
    pub async fn state(&self) -> Result<CoordinatorState, MatchError> {
        let (tx, rx) = oneshot::channel();
        self.sender
            .send(CoordinatorMessage::GetState { respond_to: tx })
            .await
            .map_err(|e| MatchError::Internal(format!("channel send failed: {e}")))?;

        rx.await
            .map_err(|e| MatchError::Internal(format!("response receive failed: {e}")))
    }

    /// Cancel the coordinator actor.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }

    /// Check if the actor is cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }

    /// Get a child token for dependent tasks (transport, servers).
    #[must_use]
    pub fn child_token(&self) -> CancellationToken {
        self.cancel_token.child_token()
    }
}

/// The `MatchCoordinator` actor implementation.
struct MatchCoordinator {
    /// Message receiver.
    receiver: mpsc::Receiver<CoordinatorMessage>,
    /// Cancellation token (root).
    cancel_token: CancellationToken,
    /// Identity and lifecycle state per connection.
    registry: SessionRegistry,
    /// FIFO of connections seeking a partner.
    queue: WaitingQueue,
    /// Symmetric map of matched connections.
    pairs: PairingTable,
    /// Outbound sinks, one per live connection.
    relay: Relay,
    /// Count of currently connected connections. Incremented only on
    /// connect, decremented only on the first disconnect of an id.
    connected: usize,
    /// Total mailbox messages processed.
    messages_processed: u64,
}

impl MatchCoordinator {
    /// Run the actor message loop.
    #[instrument(skip_all, name = "match.coordinator")]
    async fn run(mut self) {
        info!(target: "match.coordinator", "MatchCoordinator started");

        loop {
            tokio::select! {
                () = self.cancel_token.cancelled() => {
                    info!(
                        target: "match.coordinator",
                        connected = self.connected,
                        "MatchCoordinator received cancellation signal"
                    );
                    break;
                }

                msg = self.receiver.recv() => {
                    match msg {
                        Some(message) => {
                            self.handle_message(message);
                            self.messages_processed += 1;
                        }
                        None => {
                            info!(
                                target: "match.coordinator",
                                "MatchCoordinator channel closed, exiting"
                            );
                            break;
                        }
                    }
                }
            }
        }

        info!(
            target: "match.coordinator",
            connected = self.connected,
            messages_processed = self.messages_processed,
            "MatchCoordinator stopped"
        );
    }

    /// Handle a single message.
    fn handle_message(&mut self, message: CoordinatorMessage) {
        match message {
            CoordinatorMessage::Connect {
                connection_id,
                outbound,
                respond_to,
            } => {
                let result = self.handle_connect(&connection_id, outbound);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::Join {
                connection_id,
                username,
                respond_to,
            } => {
                let result = self.handle_join(&connection_id, &username);
                let _ = respond_to.send(result);
            }

            CoordinatorMessage::Relay {
                connection_id,
                text,
            } => {
                self.handle_relay(&connection_id, text);
            }

            CoordinatorMessage::Disconnect {
                connection_id,
                respond_to,
            } => {
                self.handle_disconnect(&connection_id);
                let _ = respond_to.send(());
            }

            CoordinatorMessage::GetState { respond_to } => {
                let _ = respond_to.send(CoordinatorState {
                    connected_count: self.connected,
                    waiting: self.queue.snapshot(),
                    pairings: self.pairs.entries(),
                });
            }
        }
    }

    /// Handle a new transport connection.
    fn handle_connect(
        &mut self,
        connection_id: &str,
        outbound: mpsc::Sender<OutboundEvent>,
    ) -> Result<(), MatchError> {
        self.registry.register(connection_id)?;
        self.relay.attach(connection_id, outbound);
        self.connected += 1;
        self.relay.broadcast_user_count(self.connected);
        self.update_gauges();

        info!(
            target: "match.coordinator",
            connection_id = %connection_id,
            connected = self.connected,
            "Connection registered"
        );
        Ok(())
    }

    /// Handle a join: match against the queue head or start waiting.
    fn handle_join(&mut self, connection_id: &str, username: &str) -> Result<(), MatchError> {
        let username = username.trim();
        if username.is_empty() {
            return Err(MatchError::InvalidPayload(
                "join requires a non-empty username".to_string(),
            ));
        }

        let state = self
            .registry
            .state_of(connection_id)
            .ok_or_else(|| MatchError::UnknownConnection(connection_id.to_string()))?;
        self.registry.set_name(connection_id, username.to_string())?;

        match state {
            SessionState::Matched => {
                // Duplicate join while paired: ignore, never corrupt the pairing.
                debug!(
                    target: "match.coordinator",
                    connection_id = %connection_id,
                    "Duplicate join while matched, ignored"
                );
                Ok(())
            }

            SessionState::Waiting => {
                // Waiting implies queued. If the queue somehow lost the entry,
                // restore it; never double-enqueue.
                if !self.queue.contains(connection_id) {
                    self.queue.enqueue(connection_id)?;
                    self.relay.notify(connection_id, OutboundEvent::Waiting);
                    self.update_gauges();
                }
                Ok(())
            }

            SessionState::Idle => {
                if let Some(partner) = self.queue.dequeue_front() {
                    self.pairs.pair(connection_id, &partner)?;
                    self.registry.set_state(connection_id, SessionState::Matched)?;
                    self.registry.set_state(&partner, SessionState::Matched)?;

                    let partner_name = self
                        .registry
                        .name_of(&partner)
                        .unwrap_or_default()
                        .to_string();

                    self.relay.notify(
                        connection_id,
                        OutboundEvent::Matched {
                            partner_username: partner_name,
                        },
                    );
                    self.relay.notify(
                        &partner,
                        OutboundEvent::Matched {
                            partner_username: username.to_string(),
                        },
                    );
                    counter!("match_pairs_total").increment(1);

                    info!(
                        target: "match.coordinator",
                        connection_id = %connection_id,
                        partner_id = %partner,
                        "Connections matched"
                    );
                } else {
                    self.queue.enqueue(connection_id)?;
                    self.registry.set_state(connection_id, SessionState::Waiting)?;
                    self.relay.notify(connection_id, OutboundEvent::Waiting);

                    debug!(
                        target: "match.coordinator",
                        connection_id = %connection_id,
                        queue_len = self.queue.len(),
                        "Connection waiting for a partner"
                    );
                }
                self.update_gauges();
                Ok(())
            }
        }
    }

    /// Relay chat text to the sender's partner, or drop it if none.
    fn handle_relay(&mut self, connection_id: &str, text: String) {
        let Some(partner) = self.pairs.partner_of(connection_id).cloned() else {
            // Partner disconnected while the message was in flight: accepted
            // best-effort loss, no error surfaced to the sender.
            debug!(
                target: "match.coordinator",
                connection_id = %connection_id,
                "Message from unpaired connection, dropped"
            );
            counter!("match_messages_dropped_total").increment(1);
            return;
        };

        let sender_name = self
            .registry
            .name_of(connection_id)
            .unwrap_or_default()
            .to_string();
        self.relay.deliver(connection_id, &partner, text, sender_name);
    }

    /// Handle a transport disconnect.
    ///
    /// A connection is in at most one of {waiting, paired}, so only one of
    /// the queue removal and the unpair does real work, but both are
    /// attempted because the coordinator has no faster way to know which.
    fn handle_disconnect(&mut self, connection_id: &str) {
        if !self.registry.contains(connection_id) {
            // Duplicate disconnect: expected race, must not touch the counter.
            debug!(
                target: "match.coordinator",
                connection_id = %connection_id,
                "Disconnect for unknown connection, ignored"
            );
            return;
        }

        self.relay.detach(connection_id);
        self.connected = self.connected.saturating_sub(1);
        self.relay.broadcast_user_count(self.connected);

        self.queue.remove(connection_id);

        if let Some(partner) = self.pairs.unpair(connection_id) {
            // The survivor goes back to Idle. It is NOT re-queued: it must
            // send a new join to re-enter matching.
            if let Err(e) = self.registry.set_state(&partner, SessionState::Idle) {
                error!(
                    target: "match.coordinator",
                    partner_id = %partner,
                    error = %e,
                    "Surviving partner missing from registry"
                );
            }
            self.relay.notify(&partner, OutboundEvent::PartnerDisconnected);

            info!(
                target: "match.coordinator",
                connection_id = %connection_id,
                partner_id = %partner,
                "Pairing dissolved by disconnect"
            );
        }

        self.registry.remove(connection_id);
        self.update_gauges();

        info!(
            target: "match.coordinator",
            connection_id = %connection_id,
            connected = self.connected,
            "Connection removed"
        );
    }

    /// Refresh the observable gauges after a state transition.
    fn update_gauges(&self) {
        #[allow(clippy::cast_precision_loss)]
        {
            gauge!("match_connected_users").set(self.connected as f64);
            gauge!("match_waiting_users").set(self.queue.len() as f64);
            gauge!("match_pairs_active").set(self.pairs.pair_count() as f64);
        }
    }
}
