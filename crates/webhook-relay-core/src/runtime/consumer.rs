// crates/webhook-relay-core/src/runtime/consumer.rs
// ============================================================================
// Module: Webhook Relay Consumer
// Description: Per-enrollment receive/forward/disposition loop.
// Purpose: Own one broker connection and apply the disposition law per message.
// Dependencies: crate::{core, interfaces}, serde_json, tokio, tracing
// ============================================================================

//! ## Overview
//! A consumer owns exactly one broker connection and one receiver for one
//! enrollment. It processes one message at a time: decode the body, forward
//! it to the enrollment's target URL, and settle the delivery with `Accept`
//! for a 2xx outcome or `RejectForRedelivery` for everything else. There is
//! no local retry, backoff, or de-duplication; the relay provides
//! at-least-once delivery and leaves redelivery to the broker.
//!
//! A consumer that loses its connection stops; it never self-restarts.
//! Recovery is an explicit supervisor restart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;
use tracing::error;
use tracing::info;
use tracing::warn;

use crate::core::Enrollment;
use crate::core::identifiers::EnrollmentId;
use crate::interfaces::BrokerConnector;
use crate::interfaces::Delivery;
use crate::interfaces::Disposition;
use crate::interfaces::ForwardError;
use crate::interfaces::Forwarder;

// ============================================================================
// SECTION: Consumer State
// ============================================================================

/// Lifecycle states of a consumer.
///
/// # Invariants
/// - Transitions are strictly forward: `Created → Connecting → Receiving →
///   Stopped`, with connection failures skipping straight to `Stopped`.
/// - `Stopped` is terminal; a restart creates a new consumer instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerState {
    /// Constructed but not yet connecting.
    Created,
    /// Establishing the broker connection and receiver.
    Connecting,
    /// Steady state; messages arrive and are dispositioned.
    Receiving,
    /// Terminal state; no further messages are dispatched.
    Stopped,
}

// ============================================================================
// SECTION: Consumer
// ============================================================================

/// Per-enrollment consumer driving the disposition loop.
///
/// Construct with [`Consumer::new`] and launch with [`Consumer::spawn`]; the
/// returned [`ConsumerHandle`] is the only way to stop or observe the task.
pub struct Consumer {
    /// The owning enrollment's immutable fields.
    enrollment: Enrollment,
    /// Broker URL the connection is opened against.
    broker_url: String,
    /// Capability used to establish the broker connection.
    connector: Arc<dyn BrokerConnector>,
    /// Capability used to perform the webhook call.
    forwarder: Arc<dyn Forwarder>,
}

impl Consumer {
    /// Creates a consumer for one enrollment.
    #[must_use]
    pub fn new(
        enrollment: Enrollment,
        broker_url: impl Into<String>,
        connector: Arc<dyn BrokerConnector>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            enrollment,
            broker_url: broker_url.into(),
            connector,
            forwarder,
        }
    }

    /// Spawns the consumer onto the current runtime and returns its handle.
    #[must_use]
    pub fn spawn(self) -> ConsumerHandle {
        let (state_tx, state_rx) = watch::channel(ConsumerState::Created);
        let (stop_tx, stop_rx) = watch::channel(false);
        let enrollment_id = self.enrollment.id.clone();
        let task = tokio::spawn(self.run(state_tx, stop_rx));
        ConsumerHandle {
            enrollment_id,
            stop_tx,
            state_rx,
            task,
        }
    }

    /// Runs the connect/receive/disposition loop until stopped or failed.
    async fn run(self, state_tx: watch::Sender<ConsumerState>, mut stop_rx: watch::Receiver<bool>) {
        let enrollment_id = self.enrollment.id.clone();
        state_tx.send_replace(ConsumerState::Connecting);
        info!(
            enrollment_id = %enrollment_id,
            broker_url = %self.broker_url,
            "connecting to broker"
        );
        let connection = match self.connector.connect(&self.broker_url).await {
            Ok(connection) => connection,
            Err(err) => {
                error!(enrollment_id = %enrollment_id, error = %err, "broker connect failed");
                state_tx.send_replace(ConsumerState::Stopped);
                return;
            }
        };
        let mut receiver = match connection.open_receiver(&self.enrollment.queue).await {
            Ok(receiver) => receiver,
            Err(err) => {
                error!(
                    enrollment_id = %enrollment_id,
                    queue = %self.enrollment.queue,
                    error = %err,
                    "opening receiver failed"
                );
                close_connection(&*connection, &enrollment_id).await;
                state_tx.send_replace(ConsumerState::Stopped);
                return;
            }
        };
        state_tx.send_replace(ConsumerState::Receiving);
        info!(
            enrollment_id = %enrollment_id,
            queue = %self.enrollment.queue,
            "receiving messages"
        );

        loop {
            tokio::select! {
                biased;
                _ = stop_rx.changed() => {
                    break;
                }
                delivery = receiver.receive() => match delivery {
                    Ok(Some(delivery)) => {
                        // The in-flight message always completes; stop takes
                        // effect before the next dispatch.
                        self.handle_delivery(delivery).await;
                        if *stop_rx.borrow() {
                            break;
                        }
                    }
                    Ok(None) => {
                        info!(enrollment_id = %enrollment_id, "broker closed the message stream");
                        break;
                    }
                    Err(err) => {
                        error!(enrollment_id = %enrollment_id, error = %err, "receive failed");
                        break;
                    }
                }
            }
        }

        close_connection(&*connection, &enrollment_id).await;
        state_tx.send_replace(ConsumerState::Stopped);
        info!(enrollment_id = %enrollment_id, "consumer stopped");
    }

    /// Forwards one delivery and settles it per the disposition law.
    async fn handle_delivery(&self, delivery: Box<dyn Delivery>) {
        let enrollment_id = &self.enrollment.id;
        let payload = decode_payload(delivery.body());
        let outcome = self.forwarder.forward(&self.enrollment.target_url, &payload).await;
        let disposition = disposition_for(&outcome);
        match &outcome {
            Ok(status) => debug!(
                enrollment_id = %enrollment_id,
                status = %status,
                disposition = %disposition,
                "forward completed"
            ),
            Err(err) => info!(
                enrollment_id = %enrollment_id,
                error = %err,
                "forward failed; message returns to the broker"
            ),
        }
        if let Err(err) = delivery.settle(disposition).await {
            warn!(enrollment_id = %enrollment_id, error = %err, "settling delivery failed");
        }
    }
}

// ============================================================================
// SECTION: Consumer Handle
// ============================================================================

/// Handle to a spawned consumer, owned by the supervisor.
pub struct ConsumerHandle {
    /// Identifier of the enrollment this consumer serves.
    enrollment_id: EnrollmentId,
    /// Stop flag observed by the consumer loop.
    stop_tx: watch::Sender<bool>,
    /// Live view of the consumer's lifecycle state.
    state_rx: watch::Receiver<ConsumerState>,
    /// The consumer task itself.
    task: JoinHandle<()>,
}

impl ConsumerHandle {
    /// Returns the identifier of the enrollment this consumer serves.
    #[must_use]
    pub const fn enrollment_id(&self) -> &EnrollmentId {
        &self.enrollment_id
    }

    /// Returns the consumer's current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ConsumerState {
        *self.state_rx.borrow()
    }

    /// Returns a watch receiver that tracks the consumer's state.
    #[must_use]
    pub fn state_probe(&self) -> watch::Receiver<ConsumerState> {
        self.state_rx.clone()
    }

    /// Requests a stop and waits for the consumer task to finish.
    ///
    /// Safe to call while a message is mid-flight: the in-flight forward
    /// completes and its disposition is applied, then the loop exits.
    /// Stopping an already-stopped consumer is a no-op.
    pub async fn stop(self) {
        let _ = self.stop_tx.send(true);
        if let Err(err) = self.task.await {
            warn!(enrollment_id = %self.enrollment_id, error = %err, "consumer task join failed");
        }
    }
}

// ============================================================================
// SECTION: Disposition Law
// ============================================================================

/// Returns whether a status code counts as a successful forward.
fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

/// Maps a forwarder outcome onto a disposition.
///
/// The decision is entirely a function of the outcome: a 2xx status accepts,
/// every other status and every forwarder-level failure rejects for
/// redelivery.
fn disposition_for(outcome: &Result<u16, ForwardError>) -> Disposition {
    match outcome {
        Ok(status) if is_success_status(*status) => Disposition::Accept,
        Ok(_) | Err(_) => Disposition::RejectForRedelivery,
    }
}

/// Decodes a message body into the forwarded payload.
///
/// Decode failure is not a delivery failure: a body that is not valid JSON
/// is forwarded as a raw string payload, lossily UTF-8 decoded.
fn decode_payload(body: &[u8]) -> Value {
    match serde_json::from_slice::<Value>(body) {
        Ok(value) => value,
        Err(err) => {
            debug!(error = %err, "message body is not json; forwarding raw");
            Value::String(String::from_utf8_lossy(body).into_owned())
        }
    }
}

/// Closes a connection, logging instead of propagating close failures.
async fn close_connection(
    connection: &dyn crate::interfaces::BrokerConnection,
    enrollment_id: &EnrollmentId,
) {
    if let Err(err) = connection.close().await {
        debug!(enrollment_id = %enrollment_id, error = %err, "connection close reported an error");
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
