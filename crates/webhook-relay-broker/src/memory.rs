// crates/webhook-relay-broker/src/memory.rs
// ============================================================================
// Module: In-Process Memory Broker
// Description: Complete broker capability implementation in process memory.
// Purpose: Back demos and tests with real queue-and-redeliver semantics.
// Dependencies: webhook-relay-core, tokio, tracing
// ============================================================================

//! ## Overview
//! [`MemoryBroker`] holds named queues of byte payloads behind one mutex and
//! signals waiting receivers through a [`Notify`]. Receiving removes the
//! message from its queue; settling with `Accept` discards it permanently,
//! settling with `RejectForRedelivery` pushes it back at the queue head. An
//! unsettled in-flight message reappears only through explicit rejection.
//!
//! # Invariants
//! - A message is held by at most one receiver at a time.
//! - Rejection re-enqueues at the head, so redelivery order is preserved.
//! - `receive` on a closed connection yields `Ok(None)`, never an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;

use async_trait::async_trait;
use tokio::sync::Notify;
use tracing::debug;
use webhook_relay_core::BrokerConnection;
use webhook_relay_core::BrokerConnector;
use webhook_relay_core::BrokerError;
use webhook_relay_core::BrokerReceiver;
use webhook_relay_core::Delivery;
use webhook_relay_core::Disposition;

// ============================================================================
// SECTION: Broker State
// ============================================================================

/// Named queues of pending message bodies.
#[derive(Debug, Default)]
struct BrokerState {
    /// Pending messages per queue name, oldest first.
    queues: HashMap<String, VecDeque<Vec<u8>>>,
}

/// Locks the broker state, recovering the map from a poisoned mutex so one
/// panicking holder cannot wedge every other connection.
fn locked(state: &Mutex<BrokerState>) -> MutexGuard<'_, BrokerState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

// ============================================================================
// SECTION: Memory Broker
// ============================================================================

/// In-process broker with named queues and redelivery semantics.
#[derive(Debug, Clone, Default)]
pub struct MemoryBroker {
    /// Queue contents shared with every connector and receiver.
    state: Arc<Mutex<BrokerState>>,
    /// Wakes receivers when a queue gains a message.
    notify: Arc<Notify>,
}

impl MemoryBroker {
    /// Creates an empty broker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a connector bound to this broker's queues.
    #[must_use]
    pub fn connector(&self) -> MemoryConnector {
        MemoryConnector {
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
        }
    }

    /// Enqueues a message body at the tail of the named queue.
    pub fn publish(&self, queue: &str, body: impl Into<Vec<u8>>) {
        locked(&self.state)
            .queues
            .entry(queue.to_string())
            .or_default()
            .push_back(body.into());
        self.notify.notify_waiters();
    }

    /// Returns the number of pending messages in the named queue.
    #[must_use]
    pub fn queue_len(&self, queue: &str) -> usize {
        locked(&self.state).queues.get(queue).map_or(0, VecDeque::len)
    }
}

// ============================================================================
// SECTION: Connector and Connection
// ============================================================================

/// Connector handing out connections to one shared [`MemoryBroker`].
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    /// Queue contents shared with the owning broker.
    state: Arc<Mutex<BrokerState>>,
    /// Wakeup channel shared with the owning broker.
    notify: Arc<Notify>,
}

#[async_trait]
impl BrokerConnector for MemoryConnector {
    async fn connect(&self, url: &str) -> Result<Box<dyn BrokerConnection>, BrokerError> {
        // The in-process broker is address-less; the URL is only recorded.
        debug!(url = %url, "memory broker connection opened");
        Ok(Box::new(MemoryConnection {
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
            closed: Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// One logical connection to the in-process broker.
struct MemoryConnection {
    /// Queue contents shared with the owning broker.
    state: Arc<Mutex<BrokerState>>,
    /// Wakeup channel shared with the owning broker.
    notify: Arc<Notify>,
    /// Set once `close` is called; observed by receivers.
    closed: Arc<AtomicBool>,
}

#[async_trait]
impl BrokerConnection for MemoryConnection {
    async fn open_receiver(&self, queue: &str) -> Result<Box<dyn BrokerReceiver>, BrokerError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(BrokerError::Receiver("connection is closed".to_string()));
        }
        Ok(Box::new(MemoryReceiver {
            queue: queue.to_string(),
            state: Arc::clone(&self.state),
            notify: Arc::clone(&self.notify),
            closed: Arc::clone(&self.closed),
        }))
    }

    async fn close(&self) -> Result<(), BrokerError> {
        self.closed.store(true, Ordering::SeqCst);
        // Pending receives must observe the closed flag.
        self.notify.notify_waiters();
        Ok(())
    }
}

// ============================================================================
// SECTION: Receiver and Delivery
// ============================================================================

/// Receiver bound to one named queue.
struct MemoryReceiver {
    /// Queue this receiver consumes from.
    queue: String,
    /// Queue contents shared with the owning broker.
    state: Arc<Mutex<BrokerState>>,
    /// Wakeup channel shared with the owning broker.
    notify: Arc<Notify>,
    /// Closed flag of the owning connection.
    closed: Arc<AtomicBool>,
}

impl MemoryReceiver {
    /// Removes and returns the next message of this receiver's queue.
    fn pop_next(&self) -> Option<Vec<u8>> {
        locked(&self.state)
            .queues
            .get_mut(&self.queue)
            .and_then(VecDeque::pop_front)
    }
}

#[async_trait]
impl BrokerReceiver for MemoryReceiver {
    async fn receive(&mut self) -> Result<Option<Box<dyn Delivery>>, BrokerError> {
        loop {
            // Register for wakeups before checking state, so a publish or
            // close landing between the check and the await is not lost.
            let mut notified = std::pin::pin!(self.notify.notified());
            let _ = notified.as_mut().enable();
            if self.closed.load(Ordering::SeqCst) {
                return Ok(None);
            }
            if let Some(body) = self.pop_next() {
                return Ok(Some(Box::new(MemoryDelivery {
                    body,
                    queue: self.queue.clone(),
                    state: Arc::clone(&self.state),
                    notify: Arc::clone(&self.notify),
                })));
            }
            notified.await;
        }
    }
}

/// One in-flight message awaiting its disposition.
struct MemoryDelivery {
    /// Raw message body.
    body: Vec<u8>,
    /// Queue the message came from, for redelivery.
    queue: String,
    /// Queue contents shared with the owning broker.
    state: Arc<Mutex<BrokerState>>,
    /// Wakeup channel shared with the owning broker.
    notify: Arc<Notify>,
}

#[async_trait]
impl Delivery for MemoryDelivery {
    fn body(&self) -> &[u8] {
        &self.body
    }

    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), BrokerError> {
        let this = *self;
        match disposition {
            Disposition::Accept => {}
            Disposition::RejectForRedelivery => {
                debug!(queue = %this.queue, "re-enqueuing rejected message at queue head");
                locked(&this.state)
                    .queues
                    .entry(this.queue)
                    .or_default()
                    .push_front(this.body);
                this.notify.notify_waiters();
            }
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
