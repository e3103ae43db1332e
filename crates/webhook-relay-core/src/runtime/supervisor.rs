// crates/webhook-relay-core/src/runtime/supervisor.rs
// ============================================================================
// Module: Webhook Relay Supervisor
// Description: Registry of running consumers keyed by enrollment id.
// Purpose: Start, track, and stop exactly one consumer per enrollment.
// Dependencies: crate::{core, interfaces, runtime::consumer}, tokio, tracing
// ============================================================================

//! ## Overview
//! The supervisor owns the id-to-consumer map. It starts a consumer when an
//! enrollment is created, stops and removes it on deletion, and at boot
//! starts one consumer per persisted enrollment. The map lives behind a
//! single async mutex held across stop waits, which serializes concurrent
//! start/stop races on the same id.
//!
//! # Invariants
//! - At most one live consumer per enrollment id at any time.
//! - Starting a consumer for an id that already has one stops the existing
//!   one first (idempotent restart).
//! - Stopping an id with no consumer is a no-op, not an error.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::Mutex;
use tokio::sync::watch;
use tracing::debug;
use tracing::info;

use crate::core::Enrollment;
use crate::core::identifiers::EnrollmentId;
use crate::interfaces::BrokerConnector;
use crate::interfaces::Forwarder;
use crate::runtime::consumer::Consumer;
use crate::runtime::consumer::ConsumerHandle;
use crate::runtime::consumer::ConsumerState;

// ============================================================================
// SECTION: Supervisor Registry
// ============================================================================

/// Registry of running consumers, one per enrollment.
///
/// Explicitly constructed and explicitly scoped; there is no ambient global
/// state. Every component that needs start/stop access receives a reference.
pub struct SupervisorRegistry {
    /// Broker URL every consumer connects to.
    broker_url: String,
    /// Capability used by consumers to open broker connections.
    connector: Arc<dyn BrokerConnector>,
    /// Capability used by consumers to perform webhook calls.
    forwarder: Arc<dyn Forwarder>,
    /// Running consumers keyed by enrollment id.
    consumers: Mutex<HashMap<EnrollmentId, ConsumerHandle>>,
}

impl SupervisorRegistry {
    /// Creates a supervisor with injected broker and forwarder capabilities.
    #[must_use]
    pub fn new(
        broker_url: impl Into<String>,
        connector: Arc<dyn BrokerConnector>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Self {
        Self {
            broker_url: broker_url.into(),
            connector,
            forwarder,
            consumers: Mutex::new(HashMap::new()),
        }
    }

    /// Starts a consumer for the enrollment, replacing any existing one.
    ///
    /// An existing consumer for the same id is fully stopped before the new
    /// one spawns. Returns a state probe for the new consumer.
    pub async fn start_for_enrollment(
        &self,
        enrollment: &Enrollment,
    ) -> watch::Receiver<ConsumerState> {
        let mut consumers = self.consumers.lock().await;
        if let Some(existing) = consumers.remove(&enrollment.id) {
            info!(
                enrollment_id = %enrollment.id,
                "restarting consumer; stopping previous instance"
            );
            existing.stop().await;
        }
        let consumer = Consumer::new(
            enrollment.clone(),
            self.broker_url.clone(),
            Arc::clone(&self.connector),
            Arc::clone(&self.forwarder),
        );
        let handle = consumer.spawn();
        let probe = handle.state_probe();
        info!(enrollment_id = %enrollment.id, queue = %enrollment.queue, "consumer started");
        consumers.insert(enrollment.id.clone(), handle);
        probe
    }

    /// Stops and removes the consumer for the id, if one is running.
    pub async fn stop_for_enrollment(&self, id: &EnrollmentId) {
        let mut consumers = self.consumers.lock().await;
        match consumers.remove(id) {
            Some(handle) => {
                info!(enrollment_id = %id, "stopping consumer");
                handle.stop().await;
            }
            None => {
                debug!(enrollment_id = %id, "no active consumer for enrollment");
            }
        }
    }

    /// Starts one consumer per persisted enrollment at process boot.
    ///
    /// Returns the number of consumers started.
    pub async fn bootstrap(&self, enrollments: &[Enrollment]) -> usize {
        for enrollment in enrollments {
            self.start_for_enrollment(enrollment).await;
        }
        info!(count = enrollments.len(), "bootstrapped consumers from registry");
        enrollments.len()
    }

    /// Stops every running consumer; used during graceful shutdown.
    pub async fn shutdown(&self) {
        let drained: Vec<(EnrollmentId, ConsumerHandle)> = {
            let mut consumers = self.consumers.lock().await;
            consumers.drain().collect()
        };
        let count = drained.len();
        for (_, handle) in drained {
            handle.stop().await;
        }
        info!(count, "supervisor shut down");
    }

    /// Returns whether a consumer is registered for the id.
    pub async fn contains(&self, id: &EnrollmentId) -> bool {
        self.consumers.lock().await.contains_key(id)
    }

    /// Returns the number of registered consumers.
    pub async fn active_count(&self) -> usize {
        self.consumers.lock().await.len()
    }

    /// Returns the lifecycle state of the consumer for the id, if any.
    pub async fn state_of(&self, id: &EnrollmentId) -> Option<ConsumerState> {
        self.consumers.lock().await.get(id).map(ConsumerHandle::state)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
