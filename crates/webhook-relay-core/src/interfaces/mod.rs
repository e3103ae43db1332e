// crates/webhook-relay-core/src/interfaces/mod.rs
// ============================================================================
// Module: Webhook Relay Interfaces
// Description: Backend-agnostic interfaces for storage, forwarding, and brokers.
// Purpose: Define the contract surfaces consumed by the relay runtime.
// Dependencies: async-trait, crate::core, serde, thiserror
// ============================================================================

//! ## Overview
//! Interfaces define how the relay integrates with its collaborators without
//! embedding backend-specific details: the persistent enrollment registry,
//! the webhook forwarder, and the broker transport. The consumer runtime
//! drives these traits and never sees a concrete client.
//!
//! Security posture: interface implementations consume untrusted inputs
//! (queue names, URLs, message bodies) and must bound their own I/O.

// ============================================================================
// SECTION: Imports
// ============================================================================

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::Enrollment;
use crate::core::NewEnrollment;
use crate::core::identifiers::EnrollmentId;

// ============================================================================
// SECTION: Enrollment Store
// ============================================================================

/// Enrollment store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// I/O failure against the backing store.
    #[error("store io error: {0}")]
    Io(String),
    /// Query or statement failure against the in-memory table.
    #[error("store query error: {0}")]
    Query(String),
    /// Stored row could not be decoded.
    #[error("store corrupt row: {0}")]
    Corrupt(String),
}

/// Persistent registry of enrollments.
///
/// # Invariants
/// - `id` is unique across the registry; upserts replace by id.
/// - `delete` is idempotent; deleting an absent id succeeds.
/// - `list_all` ordering is unspecified; callers must not depend on it.
pub trait EnrollmentStore: Send + Sync {
    /// Upserts an enrollment by id and returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the mutation fails.
    fn insert_or_replace(&self, enrollment: &NewEnrollment) -> Result<Enrollment, StoreError>;

    /// Removes the enrollment with the given id if present.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the mutation fails.
    fn delete(&self, id: &EnrollmentId) -> Result<(), StoreError>;

    /// Returns every stored enrollment.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the query fails.
    fn list_all(&self) -> Result<Vec<Enrollment>, StoreError>;
}

// ============================================================================
// SECTION: Forwarder
// ============================================================================

/// Forwarder errors, distinct from non-2xx HTTP responses.
///
/// A non-2xx status is a successful forward with a failing outcome and is
/// returned as `Ok(status)`; these variants cover the cases where no status
/// was obtained at all.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// Transport-level failure (connect, DNS, TLS, protocol).
    #[error("forward transport error: {0}")]
    Transport(String),
    /// The bounded forward timeout elapsed before a response arrived.
    #[error("forward timed out: {0}")]
    Timeout(String),
}

/// Capability that performs the webhook call for a received message.
#[async_trait]
pub trait Forwarder: Send + Sync {
    /// Posts the payload to the target URL and returns the HTTP status code.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError`] when no HTTP status could be obtained.
    async fn forward(&self, target_url: &str, payload: &Value) -> Result<u16, ForwardError>;
}

// ============================================================================
// SECTION: Broker Capability
// ============================================================================

/// Broker capability errors.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Connection to the broker could not be established.
    #[error("broker connect error: {0}")]
    Connect(String),
    /// Receiver could not be opened on the connection.
    #[error("broker receiver error: {0}")]
    Receiver(String),
    /// Receiving the next message failed.
    #[error("broker receive error: {0}")]
    Receive(String),
    /// Applying a disposition to a delivery failed.
    #[error("broker settle error: {0}")]
    Settle(String),
}

/// Disposition command applied to a received delivery.
///
/// # Invariants
/// - Exactly one disposition is applied per delivery; [`Delivery::settle`]
///   consumes the delivery to enforce this.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Disposition {
    /// The message is durably consumed; the broker deletes it.
    Accept,
    /// The delivery failed but is not undeliverable; the broker redelivers it
    /// to this or another consumer rather than discarding it.
    RejectForRedelivery,
}

impl std::fmt::Display for Disposition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Accept => write!(f, "accept"),
            Self::RejectForRedelivery => write!(f, "reject_for_redelivery"),
        }
    }
}

/// A single received message awaiting disposition.
#[async_trait]
pub trait Delivery: Send {
    /// Returns the raw message body.
    fn body(&self) -> &[u8];

    /// Applies the disposition, consuming the delivery.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the broker rejects the settlement.
    async fn settle(self: Box<Self>, disposition: Disposition) -> Result<(), BrokerError>;
}

/// Message stream bound to one queue on one connection.
#[async_trait]
pub trait BrokerReceiver: Send {
    /// Awaits the next delivery; `Ok(None)` means the broker closed the stream.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when receiving fails.
    async fn receive(&mut self) -> Result<Option<Box<dyn Delivery>>, BrokerError>;
}

/// A live connection to the broker, owned exclusively by one consumer.
#[async_trait]
pub trait BrokerConnection: Send + Sync {
    /// Opens a receiver bound to the named queue.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the receiver cannot be opened.
    async fn open_receiver(&self, queue: &str) -> Result<Box<dyn BrokerReceiver>, BrokerError>;

    /// Closes the connection; receivers opened on it stop yielding messages.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the close handshake fails.
    async fn close(&self) -> Result<(), BrokerError>;
}

/// Factory for broker connections.
#[async_trait]
pub trait BrokerConnector: Send + Sync {
    /// Establishes a new connection to the broker at `url`.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError`] when the connection cannot be established.
    async fn connect(&self, url: &str) -> Result<Box<dyn BrokerConnection>, BrokerError>;
}
