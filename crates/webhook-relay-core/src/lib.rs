// crates/webhook-relay-core/src/lib.rs
// ============================================================================
// Module: Webhook Relay Core Library
// Description: Public API surface for the webhook relay core.
// Purpose: Expose the enrollment model, capability interfaces, and runtime.
// Dependencies: crate::{core, interfaces, runtime}
// ============================================================================

//! ## Overview
//! Webhook relay core provides the enrollment lifecycle and the
//! message-disposition engine: durable enrollment records, the per-enrollment
//! consumer that maps each forwarding outcome onto an explicit broker
//! disposition, and the supervisor that keeps one consumer running per
//! enrollment. Broker transports, webhook forwarding, and persistence
//! integrate through explicit interfaces rather than concrete clients.
//!
//! Security posture: queue names, target URLs, and message bodies are
//! untrusted inputs; the core passes them through without interpretation.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod core;
pub mod interfaces;
pub mod runtime;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use self::core::*;

pub use interfaces::BrokerConnection;
pub use interfaces::BrokerConnector;
pub use interfaces::BrokerError;
pub use interfaces::BrokerReceiver;
pub use interfaces::Delivery;
pub use interfaces::Disposition;
pub use interfaces::EnrollmentStore;
pub use interfaces::ForwardError;
pub use interfaces::Forwarder;
pub use interfaces::StoreError;
pub use runtime::Consumer;
pub use runtime::ConsumerHandle;
pub use runtime::ConsumerState;
pub use runtime::InMemoryEnrollmentStore;
pub use runtime::SupervisorRegistry;
