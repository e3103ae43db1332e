// crates/webhook-relay-broker/src/lib.rs
// ============================================================================
// Module: Webhook Relay Broker
// Description: Broker and forwarder capability implementations.
// Purpose: Provide the HTTP webhook forwarder and the in-process broker.
// Dependencies: webhook-relay-core, reqwest, tokio
// ============================================================================

//! ## Overview
//! This crate supplies the two capability implementations the relay core is
//! written against: [`HttpForwarder`] performs the outbound webhook call
//! with a bounded timeout, and [`MemoryBroker`] is a complete in-process
//! broker used by demos and tests. Production broker transports implement
//! the same connector traits in their own crates.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod forward;
pub mod memory;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use forward::HttpForwarder;
pub use memory::MemoryBroker;
pub use memory::MemoryConnector;
