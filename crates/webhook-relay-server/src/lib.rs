// crates/webhook-relay-server/src/lib.rs
// ============================================================================
// Module: Webhook Relay Server Library
// Description: HTTP control surface and server assembly for the relay.
// Purpose: Expose the enrollment API and the boot/serve/shutdown lifecycle.
// Dependencies: axum, tokio, webhook-relay-core, webhook-relay-store-sqlite
// ============================================================================

//! ## Overview
//! The server crate wires the durable registry, the consumer supervisor, and
//! the enrollment HTTP API into one process. Boot order is fixed: open the
//! registry (restoring the last snapshot when one exists), start a consumer
//! for every persisted enrollment, then begin accepting HTTP requests.
//! Shutdown reverses it: drain the listener, stop all consumers, then write
//! one final synchronous snapshot.
//!
//! Security posture: enrollment payloads arrive from untrusted HTTP clients
//! and are validated before they reach the registry.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod api;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use api::AppState;
pub use server::BoundServer;
pub use server::RelayServer;
pub use server::ServerError;
