// crates/webhook-relay-core/src/runtime/mod.rs
// ============================================================================
// Module: Webhook Relay Runtime
// Description: Per-enrollment consumers and the supervisor that owns them.
// Purpose: Drive the receive/forward/disposition loop for each enrollment.
// Dependencies: crate::{core, interfaces}, tokio, tracing
// ============================================================================

//! ## Overview
//! Runtime modules implement the message-disposition engine: one consumer
//! task per enrollment, each owning its own broker connection, plus the
//! supervisor registry that starts, tracks, and stops consumers as
//! enrollments are created and deleted. Errors never cross enrollment
//! boundaries; a failing consumer stops alone.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod consumer;
pub mod store;
pub mod supervisor;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use consumer::Consumer;
pub use consumer::ConsumerHandle;
pub use consumer::ConsumerState;
pub use store::InMemoryEnrollmentStore;
pub use supervisor::SupervisorRegistry;
