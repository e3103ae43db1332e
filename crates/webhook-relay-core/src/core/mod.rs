// crates/webhook-relay-core/src/core/mod.rs
// ============================================================================
// Module: Webhook Relay Core Types
// Description: Canonical enrollment records and identifiers.
// Purpose: Provide stable, serializable types for the enrollment registry.
// Dependencies: serde, time, uuid
// ============================================================================

//! ## Overview
//! Core types define the enrollment record persisted by the registry and
//! echoed over the HTTP control surface. These types are the canonical source
//! of truth for any derived API surfaces.

// ============================================================================
// SECTION: Submodules
// ============================================================================

pub mod enrollment;
pub mod identifiers;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use enrollment::Enrollment;
pub use enrollment::NewEnrollment;
pub use enrollment::SubscriptionArgs;
pub use identifiers::EnrollmentId;
