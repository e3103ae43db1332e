// crates/webhook-relay-core/src/core/enrollment.rs
// ============================================================================
// Module: Webhook Relay Enrollment Records
// Description: Enrollment record shapes for the registry and control surface.
// Purpose: Provide the stored enrollment record and its insert shape.
// Dependencies: serde, serde_json, time
// ============================================================================

//! ## Overview
//! An enrollment links a source queue on the broker to a target webhook URL.
//! The registry stores one record per enrollment and is the single source of
//! truth for which consumers must be running. `queue` and `target_url` are
//! immutable after creation; updates are modeled as delete + recreate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use time::OffsetDateTime;

use crate::core::identifiers::EnrollmentId;

// ============================================================================
// SECTION: Record Types
// ============================================================================

/// Opaque structured metadata carried by an enrollment.
///
/// Passed through unmodified to the consumer for any capability-specific
/// negotiation; never interpreted by the core.
pub type SubscriptionArgs = serde_json::Map<String, Value>;

/// Stored enrollment record as returned by the registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    /// Unique enrollment identifier, assigned at creation.
    pub id: EnrollmentId,
    /// Source queue name on the broker; immutable after creation.
    pub queue: String,
    /// Destination URL for forwarded payloads; immutable after creation.
    pub target_url: String,
    /// Opaque subscription metadata, passed through to the consumer.
    #[serde(default)]
    pub subscription_args: SubscriptionArgs,
    /// Creation time, set by the registry.
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    /// Last mutation time, refreshed by the registry on upsert.
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Insert shape for a registry upsert.
///
/// The registry assigns `created_at` / `updated_at` and returns the stored
/// [`Enrollment`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEnrollment {
    /// Enrollment identifier; fresh ids come from [`EnrollmentId::generate`].
    pub id: EnrollmentId,
    /// Source queue name on the broker.
    pub queue: String,
    /// Destination URL for forwarded payloads.
    pub target_url: String,
    /// Opaque subscription metadata.
    #[serde(default)]
    pub subscription_args: SubscriptionArgs,
}

impl NewEnrollment {
    /// Creates an insert shape with a freshly generated identifier.
    #[must_use]
    pub fn new(
        queue: impl Into<String>,
        target_url: impl Into<String>,
        subscription_args: SubscriptionArgs,
    ) -> Self {
        Self {
            id: EnrollmentId::generate(),
            queue: queue.into(),
            target_url: target_url.into(),
            subscription_args,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
