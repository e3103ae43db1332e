// crates/webhook-relay-core/src/core/identifiers.rs
// ============================================================================
// Module: Webhook Relay Identifiers
// Description: Canonical opaque identifier for enrollments.
// Purpose: Provide a strongly typed, serializable identifier with a stable wire form.
// Dependencies: serde, uuid
// ============================================================================

//! ## Overview
//! This module defines the enrollment identifier used throughout the relay.
//! Identifiers are opaque strings on the wire; freshly created enrollments
//! receive a UUID v4, but the type accepts any non-interpreted string so the
//! id scheme can change without touching callers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Enrollment identifier, unique across the registry.
///
/// # Invariants
/// - Opaque UTF-8 string; no normalization or validation is applied by this type.
/// - Immutable once assigned at enrollment creation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EnrollmentId(String);

impl EnrollmentId {
    /// Creates an enrollment identifier from an existing string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generates a fresh, previously-unseen identifier.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Returns the identifier as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EnrollmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<&str> for EnrollmentId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for EnrollmentId {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
