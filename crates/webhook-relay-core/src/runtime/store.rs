// crates/webhook-relay-core/src/runtime/store.rs
// ============================================================================
// Module: Webhook Relay In-Memory Store
// Description: Simple in-memory enrollment store for tests and examples.
// Purpose: Provide a deterministic store implementation without external deps.
// Dependencies: crate::core, crate::interfaces
// ============================================================================

//! ## Overview
//! This module provides a simple in-memory implementation of
//! [`EnrollmentStore`] for tests and local demos. It keeps rows in a sorted
//! map and never touches disk; the durable implementation lives in the
//! sqlite store crate.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use time::OffsetDateTime;

use crate::core::Enrollment;
use crate::core::NewEnrollment;
use crate::core::identifiers::EnrollmentId;
use crate::interfaces::EnrollmentStore;
use crate::interfaces::StoreError;

// ============================================================================
// SECTION: In-Memory Store
// ============================================================================

/// In-memory enrollment store for tests and examples.
#[derive(Debug, Default, Clone)]
pub struct InMemoryEnrollmentStore {
    /// Enrollment rows keyed by id, protected by a mutex.
    rows: Arc<Mutex<BTreeMap<String, Enrollment>>>,
}

impl InMemoryEnrollmentStore {
    /// Creates a new empty in-memory enrollment store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: Arc::new(Mutex::new(BTreeMap::new())),
        }
    }
}

impl EnrollmentStore for InMemoryEnrollmentStore {
    fn insert_or_replace(&self, enrollment: &NewEnrollment) -> Result<Enrollment, StoreError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|_| StoreError::Query("enrollment store mutex poisoned".to_string()))?;
        let now = OffsetDateTime::now_utc();
        // Upserts refresh updated_at but keep the original creation time.
        let created_at = guard
            .get(enrollment.id.as_str())
            .map_or(now, |existing| existing.created_at);
        let row = Enrollment {
            id: enrollment.id.clone(),
            queue: enrollment.queue.clone(),
            target_url: enrollment.target_url.clone(),
            subscription_args: enrollment.subscription_args.clone(),
            created_at,
            updated_at: now,
        };
        guard.insert(row.id.as_str().to_string(), row.clone());
        Ok(row)
    }

    fn delete(&self, id: &EnrollmentId) -> Result<(), StoreError> {
        let mut guard = self
            .rows
            .lock()
            .map_err(|_| StoreError::Query("enrollment store mutex poisoned".to_string()))?;
        guard.remove(id.as_str());
        Ok(())
    }

    fn list_all(&self) -> Result<Vec<Enrollment>, StoreError> {
        let guard = self
            .rows
            .lock()
            .map_err(|_| StoreError::Query("enrollment store mutex poisoned".to_string()))?;
        Ok(guard.values().cloned().collect())
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
