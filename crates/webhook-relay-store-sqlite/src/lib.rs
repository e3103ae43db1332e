// crates/webhook-relay-store-sqlite/src/lib.rs
// ============================================================================
// Module: SQLite Enrollment Store
// Description: Durable EnrollmentStore backend using SQLite snapshots.
// Purpose: Persist the enrollment registry across relay restarts.
// Dependencies: webhook-relay-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate provides a durable [`EnrollmentStore`] implementation. The
//! authoritative table lives in an in-memory `SQLite` database; every
//! mutation schedules a full snapshot to a disk file via the online backup
//! API, and the disk image is restored at boot when present. A missing or
//! unreadable snapshot is never fatal: the relay starts with an empty
//! registry and logs what happened.
//!
//! [`EnrollmentStore`]: webhook_relay_core::EnrollmentStore

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod store;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use store::SqliteEnrollmentStore;
