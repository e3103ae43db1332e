// system-tests/src/lib.rs
// ============================================================================
// Module: Webhook Relay System Tests Library
// Description: Shared configuration for system test scenarios.
// Purpose: Provide common utilities for webhook-relay system-test binaries.
// Dependencies: std
// ============================================================================

//! ## Overview
//! This crate hosts shared configuration used by the webhook-relay
//! system-test binaries in `system-tests/tests`. The suites themselves are
//! gated behind the `system-tests` feature so the default workspace test run
//! stays fast.
//!
//! Security posture: environment inputs are untrusted and parsed strictly.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Tests
// ============================================================================
