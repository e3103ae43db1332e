// system-tests/tests/helpers/mod.rs
// ============================================================================
// Module: System Test Helpers
// Description: Shared helpers for webhook-relay system-tests.
// Purpose: Provide relay harnesses and webhook endpoint stubs.
// Dependencies: system-tests, webhook-relay-broker, webhook-relay-server
// ============================================================================

//! ## Overview
//! Shared helpers for webhook-relay system-tests.
//! Invariants:
//! - Every wait is bounded; a missing delivery fails the test, never hangs it.
//! - Relays bind loopback-only ephemeral ports so suites can run in parallel.

#![allow(dead_code, reason = "Shared helpers are reused across multiple test suites.")]

pub mod harness;
pub mod webhook_stub;
