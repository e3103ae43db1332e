// crates/webhook-relay-config/src/lib.rs
// ============================================================================
// Module: Webhook Relay Config Library
// Description: Canonical config model, layering, and validation.
// Purpose: Single source of truth for webhook-relay.toml semantics.
// Dependencies: serde, toml
// ============================================================================

//! ## Overview
//! `webhook-relay-config` defines the canonical configuration model for the
//! relay. Values are layered as environment variable over config file over
//! built-in default, and validation is strict and fail-closed: an invalid
//! value anywhere in the chain is an error, never silently ignored.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;
pub mod examples;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::*;
pub use examples::config_toml_example;
