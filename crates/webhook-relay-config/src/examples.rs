// crates/webhook-relay-config/src/examples.rs
// ============================================================================
// Module: Config Examples
// Description: Canonical example configuration payload.
// Purpose: Deterministic example for docs and tooling.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Canonical example for relay configuration. The output is deterministic,
//! spells out every key with its default value, and parses back into
//! [`crate::RelayConfig`] unchanged.

/// Returns a canonical example `webhook-relay.toml` configuration.
#[must_use]
pub fn config_toml_example() -> String {
    String::from(
        r#"[broker]
url = "mem://local"

[http]
port = 8080
bind = "127.0.0.1"

[registry]
snapshot_path = "webhook-relay.sqlite"

[forwarder]
timeout_ms = 5000

[log]
level = "info"
"#,
    )
}
