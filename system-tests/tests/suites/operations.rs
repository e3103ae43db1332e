// system-tests/tests/suites/operations.rs
// ============================================================================
// Module: Operations Tests
// Description: Restart recovery and configuration layering checks.
// Purpose: Validate snapshot-driven resume and file-plus-override config.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Restart recovery and configuration layering checks.
//! Purpose: Validate snapshot-driven resume and file-plus-override config.
//! Invariants:
//! - System-test execution is deterministic and fail-closed.
//! - Every external wait is bounded by the configured window.

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use webhook_relay_broker::MemoryBroker;
use webhook_relay_config::FORWARD_TIMEOUT_ENV_VAR;
use webhook_relay_config::LogLevel;
use webhook_relay_config::RelayConfig;

use helpers::harness::allocate_bind_addr;
use helpers::harness::delivery_wait;
use helpers::harness::enroll;
use helpers::harness::relay_config;
use helpers::harness::spawn_relay;
use helpers::webhook_stub::WebhookStub;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn consumers_resume_delivery_after_restart() -> Result<(), Box<dyn std::error::Error>> {
    let wait = delivery_wait()?;
    let dir = TempDir::new()?;
    let snapshot = dir.path().join("registry.sqlite");
    let broker = MemoryBroker::new();
    let client = reqwest::Client::new();
    let mut stub = WebhookStub::scripted(&[200], wait)?;

    let relay = spawn_relay(relay_config(&snapshot, allocate_bind_addr()?), &broker).await?;
    enroll(&client, &relay, "orders", stub.url()).await?;
    relay.shutdown().await?;

    // Nothing was published while the first relay ran; a delivery below can
    // only come from a consumer restored out of the snapshot.
    let reopened = spawn_relay(relay_config(&snapshot, allocate_bind_addr()?), &broker).await?;
    broker.publish("orders", br#"{"order": 12}"#.to_vec());

    let received: Value = serde_json::from_str(&stub.next_body(wait).await?)?;
    assert_eq!(received, json!({"order": 12}));
    stub.finish().await?;
    reopened.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn config_file_and_overrides_drive_a_live_relay() -> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let snapshot = dir.path().join("registry.sqlite");
    let addr = allocate_bind_addr()?;
    let config_path = dir.path().join("relay.toml");
    let contents = format!(
        r#"
[broker]
url = "mem://system-tests"

[http]
bind = "{bind}"
port = {port}

[registry]
snapshot_path = "{snapshot}"

[forwarder]
timeout_ms = 750

[log]
level = "debug"
"#,
        bind = addr.ip(),
        port = addr.port(),
        snapshot = snapshot.display(),
    );
    std::fs::write(&config_path, contents)?;

    let mut config = RelayConfig::from_file(Some(&config_path))?;
    assert_eq!(config.broker.url, "mem://system-tests");
    assert_eq!(config.http.port, addr.port());
    assert_eq!(config.registry.snapshot_path, snapshot);
    assert_eq!(config.forwarder.timeout_ms, 750);
    assert_eq!(config.log.level, LogLevel::Debug);

    // Override variables outrank the file layer.
    config.apply_overrides(&[(FORWARD_TIMEOUT_ENV_VAR.to_string(), "250".to_string())])?;
    assert_eq!(config.forwarder.timeout_ms, 250);
    config.validate()?;

    let broker = MemoryBroker::new();
    let relay = spawn_relay(config, &broker).await?;
    let listed: Value =
        reqwest::Client::new().get(relay.url("/enrollments")).send().await?.json().await?;
    assert_eq!(listed, json!([]));
    relay.shutdown().await?;
    Ok(())
}
