// system-tests/tests/suites/smoke.rs
// ============================================================================
// Module: Smoke Tests
// Description: End-to-end relay round trips over live sockets.
// Purpose: Validate enroll, deliver, and delete against a real relay process.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! End-to-end relay round trips over live sockets.
//! Purpose: Validate enroll, deliver, and delete against a real relay process.
//! Invariants:
//! - System-test execution is deterministic and fail-closed.
//! - Every external wait is bounded by the configured window.

use serde_json::Value;
use serde_json::json;
use tempfile::TempDir;
use webhook_relay_broker::MemoryBroker;

use helpers::harness::allocate_bind_addr;
use helpers::harness::delivery_wait;
use helpers::harness::enroll;
use helpers::harness::relay_config;
use helpers::harness::spawn_relay;
use helpers::harness::wait_until;
use helpers::webhook_stub::WebhookStub;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn relay_round_trip() -> Result<(), Box<dyn std::error::Error>> {
    let wait = delivery_wait()?;
    let dir = TempDir::new()?;
    let broker = MemoryBroker::new();
    let relay = spawn_relay(
        relay_config(&dir.path().join("registry.sqlite"), allocate_bind_addr()?),
        &broker,
    )
    .await?;
    let client = reqwest::Client::new();
    let mut stub = WebhookStub::scripted(&[200], wait)?;

    let created = enroll(&client, &relay, "orders", stub.url()).await?;
    let id = created["id"].as_str().ok_or("created enrollment has no id")?.to_owned();

    broker.publish("orders", br#"{"order": 7, "total": "18.50"}"#.to_vec());

    let received: Value = serde_json::from_str(&stub.next_body(wait).await?)?;
    assert_eq!(received, json!({"order": 7, "total": "18.50"}));
    stub.finish().await?;

    assert!(
        wait_until(|| broker.queue_len("orders") == 0, wait).await,
        "accepted delivery should leave the queue empty"
    );

    let response = client.delete(relay.url(&format!("/enroll/{id}"))).send().await?;
    assert_eq!(response.status().as_u16(), 200);
    let body: Value = response.json().await?;
    assert_eq!(body["message"], json!(format!("Enrollment {id} deleted")));

    relay.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn enrollments_consume_their_own_queues() -> Result<(), Box<dyn std::error::Error>> {
    let wait = delivery_wait()?;
    let dir = TempDir::new()?;
    let broker = MemoryBroker::new();
    let relay = spawn_relay(
        relay_config(&dir.path().join("registry.sqlite"), allocate_bind_addr()?),
        &broker,
    )
    .await?;
    let client = reqwest::Client::new();
    let mut orders_stub = WebhookStub::scripted(&[200], wait)?;
    let mut billing_stub = WebhookStub::scripted(&[200], wait)?;

    enroll(&client, &relay, "orders", orders_stub.url()).await?;
    enroll(&client, &relay, "billing", billing_stub.url()).await?;

    broker.publish("orders", br#"{"kind": "order"}"#.to_vec());
    broker.publish("billing", br#"{"kind": "invoice"}"#.to_vec());

    let order: Value = serde_json::from_str(&orders_stub.next_body(wait).await?)?;
    let invoice: Value = serde_json::from_str(&billing_stub.next_body(wait).await?)?;
    assert_eq!(order, json!({"kind": "order"}));
    assert_eq!(invoice, json!({"kind": "invoice"}));

    orders_stub.finish().await?;
    billing_stub.finish().await?;
    relay.shutdown().await?;
    Ok(())
}
