// system-tests/tests/suites/reliability.rs
// ============================================================================
// Module: Reliability Tests
// Description: Redelivery and decode-fallback checks over live sockets.
// Purpose: Validate at-least-once delivery against failing webhook targets.
// Dependencies: system-tests helpers
// ============================================================================

//! ## Overview
//! Redelivery and decode-fallback checks over live sockets.
//! Purpose: Validate at-least-once delivery against failing webhook targets.
//! Invariants:
//! - System-test execution is deterministic and fail-closed.
//! - Every external wait is bounded by the configured window.

use std::time::Duration;

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
use helpers::webhook_stub::unreachable_target;

use crate::helpers;

#[tokio::test(flavor = "multi_thread")]
async fn rejected_delivery_is_redelivered_before_later_messages()
-> Result<(), Box<dyn std::error::Error>> {
    let wait = delivery_wait()?;
    let dir = TempDir::new()?;
    let broker = MemoryBroker::new();
    let relay = spawn_relay(
        relay_config(&dir.path().join("registry.sqlite"), allocate_bind_addr()?),
        &broker,
    )
    .await?;
    let client = reqwest::Client::new();
    let mut stub = WebhookStub::scripted(&[503, 200, 200], wait)?;

    enroll(&client, &relay, "orders", stub.url()).await?;
    broker.publish("orders", br#"{"seq": 1}"#.to_vec());
    broker.publish("orders", br#"{"seq": 2}"#.to_vec());

    let first: Value = serde_json::from_str(&stub.next_body(wait).await?)?;
    let second: Value = serde_json::from_str(&stub.next_body(wait).await?)?;
    let third: Value = serde_json::from_str(&stub.next_body(wait).await?)?;
    assert_eq!(first, json!({"seq": 1}));
    // The rejected message returns to the queue head, so it is delivered
    // again ahead of anything published after it.
    assert_eq!(second, json!({"seq": 1}));
    assert_eq!(third, json!({"seq": 2}));
    stub.finish().await?;

    assert!(
        wait_until(|| broker.queue_len("orders") == 0, wait).await,
        "queue should drain once every delivery is accepted"
    );
    relay.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn undecodable_payload_is_forwarded_as_text() -> Result<(), Box<dyn std::error::Error>> {
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

    enroll(&client, &relay, "orders", stub.url()).await?;
    // Invalid UTF-8 and invalid JSON at once; decode must degrade, not fail.
    broker.publish("orders", vec![0xff, 0xfe, b'h', b'i']);

    let received: Value = serde_json::from_str(&stub.next_body(wait).await?)?;
    let text = received.as_str().ok_or("payload should arrive as a json string")?;
    assert!(text.ends_with("hi"));
    stub.finish().await?;

    assert!(
        wait_until(|| broker.queue_len("orders") == 0, wait).await,
        "a decode fallback still counts as a deliverable message"
    );
    relay.shutdown().await?;
    Ok(())
}

#[tokio::test(flavor = "multi_thread")]
async fn unreachable_target_keeps_the_message_available()
-> Result<(), Box<dyn std::error::Error>> {
    let dir = TempDir::new()?;
    let broker = MemoryBroker::new();
    let relay = spawn_relay(
        relay_config(&dir.path().join("registry.sqlite"), allocate_bind_addr()?),
        &broker,
    )
    .await?;
    let client = reqwest::Client::new();

    let target = unreachable_target()?;
    let created = enroll(&client, &relay, "orders", &target).await?;
    let id = created["id"].as_str().ok_or("created enrollment has no id")?.to_owned();

    broker.publish("orders", br#"{"seq": 1}"#.to_vec());
    // Give the consumer a window of refused forward attempts.
    tokio::time::sleep(Duration::from_millis(300)).await;

    let response = client.delete(relay.url(&format!("/enroll/{id}"))).send().await?;
    assert_eq!(response.status().as_u16(), 200);
    // The delete waits for the consumer, so an in-flight rejection has
    // settled by the time it answers.
    assert_eq!(broker.queue_len("orders"), 1);

    relay.shutdown().await?;
    Ok(())
}
