// system-tests/tests/helpers/harness.rs
// ============================================================================
// Module: Relay Harness
// Description: Helpers for spawning webhook relays in system-tests.
// Purpose: Provide deterministic relay startup and teardown for tests.
// Dependencies: webhook-relay-broker, webhook-relay-config, webhook-relay-server
// ============================================================================

use std::net::SocketAddr;
use std::net::TcpListener;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use serde_json::json;
use system_tests::config::SystemTestConfig;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use webhook_relay_broker::HttpForwarder;
use webhook_relay_broker::MemoryBroker;
use webhook_relay_config::RelayConfig;
use webhook_relay_server::RelayServer;
use webhook_relay_server::ServerError;

/// Handle for a relay spawned in the background.
pub struct RelayHandle {
    base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    join: JoinHandle<Result<(), ServerError>>,
}

impl RelayHandle {
    /// Returns an absolute URL for a relay API path.
    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Gracefully stops the relay and waits for the final snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error when the relay exited uncleanly or its task panicked.
    pub async fn shutdown(mut self) -> Result<(), String> {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        match self.join.await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(err)) => Err(format!("relay exited with an error: {err}")),
            Err(err) => Err(format!("relay task panicked: {err}")),
        }
    }
}

/// Returns a free loopback address for test servers.
pub fn allocate_bind_addr() -> Result<SocketAddr, String> {
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("failed to bind loopback: {err}"))?;
    let addr =
        listener.local_addr().map_err(|err| format!("failed to read listener address: {err}"))?;
    drop(listener);
    Ok(addr)
}

/// Builds a relay config over a snapshot path and a concrete bind address.
pub fn relay_config(snapshot_path: &Path, addr: SocketAddr) -> RelayConfig {
    let mut config = RelayConfig::default();
    config.http.bind = addr.ip().to_string();
    config.http.port = addr.port();
    config.registry.snapshot_path = snapshot_path.to_path_buf();
    config.forwarder.timeout_ms = 500;
    config
}

/// Boots a relay against the shared in-process broker.
///
/// # Errors
///
/// Returns an error when the config is invalid or the listener fails to bind.
pub async fn spawn_relay(config: RelayConfig, broker: &MemoryBroker) -> Result<RelayHandle, String> {
    let forwarder = HttpForwarder::new(config.forward_timeout())
        .map_err(|err| format!("failed to build forwarder: {err}"))?;
    let server =
        RelayServer::from_config(config, Arc::new(broker.connector()), Arc::new(forwarder))
            .map_err(|err| format!("failed to build relay: {err}"))?;
    let bound = server.bind().await.map_err(|err| format!("failed to bind relay: {err}"))?;
    let base_url = format!("http://{}", bound.local_addr());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let join = tokio::spawn(bound.serve(async move {
        let _ = shutdown_rx.await;
    }));
    Ok(RelayHandle {
        base_url,
        shutdown: Some(shutdown_tx),
        join,
    })
}

/// Returns the configured wait window for deliveries and queue settling.
///
/// # Errors
///
/// Returns an error when the wait override in the environment is invalid.
pub fn delivery_wait() -> Result<Duration, String> {
    Ok(SystemTestConfig::load()?.delivery_wait)
}

/// Creates an enrollment through the relay API and returns the stored record.
///
/// # Errors
///
/// Returns an error when the request fails or the relay does not answer 201.
pub async fn enroll(
    client: &reqwest::Client,
    relay: &RelayHandle,
    queue: &str,
    target_url: &str,
) -> Result<Value, String> {
    let payload = json!({ "queue": queue, "target_url": target_url });
    let response = client
        .post(relay.url("/enroll"))
        .json(&payload)
        .send()
        .await
        .map_err(|err| format!("enroll request failed: {err}"))?;
    let status = response.status().as_u16();
    let body: Value =
        response.json().await.map_err(|err| format!("enroll response was not json: {err}"))?;
    if status != 201 {
        return Err(format!("enroll answered {status}: {body}"));
    }
    Ok(body)
}

/// Polls a condition until it holds or the wait window elapses.
pub async fn wait_until(condition: impl Fn() -> bool, wait: Duration) -> bool {
    let deadline = tokio::time::Instant::now() + wait;
    loop {
        if condition() {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return condition();
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}
