// crates/webhook-relay-server/src/server.rs
// ============================================================================
// Module: Relay Server
// Description: Server assembly and the boot/serve/shutdown lifecycle.
// Purpose: Tie registry, supervisor, and HTTP listener into one process.
// Dependencies: axum, tokio, webhook-relay-config, webhook-relay-store-sqlite
// ============================================================================

//! ## Overview
//! [`RelayServer`] owns the boot sequence: validate configuration, open the
//! durable registry (restoring the last snapshot when one exists), start a
//! consumer for every persisted enrollment, then bind the HTTP listener.
//! [`BoundServer::serve`] runs until the shutdown future resolves, then tears
//! the relay down in the reverse of boot order. A failed final snapshot widens
//! the durability window and is logged, never escalated.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tracing::error;
use tracing::info;
use tracing::warn;
use webhook_relay_config::RelayConfig;
use webhook_relay_core::BrokerConnector;
use webhook_relay_core::EnrollmentStore;
use webhook_relay_core::Forwarder;
use webhook_relay_core::SupervisorRegistry;
use webhook_relay_store_sqlite::SqliteEnrollmentStore;

use crate::api;
use crate::api::AppState;

// ============================================================================
// SECTION: Relay Server
// ============================================================================

/// Relay server instance, assembled from configuration plus capabilities.
pub struct RelayServer {
    /// Validated server configuration.
    config: RelayConfig,
    /// Broker connector handed to every consumer.
    connector: Arc<dyn BrokerConnector>,
    /// Webhook forwarder handed to every consumer.
    forwarder: Arc<dyn Forwarder>,
}

impl RelayServer {
    /// Builds a relay server from configuration and injected capabilities.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Config`] when the configuration is invalid.
    pub fn from_config(
        config: RelayConfig,
        connector: Arc<dyn BrokerConnector>,
        forwarder: Arc<dyn Forwarder>,
    ) -> Result<Self, ServerError> {
        config.validate().map_err(|err| ServerError::Config(err.to_string()))?;
        Ok(Self {
            config,
            connector,
            forwarder,
        })
    }

    /// Boots the registry and supervisor and binds the HTTP listener.
    ///
    /// Boot order is fixed: open the registry first, resume a consumer for
    /// every persisted enrollment, and only then accept HTTP traffic.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when the registry cannot be opened or the
    /// listener cannot bind.
    pub async fn bind(self) -> Result<BoundServer, ServerError> {
        let addr =
            self.config.http_socket_addr().map_err(|err| ServerError::Config(err.to_string()))?;
        let store = Arc::new(
            SqliteEnrollmentStore::open(&self.config.registry.snapshot_path)
                .map_err(|err| ServerError::Init(err.to_string()))?,
        );
        let supervisor = Arc::new(SupervisorRegistry::new(
            self.config.broker.url.clone(),
            self.connector,
            self.forwarder,
        ));
        let persisted = store.list_all().map_err(|err| ServerError::Init(err.to_string()))?;
        let resumed = supervisor.bootstrap(&persisted).await;
        info!(consumers = resumed, "supervisor bootstrapped from registry");
        let shared: Arc<dyn EnrollmentStore> = store.clone();
        let app = api::router(AppState {
            store: shared,
            supervisor: Arc::clone(&supervisor),
        });
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|err| ServerError::Transport(format!("http bind failed: {err}")))?;
        let local_addr = listener
            .local_addr()
            .map_err(|err| ServerError::Transport(format!("http local address unavailable: {err}")))?;
        Ok(BoundServer {
            listener,
            app,
            store,
            supervisor,
            local_addr,
        })
    }

    /// Runs the full lifecycle, serving until the process receives ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError`] when boot fails or the HTTP server fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        let bound = self.bind().await?;
        bound.serve(shutdown_signal()).await
    }
}

// ============================================================================
// SECTION: Bound Server
// ============================================================================

/// A booted relay with a bound listener, ready to serve.
pub struct BoundServer {
    /// Bound HTTP listener, not yet accepting.
    listener: TcpListener,
    /// Enrollment API router.
    app: Router,
    /// Durable registry, kept for the final shutdown snapshot.
    store: Arc<SqliteEnrollmentStore>,
    /// Supervisor, kept for consumer teardown.
    supervisor: Arc<SupervisorRegistry>,
    /// Address the listener is bound to.
    local_addr: SocketAddr,
}

impl BoundServer {
    /// Returns the address the listener is bound to.
    #[must_use]
    pub const fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serves HTTP until `shutdown` resolves, then tears the relay down.
    ///
    /// Teardown order: drain the listener, stop every consumer, write one
    /// final synchronous snapshot.
    ///
    /// # Errors
    ///
    /// Returns [`ServerError::Transport`] when the HTTP server fails.
    pub async fn serve(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<(), ServerError> {
        let Self {
            listener,
            app,
            store,
            supervisor,
            local_addr,
        } = self;
        info!(addr = %local_addr, "enrollment api listening");
        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|err| ServerError::Transport(format!("http server failed: {err}")))?;
        supervisor.shutdown().await;
        match store.snapshot_now() {
            Ok(()) => info!("final registry snapshot written"),
            Err(err) => warn!(error = %err, "final registry snapshot failed"),
        }
        Ok(())
    }
}

/// Resolves when the process receives ctrl-c.
async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            // Without a signal handler there is no graceful stop; keep
            // serving instead of tearing down a healthy listener.
            error!(error = %err, "ctrl-c handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Relay server errors.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// Configuration errors.
    #[error("config error: {0}")]
    Config(String),
    /// Initialization errors.
    #[error("init error: {0}")]
    Init(String),
    /// Transport errors.
    #[error("transport error: {0}")]
    Transport(String),
}

// ============================================================================
// SECTION: Tests
// ============================================================================
