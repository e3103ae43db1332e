// crates/webhook-relay-broker/src/forward.rs
// ============================================================================
// Module: HTTP Webhook Forwarder
// Description: Forwarder implementation over reqwest.
// Purpose: POST message payloads to enrollment target URLs.
// Dependencies: webhook-relay-core, reqwest, serde_json
// ============================================================================

//! ## Overview
//! [`HttpForwarder`] posts message payloads as JSON to webhook targets. The
//! client is built once with the configured request timeout and follows no
//! redirects. Non-2xx statuses are returned as values, not errors; only the
//! absence of any response (transport failure or timeout) is an error, and
//! the two are kept distinct so callers can log them apart.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::redirect::Policy;
use serde_json::Value;
use webhook_relay_core::ForwardError;
use webhook_relay_core::Forwarder;

// ============================================================================
// SECTION: HTTP Forwarder
// ============================================================================

/// Webhook forwarder backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpForwarder {
    /// Shared HTTP client carrying the request timeout.
    client: Client,
}

impl HttpForwarder {
    /// Creates a forwarder whose requests abort after `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`ForwardError::Transport`] when the HTTP client cannot be
    /// constructed.
    pub fn new(timeout: Duration) -> Result<Self, ForwardError> {
        let client = Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .build()
            .map_err(|err| ForwardError::Transport(err.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Forwarder for HttpForwarder {
    async fn forward(&self, target_url: &str, payload: &Value) -> Result<u16, ForwardError> {
        let response = self
            .client
            .post(target_url)
            .json(payload)
            .send()
            .await
            .map_err(classify_send_error)?;
        Ok(response.status().as_u16())
    }
}

/// Maps a send failure to the forwarder error taxonomy.
fn classify_send_error(err: reqwest::Error) -> ForwardError {
    if err.is_timeout() {
        ForwardError::Timeout(err.to_string())
    } else {
        ForwardError::Transport(err.to_string())
    }
}
