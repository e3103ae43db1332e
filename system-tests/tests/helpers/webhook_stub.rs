// system-tests/tests/helpers/webhook_stub.rs
// ============================================================================
// Module: Webhook Stub
// Description: Scripted HTTP endpoint receiving forwarded webhooks.
// Purpose: Observe delivered bodies and answer with scripted status codes.
// Dependencies: tiny_http, tokio
// ============================================================================

use std::net::TcpListener;
use std::thread;
use std::time::Duration;

use tiny_http::Response;
use tiny_http::Server;
use tokio::sync::mpsc;

/// Handle for a scripted webhook endpoint on a background thread.
///
/// The endpoint serves exactly one request per scripted status, records each
/// request body, then exits. Every receive is bounded by the wait window, so
/// a stub whose requests never arrive winds down on its own.
pub struct WebhookStub {
    url: String,
    bodies: mpsc::UnboundedReceiver<String>,
    join: thread::JoinHandle<()>,
}

impl WebhookStub {
    /// Starts a stub answering one request per status, in order.
    ///
    /// # Errors
    ///
    /// Returns an error when the stub fails to bind a loopback listener.
    pub fn scripted(statuses: &[u16], wait: Duration) -> Result<Self, String> {
        let server = Server::http("127.0.0.1:0")
            .map_err(|err| format!("failed to bind webhook stub: {err}"))?;
        let addr = server
            .server_addr()
            .to_ip()
            .ok_or_else(|| "webhook stub has no ip address".to_string())?;
        let script = statuses.to_vec();
        let (sender, bodies) = mpsc::unbounded_channel();
        let join = thread::spawn(move || {
            for status in script {
                let Ok(Some(mut request)) = server.recv_timeout(wait) else {
                    return;
                };
                let mut body = String::new();
                let _ = request.as_reader().read_to_string(&mut body);
                let _ = sender.send(body);
                let _ = request.respond(Response::empty(status));
            }
        });
        Ok(Self {
            url: format!("http://{addr}/hook"),
            bodies,
            join,
        })
    }

    /// Returns the stub's webhook URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Waits for the next delivered body.
    ///
    /// # Errors
    ///
    /// Returns an error when no delivery arrives within the wait window.
    pub async fn next_body(&mut self, wait: Duration) -> Result<String, String> {
        match tokio::time::timeout(wait, self.bodies.recv()).await {
            Ok(Some(body)) => Ok(body),
            Ok(None) => Err("webhook stub wound down before delivering".to_string()),
            Err(_) => Err("no webhook delivery arrived within the wait window".to_string()),
        }
    }

    /// Waits for the stub thread to wind down.
    ///
    /// # Errors
    ///
    /// Returns an error when the stub thread panicked.
    pub async fn finish(self) -> Result<(), String> {
        let Self {
            join, ..
        } = self;
        tokio::task::spawn_blocking(move || join.join())
            .await
            .map_err(|err| format!("stub join task failed: {err}"))?
            .map_err(|_| "webhook stub thread panicked".to_string())
    }
}

/// Returns a URL whose host refuses connections.
///
/// # Errors
///
/// Returns an error when no loopback port can be probed.
pub fn unreachable_target() -> Result<String, String> {
    // Bind then drop a listener so the port is very likely unoccupied.
    let listener = TcpListener::bind("127.0.0.1:0")
        .map_err(|err| format!("failed to probe loopback: {err}"))?;
    let addr =
        listener.local_addr().map_err(|err| format!("failed to read probe address: {err}"))?;
    drop(listener);
    Ok(format!("http://{addr}/hook"))
}
