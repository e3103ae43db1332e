// crates/webhook-relay-server/src/api.rs
// ============================================================================
// Module: Enrollment API
// Description: axum routes for enrollment create, list, and delete.
// Purpose: Drive the registry and the supervisor from HTTP requests.
// Dependencies: axum, serde_json, url, webhook-relay-core
// ============================================================================

//! ## Overview
//! Three routes form the control surface: `POST /enroll` validates the
//! payload, writes the registry, then starts the consumer; `GET /enrollments`
//! lists the registry; `DELETE /enroll/{id}` deletes the row, then stops the
//! consumer. The registry mutates first and the supervisor follows, so the
//! persisted table never lags behind a mutation that already has a consumer.
//! Bodies are read as raw bytes and decoded explicitly so malformed JSON maps
//! to a 400 rather than a transport-level rejection.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;

use axum::Json;
use axum::Router;
use axum::body::Bytes;
use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::delete;
use axum::routing::get;
use axum::routing::post;
use serde_json::Value;
use serde_json::json;
use tracing::error;
use tracing::info;
use url::Url;
use webhook_relay_core::EnrollmentId;
use webhook_relay_core::EnrollmentStore;
use webhook_relay_core::NewEnrollment;
use webhook_relay_core::SubscriptionArgs;
use webhook_relay_core::SupervisorRegistry;

// ============================================================================
// SECTION: Shared State
// ============================================================================

/// Shared state handed to every enrollment handler.
#[derive(Clone)]
pub struct AppState {
    /// Durable enrollment registry.
    pub store: Arc<dyn EnrollmentStore>,
    /// Running consumers, one per enrollment.
    pub supervisor: Arc<SupervisorRegistry>,
}

/// Builds the enrollment API router over the shared state.
#[must_use]
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/enroll", post(create_enrollment))
        .route("/enrollments", get(list_enrollments))
        .route("/enroll/{id}", delete(delete_enrollment))
        .with_state(state)
}

// ============================================================================
// SECTION: Handlers
// ============================================================================

/// Handles `POST /enroll`.
async fn create_enrollment(
    State(state): State<AppState>,
    bytes: Bytes,
) -> (StatusCode, Json<Value>) {
    let payload: Value = match serde_json::from_slice(&bytes) {
        Ok(payload) => payload,
        Err(_) => return error_body(StatusCode::BAD_REQUEST, "Invalid JSON payload"),
    };
    let request = match parse_enrollment_request(&payload) {
        Ok(request) => request,
        Err(response) => return response,
    };
    let stored = match state.store.insert_or_replace(&request) {
        Ok(stored) => stored,
        Err(err) => {
            error!(queue = %request.queue, error = %err, "enrollment insert failed");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Database insertion failed");
        }
    };
    // Serialize before the consumer starts; a failed response must not leave
    // a consumer running for a row the caller never saw.
    let body = match serde_json::to_value(&stored) {
        Ok(body) => body,
        Err(err) => {
            error!(enrollment_id = %stored.id, error = %err, "stored enrollment is unserializable");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Database insertion failed");
        }
    };
    state.supervisor.start_for_enrollment(&stored).await;
    info!(enrollment_id = %stored.id, queue = %stored.queue, "enrollment created");
    (StatusCode::CREATED, Json(body))
}

/// Handles `GET /enrollments`.
async fn list_enrollments(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let rows = match state.store.list_all() {
        Ok(rows) => rows,
        Err(err) => {
            error!(error = %err, "enrollment list failed");
            return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch enrollments");
        }
    };
    match serde_json::to_value(&rows) {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(err) => {
            error!(error = %err, "enrollment list is unserializable");
            error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to fetch enrollments")
        }
    }
}

/// Handles `DELETE /enroll/{id}`.
async fn delete_enrollment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> (StatusCode, Json<Value>) {
    let id = EnrollmentId::from(id);
    if let Err(err) = state.store.delete(&id) {
        error!(enrollment_id = %id, error = %err, "enrollment delete failed");
        return error_body(StatusCode::INTERNAL_SERVER_ERROR, "Failed to delete enrollment");
    }
    state.supervisor.stop_for_enrollment(&id).await;
    info!(enrollment_id = %id, "enrollment deleted");
    let message = format!("Enrollment {id} deleted");
    (StatusCode::OK, Json(json!({ "message": message })))
}

// ============================================================================
// SECTION: Request Validation
// ============================================================================

/// Extracts and validates the POST body fields into a registry insert shape.
///
/// Deletion followed by re-creation is the only update path, so the id is
/// always freshly generated here.
fn parse_enrollment_request(payload: &Value) -> Result<NewEnrollment, (StatusCode, Json<Value>)> {
    let queue = match payload.get("queue").and_then(Value::as_str) {
        Some(queue) if !queue.trim().is_empty() => queue.to_owned(),
        _ => return Err(missing_field("queue")),
    };
    let target_url = match payload.get("target_url").and_then(Value::as_str) {
        Some(target_url) => target_url.to_owned(),
        None => return Err(missing_field("target_url")),
    };
    if !is_http_target(&target_url) {
        return Err(error_body(StatusCode::BAD_REQUEST, "Invalid target_url"));
    }
    let subscription_args = match payload.get("subscription_args") {
        None | Some(Value::Null) => SubscriptionArgs::new(),
        Some(Value::Object(args)) => args.clone(),
        Some(_) => {
            return Err(error_body(StatusCode::BAD_REQUEST, "Invalid subscription_args"));
        }
    };
    Ok(NewEnrollment::new(queue, target_url, subscription_args))
}

/// Returns whether the string parses as an absolute http or https URL.
fn is_http_target(raw: &str) -> bool {
    Url::parse(raw).is_ok_and(|url| matches!(url.scheme(), "http" | "https"))
}

/// Builds the standard `{"error": ...}` response body.
fn error_body(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": message })))
}

/// Builds the 400 response for a required field that is absent or unusable.
fn missing_field(field: &str) -> (StatusCode, Json<Value>) {
    let message = format!("Missing required field: {field}");
    (StatusCode::BAD_REQUEST, Json(json!({ "error": message })))
}

// ============================================================================
// SECTION: Tests
// ============================================================================
