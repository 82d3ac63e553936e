//! Error taxonomy for the authorization server, mapped to HTTP responses.
//! Propagation policy: handlers never panic; every error maps to a JSON
//! body through `IntoResponse`, and reasons never echo raw command text or
//! policy internals beyond what the decision inherently discloses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Error kinds the authorization server can produce. Variant names match
/// the error-handling design taxonomy.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Missing or wrong bearer token.
    #[error("missing or invalid authorization")]
    AuthFailure,
    /// Non-JSON body, wrong method, or other malformed request.
    #[error("malformed request: {0}")]
    MalformedRequest(String),
    /// `/authorize` for a session id that was never registered.
    #[error("unknown session")]
    UnknownSession,
    /// Registered session references a policy id the store does not have.
    #[error("policy not found")]
    PolicyMissing,
    /// Activity-store append failed; the decision response is still sent.
    #[error("activity append failed: {0}")]
    ActivityAppendFailed(#[from] latch_activity::ActivityError),
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            Self::AuthFailure => (StatusCode::UNAUTHORIZED, json!({ "error": "unauthorized" })),
            Self::MalformedRequest(msg) => {
                (StatusCode::BAD_REQUEST, json!({ "error": msg }))
            }
            Self::UnknownSession => (
                StatusCode::FORBIDDEN,
                json!({ "decision": "deny", "reason": "Unknown session — denied by default." }),
            ),
            Self::PolicyMissing => (
                StatusCode::FORBIDDEN,
                json!({ "decision": "deny", "reason": "Policy not found — denied by default." }),
            ),
            Self::ActivityAppendFailed(e) => {
                tracing::warn!(error = %e, "activity append failed; decision response still sent");
                (StatusCode::OK, json!({ "ok": true }))
            }
        };
        (status, Json(body)).into_response()
    }
}
