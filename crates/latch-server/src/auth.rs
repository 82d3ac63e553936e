//! Bearer-token authentication middleware. Every route except `/healthz`
//! requires `Authorization: Bearer <secret>` to match the server's
//! per-instance random secret exactly.

use std::sync::Arc;

use axum::extract::State;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ServerError;
use crate::state::AppState;

/// Reject any request whose bearer token does not match `state.secret`.
pub async fn require_bearer_auth<B>(
    State(state): State<Arc<AppState>>,
    request: Request<B>,
    next: Next<B>,
) -> Result<Response, ServerError> {
    let header = request
        .headers()
        .get(axum::http::header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let presented = header.and_then(|h| h.strip_prefix("Bearer "));
    match presented {
        Some(token) if constant_time_eq(token.as_bytes(), state.secret.as_bytes()) => {
            Ok(next.run(request).await)
        }
        _ => Err(ServerError::AuthFailure),
    }
}

/// Compare two byte strings in time independent of where they first
/// differ, so a failed auth attempt cannot be used to brute-force the
/// secret one byte at a time via timing.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::constant_time_eq;

    #[test]
    fn equal_slices_compare_equal() {
        assert!(constant_time_eq(b"abc123", b"abc123"));
    }

    #[test]
    fn differing_length_is_unequal() {
        assert!(!constant_time_eq(b"abc", b"abcd"));
    }

    #[test]
    fn differing_content_is_unequal() {
        assert!(!constant_time_eq(b"abc123", b"abc124"));
    }
}
