//! HTTP handlers. Every route is registered with `axum::routing::any` and
//! checks the method itself, so an unsupported method on a known path
//! produces 404 rather than axum's default 405 — matching "any other
//! method/path → 404".

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use latch_activity::ActivityEvent;
use latch_approval::requires_prompt;
use latch_core::token::SessionId;
use latch_policy::{classifier::classify, evaluator::evaluate, resolve_policy, Verdict};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::error::ServerError;
use crate::session::RegisteredSession;
use crate::state::AppState;
use crate::ui::UiEvent;

fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "not found" }))).into_response()
}

/// Parse a JSON body from raw bytes. The `Bytes` extractor this is fed from
/// is a *required* (non-`Option`) parameter, so an oversize body never
/// reaches here at all — axum rejects it with 413 via `DefaultBodyLimit`
/// before the handler runs. This only has to turn "present but not valid
/// JSON" into a 400.
fn parse_json_body<T: DeserializeOwned>(bytes: &Bytes) -> Result<T, ServerError> {
    serde_json::from_slice(bytes)
        .map_err(|e| ServerError::MalformedRequest(format!("invalid JSON body: {e}")))
}

/// `POST /authorize/:sessionId`
#[derive(Debug, Deserialize)]
struct AuthorizeBody {
    #[serde(alias = "toolName")]
    tool_name: Option<String>,
    #[serde(alias = "toolInput", alias = "args")]
    tool_input: Option<Value>,
}

pub async fn authorize(
    method: Method,
    State(state): State<Arc<AppState>>,
    Path(session_id_raw): Path<String>,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return not_found();
    }
    let Ok(token) = latch_core::token::OpaqueToken::try_from(session_id_raw) else {
        return ServerError::UnknownSession.into_response();
    };
    let session_id = SessionId(token);

    let body: AuthorizeBody = match parse_json_body(&body) {
        Ok(b) => b,
        Err(e) => return e.into_response(),
    };
    let Some(tool_name) = body.tool_name else {
        return ServerError::MalformedRequest("missing tool_name".into()).into_response();
    };
    let tool_input = match body.tool_input {
        Some(Value::Object(map)) => map,
        Some(_) => {
            return ServerError::MalformedRequest("tool_input must be an object".into())
                .into_response()
        }
        None => serde_json::Map::new(),
    };

    let Some(session) = state.sessions.get(&session_id).map(|e| e.value().clone()) else {
        return record_and_respond(&state, &session_id, "<unknown>", &tool_name, ServerError::UnknownSession.into_response()).await;
    };

    let base = match state.policy_store.get(&session.policy_id) {
        Ok(p) => p,
        Err(_) => {
            return record_and_respond(
                &state,
                &session_id,
                &session.harness_id,
                &tool_name,
                ServerError::PolicyMissing.into_response(),
            )
            .await
        }
    };
    let effective = resolve_policy(&base, session.policy_override.as_ref());

    let decision = evaluate(&tool_name, &tool_input, &effective, &session.harness_id);
    let action_class = classify(&tool_name);

    let needs_prompt = decision.verdict == latch_policy::Verdict::Allow
        && requires_prompt(&decision, effective.permissions.confirm_destructive, action_class);

    let outcome = if !needs_prompt {
        (decision.verdict, decision.reason.clone())
    } else {
        match state.settings.auto_accept(&session_id) {
            None | Some(true) => (Verdict::Allow, Some("Auto-accepted.".to_string())),
            Some(false) => {
                let _ = state.ui_feed.send(UiEvent::ApprovalRequest {
                    session_id: session_id.as_str().to_string(),
                    approval_id: String::new(),
                    tool_name: tool_name.clone(),
                    action_class,
                    risk: action_class.risk(),
                });
                let (approval_id, rx) = state.coordinator.park(
                    session_id.clone(),
                    tool_name.clone(),
                    tool_input.clone(),
                    action_class,
                    session.harness_id.clone(),
                    latch_approval::APPROVAL_TIMEOUT_MS,
                );
                let resolved = rx.await.unwrap_or_else(|_| latch_approval::ApprovalOutcome {
                    verdict: Verdict::Deny,
                    reason: "Server stopped.".to_string(),
                    source: latch_approval::ResolutionSource::ServerStopped,
                });
                let _ = state.ui_feed.send(UiEvent::ApprovalResolved {
                    session_id: session_id.as_str().to_string(),
                    approval_id: approval_id.as_str().to_string(),
                    reason: resolved.reason.clone(),
                });
                (resolved.verdict, Some(resolved.reason))
            }
        }
    };

    let (status, response_body) = match outcome.0 {
        Verdict::Allow => (StatusCode::OK, json!({ "decision": "allow" })),
        Verdict::Deny => (
            StatusCode::FORBIDDEN,
            json!({ "decision": "deny", "reason": outcome.1.clone().unwrap_or_default() }),
        ),
    };

    let event = ActivityEvent {
        id: 0,
        session_id: session_id.as_str().to_string(),
        timestamp: state.clock.now_ms(),
        tool_name: tool_name.clone(),
        action_class,
        risk: action_class.risk(),
        decision: outcome.0,
        reason: outcome.1,
        harness_id: session.harness_id.clone(),
    };
    append_activity(&state, event);

    (status, Json(response_body)).into_response()
}

/// Append an activity event, logging but not failing the response if the
/// store errors (per the error-handling design: the decision still ships).
fn append_activity(state: &Arc<AppState>, mut event: ActivityEvent) {
    match state.activity_store.append(event.clone()) {
        Ok(id) => {
            event.id = id;
            let _ = state.ui_feed.send(UiEvent::Activity(event));
        }
        Err(e) => tracing::warn!(error = %e, "activity append failed"),
    }
}

/// Shared path for the two "deny before a policy is even consulted" cases
/// (unknown session, missing policy): both still append an activity event
/// and publish a feed message before returning the error response.
async fn record_and_respond(
    state: &Arc<AppState>,
    session_id: &SessionId,
    harness_id: &str,
    tool_name: &str,
    response: Response,
) -> Response {
    let event = ActivityEvent {
        id: 0,
        session_id: session_id.as_str().to_string(),
        timestamp: state.clock.now_ms(),
        tool_name: tool_name.to_string(),
        action_class: classify(tool_name),
        risk: classify(tool_name).risk(),
        decision: Verdict::Deny,
        reason: Some("denied before policy resolution".to_string()),
        harness_id: harness_id.to_string(),
    };
    append_activity(state, event);
    response
}

/// `POST /notify/:sessionId`
#[derive(Debug, Deserialize)]
struct NotifyBody {
    #[serde(rename = "type")]
    kind: String,
    #[allow(dead_code)]
    #[serde(rename = "last-assistant-message")]
    last_assistant_message: Option<String>,
}

pub async fn notify(
    method: Method,
    State(state): State<Arc<AppState>>,
    Path(session_id_raw): Path<String>,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return not_found();
    }
    let Ok(token) = latch_core::token::OpaqueToken::try_from(session_id_raw) else {
        return ServerError::UnknownSession.into_response();
    };
    let session_id = SessionId(token);
    let Some(session) = state.sessions.get(&session_id).map(|e| e.value().clone()) else {
        return ServerError::UnknownSession.into_response();
    };
    let body: NotifyBody = match parse_json_body(&body) {
        Ok(b) => b,
        Err(e) => return e.into_response(),
    };

    let event = ActivityEvent {
        id: 0,
        session_id: session_id.as_str().to_string(),
        timestamp: state.clock.now_ms(),
        tool_name: format!("_codex:{}", body.kind),
        action_class: latch_policy::ActionClass::Execute,
        risk: latch_policy::Risk::Low,
        decision: Verdict::Allow,
        reason: None,
        harness_id: session.harness_id,
    };
    append_activity(&state, event);
    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}

/// `POST /feed/:sessionId`
#[derive(Debug, Deserialize)]
struct FeedBody {
    status: Option<String>,
    message: Option<String>,
}

pub async fn feed(
    method: Method,
    State(state): State<Arc<AppState>>,
    Path(session_id_raw): Path<String>,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return not_found();
    }
    let body: FeedBody = match parse_json_body(&body) {
        Ok(b) => b,
        Err(e) => return e.into_response(),
    };
    let text = body.message.or(body.status).unwrap_or_default();
    if text.trim().is_empty() {
        return ServerError::MalformedRequest("empty feed message".into()).into_response();
    }
    let _ = state.ui_feed.send(UiEvent::ApprovalResolved {
        session_id: session_id_raw,
        approval_id: String::new(),
        reason: text,
    });
    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}

/// `POST /secrets/resolve`
#[derive(Debug, Deserialize)]
struct ResolveBody {
    keys: Vec<String>,
}

pub async fn resolve_secrets(
    method: Method,
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Response {
    if method != Method::POST {
        return not_found();
    }
    let body: ResolveBody = match parse_json_body(&body) {
        Ok(b) => b,
        Err(e) => return e.into_response(),
    };
    let resolved = state.secret_vault.resolve(&body.keys);
    (StatusCode::OK, Json(json!({ "resolved": resolved }))).into_response()
}

/// `GET /healthz` — unauthenticated liveness probe.
pub async fn healthz(method: Method) -> Response {
    if method != Method::GET {
        return not_found();
    }
    (StatusCode::OK, Json(json!({ "ok": true }))).into_response()
}

/// Register a session (used by `latchd session register`, exposed here so
/// the server crate owns the mutation without a separate admin port).
pub fn register_session(state: &Arc<AppState>, session: RegisteredSession) {
    state.register_session(session);
}
