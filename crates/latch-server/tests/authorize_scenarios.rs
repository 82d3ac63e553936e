//! Integration tests against a real bound `AuthzServer`, covering the six
//! concrete authorize scenarios, the oversize-body boundary case, and the
//! wrong-bearer-token / unknown-session / command-rules-opt-out edges.

use std::sync::Arc;
use std::time::Duration;

use latch_activity::InMemoryActivityStore;
use latch_approval::ApprovalCoordinator;
use latch_core::clock::SystemClock;
use latch_core::token::{OpaqueToken, SessionId};
use latch_policy::{InMemoryPolicyStore, Permissions, PolicyDocument, PolicyStore};
use latch_server::secrets::EnvSecretVault;
use latch_server::settings::InMemorySettingsProvider;
use latch_server::state::AppState;
use latch_server::{AuthzServer, RegisteredSession};
use serde_json::{json, Value};

fn session_id(raw: &str) -> SessionId {
    SessionId(OpaqueToken::try_from(raw).unwrap())
}

async fn spawn_server(policy: PolicyDocument, session: &str, harness_id: &str) -> (AuthzServer, String) {
    let policy_store = Arc::new(InMemoryPolicyStore::default());
    policy_store.put(policy.clone()).unwrap();

    let state = AppState::new(
        "test-secret".to_string(),
        policy_store,
        Arc::new(InMemoryActivityStore::default()),
        ApprovalCoordinator::new(),
        Arc::new(InMemorySettingsProvider::new()),
        Arc::new(EnvSecretVault),
        Arc::new(SystemClock),
    );
    state.register_session(RegisteredSession {
        session_id: session_id(session),
        harness_id: harness_id.to_string(),
        policy_id: policy.id.clone(),
        policy_override: None,
    });

    let server = AuthzServer::bind(state).await.unwrap();
    let base = format!("http://127.0.0.1:{}", server.port());
    (server, base)
}

async fn authorize(
    client: &reqwest::Client,
    base: &str,
    session: &str,
    tool_name: &str,
    tool_input: Value,
) -> (reqwest::StatusCode, Value) {
    let resp = client
        .post(format!("{base}/authorize/{session}"))
        .bearer_auth("test-secret")
        .json(&json!({ "tool_name": tool_name, "tool_input": tool_input }))
        .send()
        .await
        .unwrap();
    let status = resp.status();
    let body = resp.json::<Value>().await.unwrap();
    (status, body)
}

#[tokio::test]
async fn scenario_1_shell_deny() {
    let mut policy = PolicyDocument::new("p1", "scenario1");
    policy.permissions = Permissions {
        allow_bash: false,
        allow_file_write: true,
        allow_network: true,
        confirm_destructive: false,
        ..Permissions::default()
    };
    let (server, base) = spawn_server(policy, "S1", "claude").await;
    let client = reqwest::Client::new();

    let (status, body) = authorize(&client, &base, "S1", "Bash", json!({ "command": "ls" })).await;
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
    assert_eq!(body["decision"], "deny");
    assert_eq!(body["reason"], "Policy disallows shell execution.");

    server.stop().await;
}

#[tokio::test]
async fn scenario_2_default_rule_catches_rm_rf_root() {
    let mut policy = PolicyDocument::new("p2", "scenario2");
    policy.permissions.confirm_destructive = false;
    let (server, base) = spawn_server(policy, "S2", "claude").await;
    let client = reqwest::Client::new();

    let (status, body) =
        authorize(&client, &base, "S2", "Bash", json!({ "command": "rm -rf /" })).await;
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
    assert!(body["reason"].as_str().unwrap().contains("Recursive delete of root paths"));

    server.stop().await;
}

#[tokio::test]
async fn scenario_3_sudo_prompts_and_auto_accept_allows() {
    let policy = PolicyDocument::new("p3", "scenario3");
    let policy_store = Arc::new(InMemoryPolicyStore::default());
    policy_store.put(policy.clone()).unwrap();
    let settings = Arc::new(InMemorySettingsProvider::new());
    let sid = session_id("S3");
    settings.set(sid.clone(), true);

    let state = AppState::new(
        "test-secret".to_string(),
        policy_store,
        Arc::new(InMemoryActivityStore::default()),
        ApprovalCoordinator::new(),
        settings,
        Arc::new(EnvSecretVault),
        Arc::new(SystemClock),
    );
    state.register_session(RegisteredSession {
        session_id: sid,
        harness_id: "claude".to_string(),
        policy_id: policy.id.clone(),
        policy_override: None,
    });
    let server = AuthzServer::bind(state).await.unwrap();
    let base = format!("http://127.0.0.1:{}", server.port());
    let client = reqwest::Client::new();

    let (status, body) =
        authorize(&client, &base, "S3", "Bash", json!({ "command": "sudo apt install vim" })).await;
    assert_eq!(status, reqwest::StatusCode::OK);
    assert_eq!(body["decision"], "allow");

    server.stop().await;
}

#[tokio::test]
async fn scenario_4_sudo_prompts_user_denies() {
    let policy = PolicyDocument::new("p4", "scenario4");
    let (server, base) = spawn_server(policy, "S4", "claude").await;
    let client = reqwest::Client::new();
    let state = server.state();

    let authorize_fut = authorize(&client, &base, "S4", "Bash", json!({ "command": "sudo apt install vim" }));
    tokio::pin!(authorize_fut);

    tokio::time::sleep(Duration::from_millis(50)).await;
    let pending_id = state.coordinator.pending_ids().first().cloned().expect("one pending approval");
    state
        .coordinator
        .resolve(&pending_id, latch_approval::ResolutionSource::UserDenied)
        .unwrap();

    let (status, body) = authorize_fut.await;
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
    assert_eq!(body["decision"], "deny");
    assert_eq!(body["reason"], "User denied.");

    server.stop().await;
}

#[tokio::test]
async fn scenario_6_blocked_glob_write() {
    let mut policy = PolicyDocument::new("p6", "scenario6");
    policy.permissions.allow_file_write = true;
    policy.permissions.blocked_globs = vec!["**/.env".to_string()];
    let (server, base) = spawn_server(policy, "S6", "claude").await;
    let client = reqwest::Client::new();

    let (status, body) = authorize(
        &client,
        &base,
        "S6",
        "Write",
        json!({ "file_path": "/home/u/project/.env" }),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
    assert!(body["reason"].as_str().unwrap().contains("**/.env"));

    let (status, _) = authorize(
        &client,
        &base,
        "S6",
        "Write",
        json!({ "file_path": "/home/u/project/readme.md" }),
    )
    .await;
    assert_eq!(status, reqwest::StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn unknown_session_denies_without_consulting_policy() {
    let policy = PolicyDocument::new("p7", "scenario7");
    let (server, base) = spawn_server(policy, "S7", "claude").await;
    let client = reqwest::Client::new();

    let (status, body) = authorize(&client, &base, "unregistered", "Read", json!({})).await;
    assert_eq!(status, reqwest::StatusCode::FORBIDDEN);
    assert_eq!(body["decision"], "deny");

    server.stop().await;
}

#[tokio::test]
async fn wrong_bearer_token_is_rejected() {
    let policy = PolicyDocument::new("p8", "scenario8");
    let (server, base) = spawn_server(policy, "S8", "claude").await;
    let client = reqwest::Client::new();

    let resp = client
        .post(format!("{base}/authorize/S8"))
        .bearer_auth("wrong-secret")
        .json(&json!({ "tool_name": "Read" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

    server.stop().await;
}

#[tokio::test]
async fn command_rules_empty_vec_opts_out_of_defaults() {
    let mut policy = PolicyDocument::new("p9", "scenario9");
    policy.permissions.command_rules = Some(Vec::new());
    let (server, base) = spawn_server(policy, "S9", "claude").await;
    let client = reqwest::Client::new();

    let (status, _) = authorize(&client, &base, "S9", "Bash", json!({ "command": "rm -rf /" })).await;
    assert_eq!(status, reqwest::StatusCode::OK);

    server.stop().await;
}

#[tokio::test]
async fn healthz_is_unauthenticated() {
    let policy = PolicyDocument::new("p10", "scenario10");
    let (server, base) = spawn_server(policy, "S10", "claude").await;
    let resp = reqwest::get(format!("{base}/healthz")).await.unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::OK);
    server.stop().await;
}

#[tokio::test]
async fn oversize_body_is_rejected_with_413_and_no_pending_approval() {
    let policy = PolicyDocument::new("p11", "scenario11");
    let (server, base) = spawn_server(policy, "S11", "claude").await;
    let state = server.state();
    let client = reqwest::Client::new();

    let oversized = "x".repeat(latch_server::MAX_BODY_BYTES + 1);
    let resp = client
        .post(format!("{base}/authorize/S11"))
        .bearer_auth("test-secret")
        .header("content-type", "application/json")
        .body(oversized)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), reqwest::StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(state.coordinator.pending_count(), 0);

    server.stop().await;
}
