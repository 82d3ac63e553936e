//! End-to-end check that every harness kind dispatches to a generator that
//! actually writes artefacts where it claims to, via the public `HarnessKind`
//! entry point rather than constructing generators directly.

use latch_harness_gen::{AuthzOptions, HarnessKind};
use latch_policy::PolicyDocument;

fn authz() -> AuthzOptions {
    AuthzOptions { port: 4455, session_id: "sess-1".to_string(), secret: "s3cr3t".to_string() }
}

#[test]
fn claude_dispatch_writes_settings_json() {
    let dir = tempfile::tempdir().unwrap();
    let policy = PolicyDocument::new("p1", "t");
    let gen = HarnessKind::from_harness_id("claude-code").generator();
    let paths = gen.enforce(&policy, dir.path(), Some(&authz())).unwrap();
    assert!(paths.iter().any(|p| p.ends_with("settings.json")));
    assert!(dir.path().join(".claude/settings.json").exists());
}

#[test]
fn codex_dispatch_writes_config_and_rules() {
    let dir = tempfile::tempdir().unwrap();
    let policy = PolicyDocument::new("p2", "t");
    let gen = HarnessKind::from_harness_id("codex").generator();
    let paths = gen.enforce(&policy, dir.path(), Some(&authz())).unwrap();
    assert!(paths.iter().any(|p| p.ends_with("config.toml")));
    assert!(paths.iter().any(|p| p.ends_with("latch-policy.rules")));
}

#[test]
fn openclaw_dispatch_writes_plugin_config() {
    let dir = tempfile::tempdir().unwrap();
    let policy = PolicyDocument::new("p3", "t");
    let gen = HarnessKind::from_harness_id("openclaw").generator();
    let paths = gen.enforce(&policy, dir.path(), Some(&authz())).unwrap();
    assert!(paths.iter().any(|p| p.ends_with("openclaw.json")));
    assert!(paths.iter().any(|p| p.ends_with("index.js")));
}

#[test]
fn unknown_harness_falls_back_to_droid_generator_with_no_artefacts() {
    let dir = tempfile::tempdir().unwrap();
    let policy = PolicyDocument::new("p4", "t");
    let gen = HarnessKind::from_harness_id("some-future-harness").generator();
    let paths = gen.enforce(&policy, dir.path(), Some(&authz())).unwrap();
    assert!(paths.is_empty());
    assert_eq!(gen.launch_flags(&policy), vec!["--auto", "high", "--skip-permissions-unsafe"]);
}

#[test]
fn invalid_session_id_is_rejected_by_every_generator_that_uses_authz() {
    let dir = tempfile::tempdir().unwrap();
    let policy = PolicyDocument::new("p5", "t");
    let bad_authz = AuthzOptions { port: 1, session_id: "../etc/passwd".to_string(), secret: "x".to_string() };
    for id in ["claude", "codex", "openclaw"] {
        let gen = HarnessKind::from_harness_id(id).generator();
        assert!(gen.enforce(&policy, dir.path(), Some(&bad_authz)).is_err());
    }
}
