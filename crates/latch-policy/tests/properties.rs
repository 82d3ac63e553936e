use latch_policy::{
    compute_strictest_baseline, evaluate, resolve_policy, HarnessConfig, Permissions,
    PolicyDocument, RuleDecision, ToolRule, Verdict,
};
use serde_json::{json, Map};
use std::collections::BTreeMap;

fn input(pairs: &[(&str, &str)]) -> Map<String, serde_json::Value> {
    let mut m = Map::new();
    for (k, v) in pairs {
        m.insert((*k).to_string(), json!(v));
    }
    m
}

fn policy(id: &str) -> PolicyDocument {
    PolicyDocument::new(id, id)
}

#[test]
fn strictness_monotonicity_turning_off_allow_bash_only_tightens_verdicts() {
    let calls: Vec<(&str, Map<String, serde_json::Value>)> = vec![
        ("Bash", input(&[("command", "ls")])),
        ("Write", input(&[("file_path", "/tmp/a.txt")])),
        ("Read", input(&[("file_path", "/tmp/a.txt")])),
    ];

    let p = policy("p");
    let mut p_prime = policy("p");
    p_prime.permissions.allow_bash = false;

    for (tool, args) in &calls {
        let base = evaluate(tool, args, &p, "claude");
        let tighter = evaluate(tool, args, &p_prime, "claude");
        let rank = |v: Verdict| if v == Verdict::Deny { 1 } else { 0 };
        assert!(rank(tighter.verdict) >= rank(base.verdict), "tool={tool}");
    }
}

#[test]
fn strictness_monotonicity_adding_deny_rule_only_tightens() {
    let p = policy("p");
    let mut p_prime = policy("p");
    let mut cfg = HarnessConfig::default();
    cfg.tool_rules = vec![ToolRule { pattern: "Bash".into(), decision: RuleDecision::Deny }];
    p_prime.harnesses.insert("claude".into(), cfg);

    let base = evaluate("Bash", &input(&[("command", "ls")]), &p, "claude");
    let tighter = evaluate("Bash", &input(&[("command", "ls")]), &p_prime, "claude");
    assert_eq!(base.verdict, Verdict::Allow);
    assert_eq!(tighter.verdict, Verdict::Deny);
}

#[test]
fn baseline_is_at_least_as_strict_as_every_input_policy() {
    let mut permissive = policy("permissive");
    permissive.permissions.allow_bash = true;
    permissive.permissions.allow_file_write = true;

    let mut strict = policy("strict");
    strict.permissions.allow_bash = false;
    strict.permissions.blocked_globs = vec!["**/*.secret".into()];

    let baseline = compute_strictest_baseline(&[permissive.clone(), strict.clone()], None);

    let calls: Vec<(&str, Map<String, serde_json::Value>)> = vec![
        ("Bash", input(&[("command", "ls")])),
        ("Write", input(&[("file_path", "/a/b.secret")])),
    ];

    for (tool, args) in &calls {
        let baseline_decision = evaluate(tool, args, &baseline, "claude");
        for p in [&permissive, &strict] {
            let p_decision = evaluate(tool, args, p, "claude");
            if p_decision.verdict == Verdict::Deny {
                assert_eq!(
                    baseline_decision.verdict,
                    Verdict::Deny,
                    "baseline must deny whatever any input policy denies (tool={tool})"
                );
            }
        }
    }
}

#[test]
fn resolve_is_pure_and_deterministic() {
    let mut base = policy("base");
    base.permissions.allow_bash = true;
    let mut over = policy("base");
    over.permissions.allow_bash = false;

    let a = resolve_policy(&base, Some(&over));
    let b = resolve_policy(&base, Some(&over));
    assert_eq!(a, b);
    assert!(!a.permissions.allow_bash);
}

#[test]
fn evaluate_is_deterministic_across_repeated_calls() {
    let p = policy("p");
    let args = input(&[("command", "git push origin main --force")]);
    let first = evaluate("Bash", &args, &p, "codex");
    for _ in 0..10 {
        assert_eq!(evaluate("Bash", &args, &p, "codex"), first);
    }
}

#[test]
fn command_rules_absent_vs_empty_opt_out() {
    let mut absent = policy("p");
    absent.permissions.command_rules = None;
    let mut empty = policy("p");
    empty.permissions.command_rules = Some(vec![]);

    let args = input(&[("command", "rm -rf /")]);
    assert_eq!(evaluate("Bash", &args, &absent, "claude").verdict, Verdict::Deny);
    assert_eq!(evaluate("Bash", &args, &empty, "claude").verdict, Verdict::Allow);
}

#[test]
fn permissions_default_allows_everything_with_no_harness_config() {
    let p = PolicyDocument {
        id: "p".into(),
        name: "p".into(),
        description: String::new(),
        permissions: Permissions::default(),
        harnesses: BTreeMap::new(),
    };
    assert_eq!(evaluate("Read", &input(&[]), &p, "claude").verdict, Verdict::Allow);
}
