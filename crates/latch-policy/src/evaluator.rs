//! Tool Classifier & Rule Evaluator: the pure decision pipeline described in
//! the component design. `evaluate` is the single entry point; everything
//! else in this module is a short-circuiting step of its pipeline.

use crate::classifier::classify;
use crate::defaults::default_command_rules;
use crate::glob;
use crate::model::{ActionClass, Decision, HarnessConfig, PolicyDocument, RuleDecision};
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// Generic key-value tool input, commonly containing `command`, `file_path`,
/// or `path`.
pub type ToolInput = serde_json::Map<String, Value>;

fn input_str<'a>(input: &'a ToolInput, key: &str) -> Option<&'a str> {
    input.get(key).and_then(Value::as_str)
}

fn file_path(input: &ToolInput) -> Option<&str> {
    input_str(input, "file_path").or_else(|| input_str(input, "path"))
}

static MCP_NAME: Lazy<Regex> = Lazy::new(|| Regex::new(r"^mcp__([^_]+(?:_[^_]+)*)__.+$").unwrap());

fn mcp_server_name(tool_name: &str) -> Option<&str> {
    MCP_NAME.captures(tool_name).map(|c| c.get(1).unwrap().as_str())
}

/// Pattern match used by `toolRules`/legacy arrays: exact case-insensitive
/// equality, or a trailing-`*` prefix match.
fn tool_pattern_matches(pattern: &str, tool_name: &str) -> bool {
    if let Some(prefix) = pattern.strip_suffix('*') {
        tool_name.to_lowercase().starts_with(&prefix.to_lowercase())
    } else {
        pattern.eq_ignore_ascii_case(tool_name)
    }
}

fn normalized_kind(tool_name: &str) -> String {
    tool_name.to_lowercase().replace(['_', '-'], "")
}

/// Evaluate a single tool invocation against the effective policy. Pure:
/// performs no I/O and consults no external state (invariant I5 — the
/// effective policy must already be fully resolved by the caller).
#[must_use]
pub fn evaluate(
    tool_name: &str,
    tool_input: &ToolInput,
    policy: &PolicyDocument,
    harness_id: &str,
) -> Decision {
    let action_class = classify(tool_name);

    // 1. Action-class gate.
    match action_class {
        ActionClass::Execute if !policy.permissions.allow_bash => {
            return Decision::deny("Policy disallows shell execution.");
        }
        ActionClass::Write if !policy.permissions.allow_file_write => {
            return Decision::deny("Policy disallows file writes.");
        }
        ActionClass::Send if !policy.permissions.allow_network => {
            return Decision::deny("Policy disallows network access.");
        }
        _ => {}
    }

    let harness: Option<&HarnessConfig> = policy.harnesses.get(harness_id);

    // 2. Per-harness tool rules.
    let mut allow_suppressed_rules = false;
    let mut needs_prompt = false;
    if let Some(cfg) = harness {
        for rule in &cfg.tool_rules {
            if tool_pattern_matches(&rule.pattern, tool_name) {
                match rule.decision {
                    RuleDecision::Deny => return Decision::deny(format!(
                        "Tool '{tool_name}' denied by rule '{}'.",
                        rule.pattern
                    )),
                    RuleDecision::Prompt => {
                        needs_prompt = true;
                        allow_suppressed_rules = true;
                    }
                    RuleDecision::Allow => {
                        allow_suppressed_rules = true;
                    }
                }
                break;
            }
        }
    }

    // 3. MCP-server rules.
    if !allow_suppressed_rules {
        if let (Some(cfg), Some(server)) = (harness, mcp_server_name(tool_name)) {
            for rule in &cfg.mcp_server_rules {
                if rule.server.eq_ignore_ascii_case(server) {
                    match rule.decision {
                        RuleDecision::Deny => {
                            return Decision::deny(format!(
                                "MCP server '{server}' denied by rule."
                            ))
                        }
                        RuleDecision::Prompt => {
                            needs_prompt = true;
                            allow_suppressed_rules = true;
                        }
                        RuleDecision::Allow => allow_suppressed_rules = true,
                    }
                    break;
                }
            }
        }
    }

    // 4. Legacy arrays.
    if let Some(cfg) = harness {
        if cfg.denied_tools.iter().any(|t| t.eq_ignore_ascii_case(tool_name)) {
            return Decision::deny(format!("Tool '{tool_name}' is explicitly denied."));
        }
        if let Some(allowed) = &cfg.allowed_tools {
            if !allowed.iter().any(|t| t.eq_ignore_ascii_case(tool_name)) {
                return Decision::deny(format!("Tool '{tool_name}' is not in the allowlist."));
            }
        }
    }

    let kind = normalized_kind(tool_name);

    // 5. Blocked globs (read/write/edit only).
    if matches!(kind.as_str(), "read" | "write" | "edit") {
        if let Some(path) = file_path(tool_input) {
            if let Some(pattern) = glob::first_match(path, &policy.permissions.blocked_globs) {
                return Decision::deny(format!("Path matches blocked glob '{pattern}'."));
            }
        }
    }

    // 6. Command rules (bash/exec/execute only).
    if matches!(kind.as_str(), "bash" | "exec" | "execute") {
        if let Some(command) = input_str(tool_input, "command") {
            let rules_owned;
            let rules: &[crate::model::CommandRule] = match &policy.permissions.command_rules {
                Some(rules) if rules.is_empty() => &[],
                Some(rules) => rules,
                None => {
                    rules_owned = default_command_rules();
                    &rules_owned
                }
            };
            for rule in rules {
                let Ok(re) = Regex::new(&format!("(?i){}", rule.pattern)) else { continue };
                if re.is_match(command) {
                    match rule.decision {
                        RuleDecision::Deny => {
                            return Decision::deny(
                                rule.reason.clone().unwrap_or_else(|| "Command denied.".into()),
                            )
                        }
                        RuleDecision::Prompt => {
                            needs_prompt = true;
                            break;
                        }
                        RuleDecision::Allow => break,
                    }
                }
            }
        }
    }

    // 7. Default.
    if needs_prompt {
        Decision::allow_needs_prompt(None)
    } else {
        Decision::allow()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommandRule, McpServerRule, Permissions, ToolRule};
    use serde_json::json;
    use std::collections::BTreeMap;

    fn input(pairs: &[(&str, &str)]) -> ToolInput {
        let mut m = serde_json::Map::new();
        for (k, v) in pairs {
            m.insert((*k).to_string(), json!(v));
        }
        m
    }

    fn permissive_policy() -> PolicyDocument {
        PolicyDocument {
            id: "p1".into(),
            name: "permissive".into(),
            description: String::new(),
            permissions: Permissions {
                allow_bash: true,
                allow_network: true,
                allow_file_write: true,
                confirm_destructive: false,
                blocked_globs: Vec::new(),
                command_rules: None,
            },
            harnesses: BTreeMap::new(),
        }
    }

    #[test]
    fn scenario_1_shell_deny() {
        let mut p = permissive_policy();
        p.permissions.allow_bash = false;
        let d = evaluate("Bash", &input(&[("command", "ls")]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Deny));
        assert_eq!(d.reason.as_deref(), Some("Policy disallows shell execution."));
    }

    #[test]
    fn scenario_2_default_rule_catches_rm_rf_root() {
        let p = permissive_policy();
        let d = evaluate("Bash", &input(&[("command", "rm -rf /")]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Deny));
        assert!(d.reason.unwrap().contains("Recursive delete of root paths"));
    }

    #[test]
    fn scenario_6_blocked_glob_write() {
        let mut p = permissive_policy();
        p.permissions.blocked_globs = vec!["**/.env".into()];
        let denied = evaluate(
            "Write",
            &input(&[("file_path", "/home/u/project/.env")]),
            &p,
            "claude",
        );
        assert!(matches!(denied.verdict, crate::model::Verdict::Deny));
        assert!(denied.reason.unwrap().contains("**/.env"));

        let allowed = evaluate(
            "Write",
            &input(&[("file_path", "/home/u/project/readme.md")]),
            &p,
            "claude",
        );
        assert!(matches!(allowed.verdict, crate::model::Verdict::Allow));
    }

    #[test]
    fn command_rules_empty_opts_out_of_defaults() {
        let mut p = permissive_policy();
        p.permissions.command_rules = Some(vec![]);
        let d = evaluate("Bash", &input(&[("command", "rm -rf /")]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Allow));
    }

    #[test]
    fn sudo_default_rule_yields_needs_prompt() {
        let p = permissive_policy();
        let d = evaluate("Bash", &input(&[("command", "sudo apt install vim")]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Allow));
        assert!(d.needs_prompt);
    }

    #[test]
    fn tool_rule_deny_short_circuits() {
        let mut p = permissive_policy();
        let mut cfg = HarnessConfig::default();
        cfg.tool_rules = vec![ToolRule { pattern: "Bash".into(), decision: RuleDecision::Deny }];
        p.harnesses.insert("claude".into(), cfg);
        let d = evaluate("Bash", &input(&[("command", "ls")]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Deny));
    }

    #[test]
    fn tool_rule_trailing_wildcard_matches_prefix() {
        let mut p = permissive_policy();
        let mut cfg = HarnessConfig::default();
        cfg.tool_rules =
            vec![ToolRule { pattern: "mcp__github__*".into(), decision: RuleDecision::Deny }];
        p.harnesses.insert("claude".into(), cfg);
        let d = evaluate("mcp__github__create_issue", &input(&[]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Deny));
    }

    #[test]
    fn mcp_server_rule_applies_when_no_tool_rule_matches() {
        let mut p = permissive_policy();
        let mut cfg = HarnessConfig::default();
        cfg.mcp_server_rules =
            vec![McpServerRule { server: "github".into(), decision: RuleDecision::Deny }];
        p.harnesses.insert("claude".into(), cfg);
        let d = evaluate("mcp__github__create_issue", &input(&[]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Deny));
    }

    #[test]
    fn legacy_allowed_tools_denies_absent_names() {
        let mut p = permissive_policy();
        let mut cfg = HarnessConfig::default();
        cfg.allowed_tools = Some(vec!["Read".into()]);
        p.harnesses.insert("claude".into(), cfg);
        let d = evaluate("Write", &input(&[]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Deny));
    }

    #[test]
    fn invalid_command_rule_regex_is_skipped() {
        let mut p = permissive_policy();
        p.permissions.command_rules = Some(vec![CommandRule {
            pattern: "(unterminated".into(),
            decision: RuleDecision::Deny,
            reason: None,
        }]);
        let d = evaluate("Bash", &input(&[("command", "ls")]), &p, "claude");
        assert!(matches!(d.verdict, crate::model::Verdict::Allow));
    }

    #[test]
    fn determinism_same_inputs_same_verdict() {
        let p = permissive_policy();
        let i = input(&[("command", "ls")]);
        let a = evaluate("Bash", &i, &p, "claude");
        let b = evaluate("Bash", &i, &p, "claude");
        assert_eq!(a, b);
    }
}
