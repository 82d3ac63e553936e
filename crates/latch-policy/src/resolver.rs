//! Policy Resolver: `compute_strictest_baseline` and `resolve_policy`.
//!
//! Both functions are pure — no I/O, no global state — per invariant I4.

use crate::model::{HarnessConfig, McpServerRule, Permissions, PolicyDocument, ToolRule};
use std::collections::BTreeMap;

fn merge_tool_rules(into: &mut Vec<ToolRule>, from: &[ToolRule]) {
    for rule in from {
        if let Some(existing) = into.iter_mut().find(|r| r.pattern == rule.pattern) {
            existing.decision = existing.decision.stricter(rule.decision);
        } else {
            into.push(rule.clone());
        }
    }
}

fn merge_mcp_rules(into: &mut Vec<McpServerRule>, from: &[McpServerRule]) {
    for rule in from {
        if let Some(existing) =
            into.iter_mut().find(|r| r.server.eq_ignore_ascii_case(&rule.server))
        {
            existing.decision = existing.decision.stricter(rule.decision);
        } else {
            into.push(rule.clone());
        }
    }
}

fn union_preserving_order(into: &mut Vec<String>, from: &[String]) {
    for item in from {
        if !into.contains(item) {
            into.push(item.clone());
        }
    }
}

/// Combine every policy in `policies` into a synthetic most-restrictive
/// policy. When `harness_id` is `Some`, only that harness's configuration is
/// folded in; when `None`, every harness id that appears across the input
/// policies is merged independently (a "union of known harnesses").
#[must_use]
pub fn compute_strictest_baseline(
    policies: &[PolicyDocument],
    harness_id: Option<&str>,
) -> PolicyDocument {
    let mut permissions = Permissions {
        allow_bash: true,
        allow_network: true,
        allow_file_write: true,
        confirm_destructive: false,
        blocked_globs: Vec::new(),
        command_rules: None,
    };
    let mut command_rules = Vec::new();
    let mut any_command_rules = false;
    let mut harnesses: BTreeMap<String, HarnessConfig> = BTreeMap::new();

    for policy in policies {
        permissions.allow_bash &= policy.permissions.allow_bash;
        permissions.allow_network &= policy.permissions.allow_network;
        permissions.allow_file_write &= policy.permissions.allow_file_write;
        permissions.confirm_destructive |= policy.permissions.confirm_destructive;
        union_preserving_order(&mut permissions.blocked_globs, &policy.permissions.blocked_globs);

        let effective_rules = policy
            .permissions
            .command_rules
            .clone()
            .unwrap_or_else(crate::defaults::default_command_rules);
        command_rules.extend(effective_rules);
        any_command_rules = true;

        let ids_to_merge: Vec<String> = match harness_id {
            Some(id) => vec![id.to_string()],
            None => policy.harnesses.keys().cloned().collect(),
        };
        for id in ids_to_merge {
            let Some(src) = policy.harnesses.get(&id) else { continue };
            let dst = harnesses.entry(id).or_default();
            merge_tool_rules(&mut dst.tool_rules, &src.tool_rules);
            merge_mcp_rules(&mut dst.mcp_server_rules, &src.mcp_server_rules);
            if let Some(allowed) = &src.allowed_tools {
                let entry = dst.allowed_tools.get_or_insert_with(Vec::new);
                for t in allowed {
                    if !entry.contains(t) {
                        entry.push(t.clone());
                    }
                }
            }
            for t in &src.denied_tools {
                if !dst.denied_tools.contains(t) {
                    dst.denied_tools.push(t.clone());
                }
            }
        }
    }

    permissions.command_rules = if any_command_rules { Some(command_rules) } else { None };

    PolicyDocument {
        id: "strictest-baseline".to_string(),
        name: "Strictest Baseline".to_string(),
        description: "Synthetic most-restrictive policy merged from all stored policies"
            .to_string(),
        permissions,
        harnesses,
    }
}

/// Resolve a session's effective policy from its assigned `base` policy and
/// an optional `override_`. `None` fields on the override leave the base
/// value untouched.
#[must_use]
pub fn resolve_policy(base: &PolicyDocument, override_: Option<&PolicyDocument>) -> PolicyDocument {
    let Some(ovr) = override_ else { return base.clone() };

    let mut permissions = base.permissions.clone();
    permissions.allow_bash = ovr.permissions.allow_bash;
    permissions.allow_network = ovr.permissions.allow_network;
    permissions.allow_file_write = ovr.permissions.allow_file_write;
    permissions.confirm_destructive = ovr.permissions.confirm_destructive;
    union_preserving_order(&mut permissions.blocked_globs, &ovr.permissions.blocked_globs);
    if ovr.permissions.command_rules.is_some() {
        permissions.command_rules = ovr.permissions.command_rules.clone();
    }

    let mut harnesses = base.harnesses.clone();
    for (id, ovr_cfg) in &ovr.harnesses {
        let dst = harnesses.entry(id.clone()).or_default();
        for rule in &ovr_cfg.tool_rules {
            if let Some(existing) = dst.tool_rules.iter_mut().find(|r| r.pattern == rule.pattern) {
                existing.decision = rule.decision;
            } else {
                dst.tool_rules.push(rule.clone());
            }
        }
        for rule in &ovr_cfg.mcp_server_rules {
            if let Some(existing) =
                dst.mcp_server_rules.iter_mut().find(|r| r.server.eq_ignore_ascii_case(&rule.server))
            {
                existing.decision = rule.decision;
            } else {
                dst.mcp_server_rules.push(rule.clone());
            }
        }
        if ovr_cfg.allowed_tools.is_some() {
            dst.allowed_tools = ovr_cfg.allowed_tools.clone();
        }
        if !ovr_cfg.denied_tools.is_empty() {
            dst.denied_tools = ovr_cfg.denied_tools.clone();
        }
        if ovr_cfg.approval_mode.is_some() {
            dst.approval_mode = ovr_cfg.approval_mode;
        }
        if ovr_cfg.sandbox.is_some() {
            dst.sandbox = ovr_cfg.sandbox;
        }
        if ovr_cfg.env_inherit.is_some() {
            dst.env_inherit = ovr_cfg.env_inherit.clone();
        }
        if !ovr_cfg.env_exclude.is_empty() {
            dst.env_exclude = ovr_cfg.env_exclude.clone();
        }
        for (k, v) in &ovr_cfg.features {
            dst.features.insert(k.clone(), *v);
        }
        if !ovr_cfg.disabled_mcp_tools.is_empty() {
            dst.disabled_mcp_tools = ovr_cfg.disabled_mcp_tools.clone();
        }
    }

    PolicyDocument {
        id: base.id.clone(),
        name: base.name.clone(),
        description: base.description.clone(),
        permissions,
        harnesses,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{CommandRule, RuleDecision};

    fn policy(id: &str, allow_bash: bool) -> PolicyDocument {
        let mut p = PolicyDocument::new(id, id);
        p.permissions.allow_bash = allow_bash;
        p
    }

    #[test]
    fn baseline_and_of_booleans_any_false_wins() {
        let policies = vec![policy("a", true), policy("b", false)];
        let baseline = compute_strictest_baseline(&policies, None);
        assert!(!baseline.permissions.allow_bash);
    }

    #[test]
    fn baseline_or_of_confirm_destructive() {
        let mut a = policy("a", true);
        a.permissions.confirm_destructive = false;
        let mut b = policy("b", true);
        b.permissions.confirm_destructive = true;
        let baseline = compute_strictest_baseline(&[a, b], None);
        assert!(baseline.permissions.confirm_destructive);
    }

    #[test]
    fn baseline_blocked_globs_union_preserves_first_occurrence_order() {
        let mut a = policy("a", true);
        a.permissions.blocked_globs = vec!["**/.env".into(), "**/*.pem".into()];
        let mut b = policy("b", true);
        b.permissions.blocked_globs = vec!["**/*.pem".into(), "**/id_rsa".into()];
        let baseline = compute_strictest_baseline(&[a, b], None);
        assert_eq!(
            baseline.permissions.blocked_globs,
            vec!["**/.env".to_string(), "**/*.pem".to_string(), "**/id_rsa".to_string()]
        );
    }

    #[test]
    fn baseline_tool_rules_keyed_by_pattern_stricter_wins() {
        let mut a = policy("a", true);
        a.harnesses.insert(
            "claude".into(),
            HarnessConfig {
                tool_rules: vec![ToolRule { pattern: "Bash".into(), decision: RuleDecision::Allow }],
                ..Default::default()
            },
        );
        let mut b = policy("b", true);
        b.harnesses.insert(
            "claude".into(),
            HarnessConfig {
                tool_rules: vec![ToolRule { pattern: "Bash".into(), decision: RuleDecision::Deny }],
                ..Default::default()
            },
        );
        let baseline = compute_strictest_baseline(&[a, b], Some("claude"));
        let claude = baseline.harnesses.get("claude").unwrap();
        assert_eq!(claude.tool_rules.len(), 1);
        assert_eq!(claude.tool_rules[0].decision, RuleDecision::Deny);
    }

    #[test]
    fn resolve_override_replaces_command_rules_entirely() {
        let mut base = policy("a", true);
        base.permissions.command_rules =
            Some(vec![CommandRule { pattern: "rm".into(), decision: RuleDecision::Deny, reason: None }]);
        let mut ovr = policy("a", true);
        ovr.permissions.command_rules = Some(vec![]);
        let effective = resolve_policy(&base, Some(&ovr));
        assert_eq!(effective.permissions.command_rules, Some(vec![]));
    }

    #[test]
    fn resolve_with_no_override_returns_base_unchanged() {
        let base = policy("a", true);
        let effective = resolve_policy(&base, None);
        assert_eq!(effective, base);
    }
}
