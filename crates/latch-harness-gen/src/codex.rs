//! Codex generator: `.codex/config.toml` (marker-fenced), a Starlark-subset
//! rules file, and an optional notify shell script wired to `/notify`.

use std::fs;
use std::path::Path;

use latch_policy::{ApprovalMode, PolicyDocument, RuleDecision, SandboxMode};
use once_cell::sync::Lazy;
use regex::Regex;
use toml_edit::{value, Array, Document, Item, Table};

use crate::{validate_session_id, ArtefactPaths, AuthzOptions, GeneratorError, HarnessConfigGenerator};

const START_MARKER: &str = "# latch:mcp:start";
const END_MARKER: &str = "# latch:mcp:end";

/// Generator for the OpenAI Codex CLI.
#[derive(Debug, Default)]
pub struct CodexGenerator;

fn approval_mode_str(mode: ApprovalMode) -> &'static str {
    match mode {
        ApprovalMode::Auto => "never",
        ApprovalMode::ReadOnly => "on-request",
        ApprovalMode::Full => "untrusted",
    }
}

fn sandbox_mode_str(mode: SandboxMode) -> &'static str {
    match mode {
        SandboxMode::Strict => "read-only",
        SandboxMode::Moderate => "workspace-write",
        SandboxMode::Permissive => "danger-full-access",
    }
}

fn disabled_mcp_tools(policy: &PolicyDocument) -> Vec<String> {
    let Some(harness) = policy.harnesses.get("codex") else { return Vec::new() };
    let mut disabled: Vec<String> = harness.disabled_mcp_tools.clone();
    for rule in &harness.tool_rules {
        if rule.decision == RuleDecision::Deny && rule.pattern.starts_with("mcp__") {
            disabled.push(rule.pattern.clone());
        }
    }
    for rule in &harness.mcp_server_rules {
        if rule.decision == RuleDecision::Deny {
            disabled.push(format!("{}/*", rule.server));
        }
    }
    disabled
}

fn render_generated_block(policy: &PolicyDocument) -> String {
    let mut doc = Document::new();
    doc["_generated_by_latch"] = value(true);

    if let Some(harness) = policy.harnesses.get("codex") {
        if let Some(mode) = harness.approval_mode {
            doc["approval_policy"] = value(approval_mode_str(mode));
        }
        if let Some(sandbox) = harness.sandbox {
            doc["sandbox_mode"] = value(sandbox_mode_str(sandbox));
        }

        let mut shell_env = Table::new();
        shell_env["inherit"] = value(harness.env_inherit.clone().unwrap_or_else(|| "core".to_string()));
        if !harness.env_exclude.is_empty() {
            let mut arr = Array::new();
            for e in &harness.env_exclude {
                arr.push(e.as_str());
            }
            shell_env["exclude"] = Item::Value(arr.into());
        }
        doc["shell_environment_policy"] = Item::Table(shell_env);

        if !harness.features.is_empty() {
            let mut features = Table::new();
            for (k, v) in &harness.features {
                features[k] = value(*v);
            }
            doc["features"] = Item::Table(features);
        }
    }

    let disabled = disabled_mcp_tools(policy);
    if !disabled.is_empty() {
        let mut mcp = Table::new();
        let mut arr = Array::new();
        for d in &disabled {
            arr.push(d.as_str());
        }
        mcp["disabled_tools"] = Item::Value(arr.into());
        let mut servers = Table::new();
        servers["latch-policy"] = Item::Table(mcp);
        doc["mcp_servers"] = Item::Table(servers);
    }

    doc.to_string()
}

fn splice_marker_block(existing: &str, block: &str) -> String {
    let fenced = format!("{START_MARKER}\n{block}{END_MARKER}\n");
    match (existing.find(START_MARKER), existing.find(END_MARKER)) {
        (Some(start), Some(end)) if end > start => {
            let end_of_marker = end + END_MARKER.len();
            let mut out = String::new();
            out.push_str(&existing[..start]);
            out.push_str(&fenced);
            let tail = &existing[end_of_marker..];
            out.push_str(tail.trim_start_matches('\n'));
            out
        }
        _ => {
            let mut out = existing.to_string();
            if !out.is_empty() && !out.ends_with('\n') {
                out.push('\n');
            }
            out.push_str(&fenced);
            out
        }
    }
}

static REGEX_META: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.+()\[\]{}^$|\\?]").expect("valid regex"));

fn is_plain_token_prefix(pattern: &str) -> bool {
    !REGEX_META.is_match(pattern) && pattern != "*"
}

fn render_rules_file(policy: &PolicyDocument) -> String {
    let mut lines = vec!["# generated; do not edit".to_string()];

    if let Some(rules) = policy.permissions.command_rules.as_ref() {
        for rule in rules {
            if !is_plain_token_prefix(&rule.pattern) {
                continue;
            }
            let decision = match rule.decision {
                RuleDecision::Allow => "allow",
                RuleDecision::Prompt => "prompt",
                RuleDecision::Deny => "forbidden",
            };
            let justification = rule.reason.clone().unwrap_or_default();
            let tokens: Vec<&str> = rule.pattern.split_whitespace().collect();
            let tokens_str = tokens
                .iter()
                .map(|t| format!("\"{t}\""))
                .collect::<Vec<_>>()
                .join(", ");
            lines.push(format!(
                "prefix_rule(pattern = [{tokens_str}], decision = \"{decision}\", justification = \"{justification}\")"
            ));
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

fn notify_script(authz: &AuthzOptions) -> String {
    format!(
        "#!/bin/sh\n# generated; do not edit\ncurl -s --connect-timeout 3 --max-time 5 \\\n  -H \"Authorization: Bearer ${{LATCH_AUTHZ_SECRET}}\" \\\n  -H \"Content-Type: application/json\" \\\n  -d @- \\\n  \"{}/notify/{}\" >/dev/null 2>&1\n",
        authz.base_url(),
        authz.session_id
    )
}

impl HarnessConfigGenerator for CodexGenerator {
    fn enforce(
        &self,
        policy: &PolicyDocument,
        dir: &Path,
        authz: Option<&AuthzOptions>,
    ) -> Result<ArtefactPaths, GeneratorError> {
        if let Some(a) = authz {
            validate_session_id(&a.session_id)?;
        }

        let codex_dir = dir.join(".codex");
        let rules_dir = codex_dir.join("rules");
        fs::create_dir_all(&rules_dir)?;

        let mut paths = Vec::new();

        let config_path = codex_dir.join("config.toml");
        let existing = fs::read_to_string(&config_path).unwrap_or_default();
        let block = render_generated_block(policy);
        let merged = splice_marker_block(&existing, &block);
        fs::write(&config_path, merged)?;
        paths.push(config_path);

        let rules_path = rules_dir.join("latch-policy.rules");
        fs::write(&rules_path, render_rules_file(policy))?;
        paths.push(rules_path);

        if let Some(a) = authz {
            let script_path = codex_dir.join("latch-notify.sh");
            fs::write(&script_path, notify_script(a))?;
            paths.push(script_path);
        }

        Ok(paths)
    }

    fn launch_flags(&self, policy: &PolicyDocument) -> Vec<String> {
        let mut flags = vec!["--full-auto".to_string()];
        if let Some(harness) = policy.harnesses.get("codex") {
            if let Some(mode) = harness.approval_mode {
                flags.push("--approval-mode".to_string());
                flags.push(approval_mode_str(mode).to_string());
            }
            if let Some(sandbox) = harness.sandbox {
                flags.push("--sandbox".to_string());
                flags.push(sandbox_mode_str(sandbox).to_string());
            }
        }
        flags
    }
}
