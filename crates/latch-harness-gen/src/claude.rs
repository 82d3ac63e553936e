//! Claude Code generator: `.claude/settings.json` plus an optional
//! `PreToolUse` hook script that calls out to the authorization server
//! while still letting Claude's own terminal prompt drive user
//! confirmation (the allowlist + supervisor-drives-terminal strategy; see
//! the crate's design notes on why this was picked over a "skip
//! permissions" strategy).

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::Path;

use latch_policy::{PolicyDocument, RuleDecision};
use serde_json::{json, Map, Value};

use crate::{validate_session_id, ArtefactPaths, AuthzOptions, GeneratorError, HarnessConfigGenerator};

const GENERATED_HEADER: &str = "_generated_by_latch";

/// Generator for Claude Code.
#[derive(Debug, Default)]
pub struct ClaudeGenerator;

fn deny_entries(policy: &PolicyDocument) -> Vec<String> {
    let p = &policy.permissions;
    let mut deny = Vec::new();
    if !p.allow_bash {
        deny.push("Bash".to_string());
    }
    if !p.allow_file_write {
        deny.push("Write".to_string());
        deny.push("Edit".to_string());
    }
    if !p.allow_network {
        deny.push("WebFetch".to_string());
        deny.push("WebSearch".to_string());
    }
    for glob in &p.blocked_globs {
        deny.push(format!("Write({glob})"));
        deny.push(format!("Edit({glob})"));
        deny.push(format!("Read({glob})"));
    }
    if let Some(harness) = policy.harnesses.get("claude") {
        for rule in &harness.tool_rules {
            if rule.decision == RuleDecision::Deny {
                deny.push(rule.pattern.clone());
            }
        }
    }
    deny
}

fn allow_entries(policy: &PolicyDocument) -> Vec<String> {
    let Some(harness) = policy.harnesses.get("claude") else { return Vec::new() };
    harness
        .tool_rules
        .iter()
        .filter(|r| r.decision == RuleDecision::Allow)
        .map(|r| r.pattern.clone())
        .collect()
}

fn merge_settings_json(existing: &str, permissions: Value, hooks: Option<Value>) -> Result<String, GeneratorError> {
    let mut root: Map<String, Value> = if existing.trim().is_empty() {
        Map::new()
    } else {
        match serde_json::from_str::<Value>(existing) {
            Ok(Value::Object(m)) => m,
            Ok(_) | Err(_) => return Err(GeneratorError::Parse("existing settings.json is not an object".into())),
        }
    };
    root.insert("permissions".to_string(), permissions);
    if let Some(hooks) = hooks {
        root.insert("hooks".to_string(), hooks);
    }
    let mut out = serde_json::to_string_pretty(&Value::Object(root)).map_err(|e| GeneratorError::Parse(e.to_string()))?;
    out.push('\n');
    Ok(out)
}

const AUTHZ_SCRIPT: &str = r#"#!/bin/sh
# generated; do not edit
TOOL_NAME="$1"
RESPONSE=$(curl -s -o /dev/null -w "%{http_code}" --connect-timeout 3 --max-time 5 \
  -H "Authorization: Bearer ${LATCH_AUTHZ_SECRET}" \
  -H "Content-Type: application/json" \
  -d "{\"tool_name\":\"${TOOL_NAME}\"}" \
  "${LATCH_AUTHZ_URL}/authorize/${LATCH_SESSION_ID}" 2>/dev/null)
case "$RESPONSE" in
  200)
    echo '{"decision":"continue"}'
    exit 0
    ;;
  403)
    echo '{"decision":"block"}'
    exit 2
    ;;
  *)
    echo '{"decision":"continue"}'
    exit 0
    ;;
esac
"#;

impl HarnessConfigGenerator for ClaudeGenerator {
    fn enforce(
        &self,
        policy: &PolicyDocument,
        dir: &Path,
        authz: Option<&AuthzOptions>,
    ) -> Result<ArtefactPaths, GeneratorError> {
        if let Some(a) = authz {
            validate_session_id(&a.session_id)?;
        }

        let claude_dir = dir.join(".claude");
        fs::create_dir_all(&claude_dir)?;

        let permissions = json!({
            GENERATED_HEADER: "generated; do not edit",
            "deny": deny_entries(policy),
            "allow": allow_entries(policy),
        });

        let mut hooks = None;
        let mut paths = Vec::new();
        let settings_path = claude_dir.join("settings.json");

        if let Some(a) = authz {
            let script_path = claude_dir.join("latch-authz.sh");
            fs::write(&script_path, AUTHZ_SCRIPT)?;
            let mut perms = fs::metadata(&script_path)?.permissions();
            perms.set_mode(0o755);
            fs::set_permissions(&script_path, perms)?;
            paths.push(script_path.clone());

            hooks = Some(json!({
                "PreToolUse": [{
                    "matcher": "*",
                    "hooks": [{
                        "type": "command",
                        "command": script_path.display().to_string(),
                    }],
                }],
            }));
        }

        let existing = fs::read_to_string(&settings_path).unwrap_or_default();
        let merged = merge_settings_json(&existing, permissions, hooks)?;
        fs::write(&settings_path, merged)?;
        paths.push(settings_path);

        Ok(paths)
    }

    fn launch_flags(&self, _policy: &PolicyDocument) -> Vec<String> {
        Vec::new()
    }
}
