//! OpenClaw generator: `openclaw.json` tool allow/deny lists, plus a
//! `before_tool_call` plugin module and an exec-approvals file when authz
//! is active, so OpenClaw does not double-prompt on top of the core.

use std::fs;
use std::path::Path;

use latch_policy::{PolicyDocument, RuleDecision};
use serde_json::{json, Value};

use crate::{validate_session_id, ArtefactPaths, AuthzOptions, GeneratorError, HarnessConfigGenerator};

/// Generator for OpenClaw.
#[derive(Debug, Default)]
pub struct OpenClawGenerator;

fn allow_deny_lists(policy: &PolicyDocument) -> (Vec<String>, Vec<String>) {
    let p = &policy.permissions;
    let mut deny = Vec::new();
    if !p.allow_bash {
        deny.push("bash".to_string());
    }
    if !p.allow_file_write {
        deny.push("write".to_string());
    }
    if !p.allow_network {
        deny.push("fetch".to_string());
    }
    let mut allow = Vec::new();
    if let Some(harness) = policy.harnesses.get("openclaw") {
        for rule in &harness.tool_rules {
            match rule.decision {
                RuleDecision::Deny => deny.push(rule.pattern.clone()),
                RuleDecision::Allow => allow.push(rule.pattern.clone()),
                RuleDecision::Prompt => {}
            }
        }
    }
    (allow, deny)
}

fn plugin_module(authz: &AuthzOptions, confirm_destructive: bool) -> String {
    let timeout_ms = if confirm_destructive { 120_000 } else { 5_000 };
    format!(
        r#"// generated; do not edit
const http = require('http');

module.exports = function latchAuthzPlugin() {{
  return {{
    before_tool_call(event, context) {{
      return new Promise((resolve) => {{
        const body = JSON.stringify({{ toolName: event.toolName, args: event.args }});
        const req = http.request(
          {{
            host: '127.0.0.1',
            port: {port},
            path: '/authorize/{session_id}',
            method: 'POST',
            timeout: {timeout_ms},
            headers: {{
              'Authorization': 'Bearer ' + process.env.LATCH_AUTHZ_SECRET,
              'Content-Type': 'application/json',
              'Content-Length': Buffer.byteLength(body),
            }},
          }},
          (res) => {{
            if (res.statusCode === 200) {{
              resolve({{ action: 'allow' }});
            }} else {{
              resolve({{ action: 'block', reason: 'denied by authorization server' }});
            }}
          }},
        );
        req.on('error', () => resolve({{ action: 'block', reason: 'authorization server unreachable' }}));
        req.on('timeout', () => {{ req.destroy(); resolve({{ action: 'block', reason: 'authorization server timed out' }}); }});
        req.write(body);
        req.end();
      }});
    }},
  }};
}};
"#,
        port = authz.port,
        session_id = authz.session_id,
        timeout_ms = timeout_ms,
    )
}

fn exec_approvals() -> Value {
    json!({
        "_generated_by_latch": "generated; do not edit",
        "exec": { "security": "full", "ask": "off" },
        "write": { "security": "full", "ask": "off" },
        "read": { "security": "full", "ask": "off" },
    })
}

impl HarnessConfigGenerator for OpenClawGenerator {
    fn enforce(
        &self,
        policy: &PolicyDocument,
        dir: &Path,
        authz: Option<&AuthzOptions>,
    ) -> Result<ArtefactPaths, GeneratorError> {
        if let Some(a) = authz {
            validate_session_id(&a.session_id)?;
        }

        let mut paths = Vec::new();
        let (allow, deny) = allow_deny_lists(policy);
        let config = json!({
            "_generated_by_latch": "generated; do not edit",
            "tools": { "allow": allow, "deny": deny },
        });
        let config_path = dir.join("openclaw.json");
        let mut rendered = serde_json::to_string_pretty(&config).map_err(|e| GeneratorError::Parse(e.to_string()))?;
        rendered.push('\n');
        fs::write(&config_path, rendered)?;
        paths.push(config_path);

        if let Some(a) = authz {
            let plugin_dir = dir.join(".openclaw/plugins/latch-authz");
            fs::create_dir_all(&plugin_dir)?;
            let index_path = plugin_dir.join("index.js");
            fs::write(&index_path, plugin_module(a, policy.permissions.confirm_destructive))?;
            paths.push(index_path);

            let approvals_dir = dir.join(".openclaw");
            fs::create_dir_all(&approvals_dir)?;
            let approvals_path = approvals_dir.join("exec-approvals.json");
            let mut approvals = serde_json::to_string_pretty(&exec_approvals()).map_err(|e| GeneratorError::Parse(e.to_string()))?;
            approvals.push('\n');
            fs::write(&approvals_path, approvals)?;
            paths.push(approvals_path);
        }

        Ok(paths)
    }

    fn launch_flags(&self, _policy: &PolicyDocument) -> Vec<String> {
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use latch_policy::Permissions;

    #[test]
    fn deny_list_reflects_permission_flags() {
        let mut p = PolicyDocument::new("p1", "t");
        p.permissions = Permissions { allow_bash: false, allow_network: false, ..Permissions::default() };
        let (_, deny) = allow_deny_lists(&p);
        assert!(deny.contains(&"bash".to_string()));
        assert!(deny.contains(&"fetch".to_string()));
    }

    #[test]
    fn enforce_without_authz_only_writes_openclaw_json() {
        let dir = tempfile::tempdir().unwrap();
        let policy = PolicyDocument::new("p1", "t");
        let gen = OpenClawGenerator;
        let paths = gen.enforce(&policy, dir.path(), None).unwrap();
        assert_eq!(paths.len(), 1);
        assert!(paths[0].ends_with("openclaw.json"));
    }

    #[test]
    fn plugin_timeout_follows_confirm_destructive() {
        let authz = AuthzOptions { port: 4455, session_id: "S1".into(), secret: "s".into() };
        assert!(plugin_module(&authz, true).contains("timeout: 120000"));
        assert!(plugin_module(&authz, false).contains("timeout: 5000"));
    }
}
