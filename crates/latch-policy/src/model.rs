//! Policy data model: the types a `PolicyDocument` is built from, and the
//! small enums (`ActionClass`, `Risk`, `Decision`) the evaluator produces.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A decision a `CommandRule`, `ToolRule`, or `McpServerRule` may carry, and
/// the three-valued result of evaluating one against a tool call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleDecision {
    /// Permit the action.
    Allow,
    /// Require user confirmation before proceeding.
    Prompt,
    /// Block the action outright.
    Deny,
}

impl RuleDecision {
    /// Strictness ordering used by merge rules: `Deny` > `Prompt` > `Allow`.
    /// Larger is stricter.
    #[must_use]
    pub const fn strictness(self) -> u8 {
        match self {
            Self::Allow => 0,
            Self::Prompt => 1,
            Self::Deny => 2,
        }
    }

    /// Return the stricter of two decisions (ties keep `self`).
    #[must_use]
    pub fn stricter(self, other: Self) -> Self {
        if other.strictness() > self.strictness() {
            other
        } else {
            self
        }
    }
}

/// A rule matching a shell command string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandRule {
    /// Case-insensitive regular expression matched against the candidate
    /// shell command string.
    pub pattern: String,
    /// Decision to apply on match.
    pub decision: RuleDecision,
    /// Optional human-readable reason surfaced to the user/UI.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// A rule matching a tool name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolRule {
    /// Tool name pattern: exact (case-insensitive) or `prefix*` (trailing
    /// wildcard only).
    pub pattern: String,
    /// Decision to apply on match.
    pub decision: RuleDecision,
}

/// A rule matching an MCP server namespace (`mcp__<server>__<tool>`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct McpServerRule {
    /// MCP server name, matched case-insensitively.
    pub server: String,
    /// Decision to apply on match.
    pub decision: RuleDecision,
}

/// Codex-specific approval mode vocabulary (source side of the mapping in
/// the external-interfaces table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ApprovalMode {
    /// Never ask; equivalent to Codex `never`.
    Auto,
    /// Only for read-only operations; equivalent to Codex `on-request`.
    ReadOnly,
    /// Ask for anything not explicitly allowed; equivalent to Codex `untrusted`.
    Full,
}

/// Codex-specific sandbox strictness (source side of the mapping table).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SandboxMode {
    /// Equivalent to Codex `read-only`.
    Strict,
    /// Equivalent to Codex `workspace-write`.
    Moderate,
    /// Equivalent to Codex `danger-full-access`.
    Permissive,
}

/// Per-harness configuration carried inside a `PolicyDocument`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Ordered tool-name rules, evaluated in order, first match wins.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_rules: Vec<ToolRule>,
    /// Ordered MCP-server rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mcp_server_rules: Vec<McpServerRule>,
    /// Legacy allowlist: when present, tool names absent from it are denied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allowed_tools: Option<Vec<String>>,
    /// Legacy denylist: tool names present in it are always denied.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied_tools: Vec<String>,
    /// Codex: how aggressively to seek approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub approval_mode: Option<ApprovalMode>,
    /// Codex: sandbox strictness.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sandbox: Option<SandboxMode>,
    /// Codex: whether the child process inherits the parent's environment
    /// (`core` or `none`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub env_inherit: Option<String>,
    /// Codex: environment variable name prefixes to strip even when
    /// inheriting (`AWS_`, `GCP_`, …).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub env_exclude: Vec<String>,
    /// Codex: named feature gates, e.g. `shell_tool`, `web_search`.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub features: BTreeMap<String, bool>,
    /// Codex: MCP tools to disable globally, fully qualified
    /// (`server/tool` or `server/*`).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub disabled_mcp_tools: Vec<String>,
}

/// Boolean and structural permission flags that gate broad classes of tool
/// use. Always present on a `PolicyDocument`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permissions {
    /// Permit shell execution (`ActionClass::Execute`).
    pub allow_bash: bool,
    /// Permit outbound network access (`ActionClass::Send`).
    pub allow_network: bool,
    /// Permit file writes (`ActionClass::Write`).
    pub allow_file_write: bool,
    /// Require user confirmation before destructive (write/execute) calls
    /// that no rule has already resolved.
    pub confirm_destructive: bool,
    /// Ordered glob patterns; paths matching any are denied for
    /// read/write/edit tool calls.
    #[serde(default)]
    pub blocked_globs: Vec<String>,
    /// Ordered command rules. `None` means "use the built-in defaults";
    /// `Some(vec![])` means "opt out of all defaults".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command_rules: Option<Vec<CommandRule>>,
}

impl Default for Permissions {
    fn default() -> Self {
        Self {
            allow_bash: true,
            allow_network: true,
            allow_file_write: true,
            confirm_destructive: false,
            blocked_globs: Vec::new(),
            command_rules: None,
        }
    }
}

/// A complete, addressable policy document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PolicyDocument {
    /// Unique identifier.
    pub id: String,
    /// Human-readable name.
    #[serde(default)]
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Always-present permission flags and sequences.
    pub permissions: Permissions,
    /// Per-harness configuration, keyed by harness id (`claude`, `codex`,
    /// `openclaw`, …). A `BTreeMap` is used so iteration order (and
    /// therefore baseline-merge order) is deterministic.
    #[serde(default)]
    pub harnesses: BTreeMap<String, HarnessConfig>,
}

impl PolicyDocument {
    /// Construct a minimal named policy with default permissions and no
    /// per-harness configuration.
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            permissions: Permissions::default(),
            harnesses: BTreeMap::new(),
        }
    }
}

/// Four-valued classification a tool name collapses to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionClass {
    /// Reading data: file reads, searches, listings.
    Read,
    /// Writing or mutating data: file writes/edits.
    Write,
    /// Running a command or subprocess.
    Execute,
    /// Sending data out: network fetches, publishing, notifications.
    Send,
}

impl ActionClass {
    /// Fixed mapping from action class to risk tier.
    #[must_use]
    pub const fn risk(self) -> Risk {
        match self {
            Self::Read => Risk::Low,
            Self::Write | Self::Send => Risk::Medium,
            Self::Execute => Risk::High,
        }
    }
}

/// Risk tier associated with an `ActionClass`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Risk {
    /// Low risk: read-only.
    Low,
    /// Medium risk: write or outbound send.
    Medium,
    /// High risk: execution.
    High,
}

/// A terminal allow/deny verdict, the two values an `ActivityEvent` and an
/// HTTP `/authorize` response can carry (as opposed to `RuleDecision`, whose
/// `Prompt` value is resolved to one of these before recording).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Verdict {
    /// Permitted.
    Allow,
    /// Blocked.
    Deny,
}

/// Outcome of evaluating a tool call against an effective policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Decision {
    /// Terminal allow/deny verdict.
    pub verdict: Verdict,
    /// Human-readable reason, present on deny and on several allow paths
    /// (e.g. "Auto-accepted.").
    pub reason: Option<String>,
    /// Set only alongside `Verdict::Allow`: the call still requires user
    /// confirmation before the effect is allowed to proceed.
    pub needs_prompt: bool,
}

impl Decision {
    /// Construct an unconditional allow with no reason.
    #[must_use]
    pub const fn allow() -> Self {
        Self { verdict: Verdict::Allow, reason: None, needs_prompt: false }
    }

    /// Construct an allow that still requires a user prompt.
    #[must_use]
    pub const fn allow_needs_prompt(reason: Option<String>) -> Self {
        Self { verdict: Verdict::Allow, reason, needs_prompt: true }
    }

    /// Construct a deny with a reason.
    #[must_use]
    pub fn deny(reason: impl Into<String>) -> Self {
        Self { verdict: Verdict::Deny, reason: Some(reason.into()), needs_prompt: false }
    }
}
