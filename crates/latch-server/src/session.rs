//! Session registration interface (in-process, not persisted).

use latch_core::token::SessionId;
use latch_policy::PolicyDocument;

/// A registered harness session: bound to a harness and a policy, with an
/// optional per-session override layered on top at resolution time.
#[derive(Debug, Clone)]
pub struct RegisteredSession {
    /// Session identifier.
    pub session_id: SessionId,
    /// Harness id (`claude`, `codex`, `openclaw`, …).
    pub harness_id: String,
    /// Id of the base policy this session resolves against.
    pub policy_id: String,
    /// Optional per-session override merged on top of the base policy.
    pub policy_override: Option<PolicyDocument>,
}
