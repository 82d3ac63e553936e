//! Auto-accept policy: whether a session's prompts are answered by a human
//! or accepted automatically, per the approval coordinator's "auto-accept"
//! mode.

use dashmap::DashMap;
use latch_core::token::SessionId;

/// Answers "should prompts for this session be auto-accepted?".
pub trait SettingsProvider: Send + Sync {
    /// `None` and `Some(true)` both mean auto-accept; only `Some(false)`
    /// routes the prompt to a human.
    fn auto_accept(&self, session_id: &SessionId) -> Option<bool>;
}

/// In-memory per-session auto-accept flags, defaulting to "ask a human"
/// for any session that never set one explicitly.
#[derive(Debug, Default)]
pub struct InMemorySettingsProvider {
    flags: DashMap<SessionId, bool>,
}

impl InMemorySettingsProvider {
    /// Create an empty provider; every session defaults to `None`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the auto-accept flag for a session.
    pub fn set(&self, session_id: SessionId, auto_accept: bool) {
        self.flags.insert(session_id, auto_accept);
    }
}

impl SettingsProvider for InMemorySettingsProvider {
    fn auto_accept(&self, session_id: &SessionId) -> Option<bool> {
        self.flags.get(session_id).map(|v| *v)
    }
}
