//! Process-wide decision observability: an installable `PolicyObserver`, a
//! low-cardinality in-process metrics registry, and an audit sink — carried
//! forward from the engine's original observability hooks and retargeted at
//! the new `Decision`/`ActionClass` types.

use crate::model::{ActionClass, Decision, Verdict};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock, RwLock};

/// Observer invoked for each policy decision emitted by `evaluate`.
///
/// Install an implementation via [`set_observer()`] to receive callbacks.
/// Implementations must be cheap and non-blocking; this hook is primarily
/// intended for tests and in-process metrics bridging (see `latch-telemetry`).
pub trait PolicyObserver: Send + Sync {
    /// Called on every decision, identified by the tool name it concerned.
    fn on_decision(&self, tool_name: &str, action_class: ActionClass, decision: &Decision);
}

static OBSERVER: OnceLock<RwLock<Option<Arc<dyn PolicyObserver>>>> = OnceLock::new();

/// Install or clear the global policy observer.
pub fn set_observer(observer: Option<Arc<dyn PolicyObserver>>) {
    let cell = OBSERVER.get_or_init(|| RwLock::new(None));
    *cell.write().expect("observer write lock poisoned") = observer;
}

/// In-process counters for policy decisions keyed by `{action_class, verdict}`.
#[derive(Default)]
pub struct PolicyMetrics {
    inner: Mutex<HashMap<String, u64>>,
}

impl PolicyMetrics {
    fn key(action_class: ActionClass, verdict: Verdict, needs_prompt: bool) -> String {
        let ac = match action_class {
            ActionClass::Read => "read",
            ActionClass::Write => "write",
            ActionClass::Execute => "execute",
            ActionClass::Send => "send",
        };
        let v = match verdict {
            Verdict::Allow if needs_prompt => "allow_needs_prompt",
            Verdict::Allow => "allow",
            Verdict::Deny => "deny",
        };
        format!("{ac}:{v}")
    }

    /// Read the current count for a given `{action_class, verdict}` pair.
    #[must_use]
    pub fn count(&self, action_class: ActionClass, verdict: Verdict, needs_prompt: bool) -> u64 {
        let key = Self::key(action_class, verdict, needs_prompt);
        self.inner.lock().expect("metrics lock poisoned").get(&key).copied().unwrap_or(0)
    }

    fn inc(&self, action_class: ActionClass, decision: &Decision) {
        let key = Self::key(action_class, decision.verdict, decision.needs_prompt);
        *self.inner.lock().expect("metrics lock poisoned").entry(key).or_insert(0) += 1;
    }
}

static METRICS: OnceLock<PolicyMetrics> = OnceLock::new();

/// Access the global policy metrics registry.
pub fn policy_metrics() -> &'static PolicyMetrics {
    METRICS.get_or_init(PolicyMetrics::default)
}

/// A single recorded decision, kept by the process-global audit sink.
#[derive(Debug, Clone)]
pub struct AuditRecord {
    /// Tool name the decision concerned.
    pub tool_name: String,
    /// Action class the tool was classified as.
    pub action_class: ActionClass,
    /// The decision itself.
    pub decision: Decision,
}

/// Handle for draining captured audit records. Cheap to clone; thread-safe.
#[derive(Clone)]
pub struct AuditSink {
    inner: Arc<Mutex<Vec<AuditRecord>>>,
}

impl AuditSink {
    /// Drain and return all captured audit records.
    pub fn drain(&self) -> Vec<AuditRecord> {
        std::mem::take(&mut *self.inner.lock().expect("audit lock poisoned"))
    }
}

static AUDIT: OnceLock<AuditSink> = OnceLock::new();

/// Install (or retrieve) the process-global audit sink.
pub fn install_audit_sink() -> AuditSink {
    if let Some(s) = AUDIT.get() {
        return s.clone();
    }
    let sink = AuditSink { inner: Arc::new(Mutex::new(Vec::new())) };
    let _ = AUDIT.set(sink.clone());
    sink
}

/// Notify the observer, bump metrics, and push an audit record for a
/// decision just produced by `evaluate`. Called by `latch-server` after each
/// terminal verdict (direct or post-approval).
pub fn record_decision(tool_name: &str, action_class: ActionClass, decision: &Decision) {
    policy_metrics().inc(action_class, decision);
    if let Some(lock) = OBSERVER.get() {
        if let Some(obs) = lock.read().expect("observer lock poisoned").as_ref() {
            obs.on_decision(tool_name, action_class, decision);
        }
    }
    if let Some(sink) = AUDIT.get() {
        sink.inner.lock().expect("audit lock poisoned").push(AuditRecord {
            tool_name: tool_name.to_string(),
            action_class,
            decision: decision.clone(),
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_count_by_action_class_and_verdict() {
        let before = policy_metrics().count(ActionClass::Execute, Verdict::Deny, false);
        record_decision("Bash", ActionClass::Execute, &Decision::deny("x"));
        let after = policy_metrics().count(ActionClass::Execute, Verdict::Deny, false);
        assert_eq!(after, before + 1);
    }

    #[test]
    fn audit_sink_captures_records() {
        let sink = install_audit_sink();
        sink.drain();
        record_decision("Write", ActionClass::Write, &Decision::allow());
        let records = sink.drain();
        assert!(records.iter().any(|r| r.tool_name == "Write"));
    }
}
