//! Approval Coordinator: parks an in-flight `/authorize` HTTP response while
//! the user is asked to confirm or deny a prompt-requiring tool call, with
//! timeout fallback and session-wide / shutdown-wide cancellation.
//!
//! Resolution happens exactly once, from exactly one of four sources: user
//! approval, user denial, the per-approval timer, or a session-unregister /
//! server-stop sweep. Each path clears the timer, removes the registry
//! entry, and hands the caller an `ApprovalOutcome` over a `oneshot` channel
//! — the async equivalent of "hold the response object in a map and
//! complete it from the resolve callback".

#![deny(unsafe_code)]
#![warn(missing_docs)]

use dashmap::DashMap;
use latch_core::clock::{process_clock, Clock};
use latch_core::token::{ApprovalId, SessionId};
use latch_policy::evaluator::ToolInput;
use latch_policy::{ActionClass, Decision, Risk, Verdict};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{info, instrument, warn};

/// Default approval timeout: 120 seconds.
pub const APPROVAL_TIMEOUT_MS: u64 = 120_000;

/// A parked authorization request awaiting user confirmation.
#[derive(Debug, Clone)]
pub struct PendingApproval {
    /// Freshly generated short random token.
    pub id: ApprovalId,
    /// Session the request belongs to.
    pub session_id: SessionId,
    /// Tool name under evaluation.
    pub tool_name: String,
    /// Tool input under evaluation.
    pub tool_input: ToolInput,
    /// Action class the tool was classified as.
    pub action_class: ActionClass,
    /// Risk tier (derived from `action_class`).
    pub risk: Risk,
    /// Harness the session is bound to.
    pub harness_id: String,
    /// Millis since epoch at creation.
    pub created_at: u64,
    /// Timeout duration in milliseconds.
    pub timeout_ms: u64,
    /// Verdict applied when the timer fires: deny for high risk, else allow.
    pub timeout_default: Verdict,
}

/// Why a `PendingApproval` was resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionSource {
    /// The user explicitly approved.
    UserApproved,
    /// The user explicitly denied.
    UserDenied,
    /// The approval timer fired before the user responded.
    Timeout,
    /// The owning session was unregistered.
    SessionUnregistered,
    /// The server was shut down.
    ServerStopped,
}

/// The terminal outcome delivered to whoever is holding the parked response.
#[derive(Debug, Clone)]
pub struct ApprovalOutcome {
    /// Resolved verdict.
    pub verdict: Verdict,
    /// Human-readable reason matching the resolution source.
    pub reason: String,
    /// Which of the four sources resolved this approval.
    pub source: ResolutionSource,
}

impl ApprovalOutcome {
    fn from_source(source: ResolutionSource, timeout_default: Verdict) -> Self {
        let (verdict, reason) = match source {
            ResolutionSource::UserApproved => (Verdict::Allow, "User approved."),
            ResolutionSource::UserDenied => (Verdict::Deny, "User denied."),
            ResolutionSource::Timeout => (
                timeout_default,
                if timeout_default == Verdict::Deny {
                    "User denied."
                } else {
                    "Auto-accepted."
                },
            ),
            ResolutionSource::SessionUnregistered => (Verdict::Deny, "Session unregistered."),
            ResolutionSource::ServerStopped => (Verdict::Deny, "Server stopped."),
        };
        Self { verdict, reason: reason.to_string(), source }
    }
}

/// Errors raised by coordinator operations.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// No pending approval with the given id exists (already resolved, or
    /// never registered).
    #[error("unknown or already-resolved approval: {0}")]
    Unknown(ApprovalId),
}

/// Decide whether a just-evaluated decision requires user confirmation.
///
/// - `needs_prompt` already set on the decision → yes.
/// - Else if `confirm_destructive` is false → no.
/// - Else yes iff `action_class` is `Execute` or `Write`.
#[must_use]
pub fn requires_prompt(decision: &Decision, confirm_destructive: bool, action_class: ActionClass) -> bool {
    if decision.needs_prompt {
        return true;
    }
    if !confirm_destructive {
        return false;
    }
    matches!(action_class, ActionClass::Execute | ActionClass::Write)
}

struct Entry {
    approval: PendingApproval,
    sender: Option<oneshot::Sender<ApprovalOutcome>>,
    timer: JoinHandle<()>,
}

/// Coordinates all in-flight pending approvals for one authorization server.
pub struct ApprovalCoordinator {
    pending: DashMap<ApprovalId, Entry>,
    clock: Arc<dyn Clock>,
}

impl ApprovalCoordinator {
    /// Construct a coordinator using the process-wide clock.
    #[must_use]
    pub fn new() -> Arc<Self> {
        Self::with_clock(process_clock())
    }

    /// Construct a coordinator using an explicit clock (tests inject a
    /// `VirtualClock` to control `created_at`/`timestamp` values without
    /// depending on wall-clock time).
    #[must_use]
    pub fn with_clock(clock: Arc<dyn Clock>) -> Arc<Self> {
        Arc::new(Self { pending: DashMap::new(), clock })
    }

    /// Number of approvals currently parked.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Park a new pending approval and start its timeout timer. Returns the
    /// approval id and a receiver that resolves exactly once.
    #[instrument(skip(self, tool_input), fields(tool_name = %tool_name))]
    pub fn park(
        self: &Arc<Self>,
        session_id: SessionId,
        tool_name: String,
        tool_input: ToolInput,
        action_class: ActionClass,
        harness_id: String,
        timeout_ms: u64,
    ) -> (ApprovalId, oneshot::Receiver<ApprovalOutcome>) {
        let id = ApprovalId::generate();
        let risk = action_class.risk();
        let timeout_default = if risk == Risk::High { Verdict::Deny } else { Verdict::Allow };
        let approval = PendingApproval {
            id: id.clone(),
            session_id,
            tool_name,
            tool_input,
            action_class,
            risk,
            harness_id,
            created_at: self.clock.now_ms(),
            timeout_ms,
            timeout_default,
        };
        let (tx, rx) = oneshot::channel();

        let coordinator = Arc::clone(self);
        let timer_id = id.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(std::time::Duration::from_millis(timeout_ms)).await;
            coordinator.resolve(&timer_id, ResolutionSource::Timeout);
        });

        self.pending.insert(id.clone(), Entry { approval, sender: Some(tx), timer });
        (id, rx)
    }

    /// Inspect a pending approval without resolving it.
    #[must_use]
    pub fn get(&self, id: &ApprovalId) -> Option<PendingApproval> {
        self.pending.get(id).map(|e| e.approval.clone())
    }

    /// List every approval id currently parked, in no particular order.
    /// Used by a UI to enumerate what a human still needs to decide on.
    #[must_use]
    pub fn pending_ids(&self) -> Vec<ApprovalId> {
        self.pending.iter().map(|e| e.key().clone()).collect()
    }

    /// Resolve a pending approval from `source`. A no-op (returns
    /// `Err(ApprovalError::Unknown)`) if the approval was already resolved —
    /// this is how the "exactly once" guarantee holds when the timer and an
    /// explicit user decision race.
    #[instrument(skip(self))]
    pub fn resolve(&self, id: &ApprovalId, source: ResolutionSource) -> Result<(), ApprovalError> {
        let Some((_, mut entry)) = self.pending.remove(id) else {
            return Err(ApprovalError::Unknown(id.clone()));
        };
        entry.timer.abort();
        let outcome = ApprovalOutcome::from_source(source, entry.approval.timeout_default);
        if let Some(sender) = entry.sender.take() {
            // Writing to an already-closed connection is a no-op; the
            // caller may have disconnected, but the audit record the
            // caller writes from this outcome still stands.
            let _ = sender.send(outcome);
        }
        info!(approval_id = %id, ?source, "approval resolved");
        Ok(())
    }

    /// Resolve every pending approval belonging to `session_id` as deny.
    /// Used by `unregisterSession`.
    pub fn resolve_all_for_session(&self, session_id: &SessionId) -> usize {
        let ids: Vec<ApprovalId> = self
            .pending
            .iter()
            .filter(|e| &e.approval.session_id == session_id)
            .map(|e| e.key().clone())
            .collect();
        let mut resolved = 0;
        for id in ids {
            if self.resolve(&id, ResolutionSource::SessionUnregistered).is_ok() {
                resolved += 1;
            }
        }
        resolved
    }

    /// Resolve every pending approval as deny. Used by server `stop()`.
    pub fn resolve_all(&self) -> usize {
        let ids: Vec<ApprovalId> = self.pending.iter().map(|e| e.key().clone()).collect();
        let mut resolved = 0;
        for id in ids {
            if self.resolve(&id, ResolutionSource::ServerStopped).is_ok() {
                resolved += 1;
            } else {
                warn!(approval_id = %id, "approval vanished during shutdown sweep");
            }
        }
        resolved
    }
}
