//! Broadcast feed consumed by `/feed/:sessionId`, fanning out approval and
//! activity notifications to any connected UI.

use latch_activity::ActivityEvent;
use latch_policy::{ActionClass, Risk};
use serde::Serialize;
use tokio::sync::broadcast;

/// Messages published to the UI feed. Serialized with an internally
/// tagged `type` field so a single `/feed` stream can carry all of them.
/// Ids are carried as plain strings; the feed is a display-only channel,
/// not a typed API boundary.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum UiEvent {
    /// A new approval is pending and needs a human decision.
    ApprovalRequest {
        /// Session the approval belongs to.
        session_id: String,
        /// Id of the pending approval.
        approval_id: String,
        /// Tool under evaluation.
        tool_name: String,
        /// Classified action.
        action_class: ActionClass,
        /// Computed risk tier.
        risk: Risk,
    },
    /// A previously pending approval has resolved.
    ApprovalResolved {
        /// Session the approval belonged to.
        session_id: String,
        /// Id of the approval that resolved.
        approval_id: String,
        /// Human-readable outcome.
        reason: String,
    },
    /// A terminal decision was recorded to the activity log.
    Activity(ActivityEvent),
}

/// Shared broadcast sender. Lagging receivers simply miss events; the feed
/// is best-effort UI decoration, not an audit trail (the activity log is).
pub fn channel(capacity: usize) -> (broadcast::Sender<UiEvent>, broadcast::Receiver<UiEvent>) {
    broadcast::channel(capacity)
}
