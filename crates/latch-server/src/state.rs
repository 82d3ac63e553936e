//! Shared application state threaded through every axum handler via
//! `State<Arc<AppState>>`, rather than the module-level singletons the
//! gRPC-era service used.

use std::sync::Arc;

use dashmap::DashMap;
use latch_activity::ActivityStore;
use latch_approval::ApprovalCoordinator;
use latch_core::clock::Clock;
use latch_core::token::SessionId;
use latch_policy::PolicyStore;
use tokio::sync::broadcast;

use crate::secrets::SecretVault;
use crate::session::RegisteredSession;
use crate::settings::SettingsProvider;
use crate::ui::UiEvent;

/// Capacity of the in-process UI feed broadcast channel.
const UI_FEED_CAPACITY: usize = 256;

/// Everything the authorization server's handlers need, shared behind an
/// `Arc` and cloned cheaply per request.
pub struct AppState {
    /// Shared bearer secret every request must present.
    pub secret: String,
    /// Sessions registered for this server instance's lifetime.
    pub sessions: DashMap<SessionId, RegisteredSession>,
    /// Policy documents, keyed by id.
    pub policy_store: Arc<dyn PolicyStore>,
    /// Append-only decision log.
    pub activity_store: Arc<dyn ActivityStore>,
    /// Pending-approval coordinator.
    pub coordinator: Arc<ApprovalCoordinator>,
    /// Per-session auto-accept policy.
    pub settings: Arc<dyn SettingsProvider>,
    /// Secret resolver backing `/secrets/resolve`.
    pub secret_vault: Arc<dyn SecretVault>,
    /// UI feed publisher; handlers hold the sender, `/feed` subscribes.
    pub ui_feed: broadcast::Sender<UiEvent>,
    /// Clock used for timestamps on activity events.
    pub clock: Arc<dyn Clock>,
}

impl AppState {
    /// Build application state from its constituent stores.
    #[must_use]
    pub fn new(
        secret: String,
        policy_store: Arc<dyn PolicyStore>,
        activity_store: Arc<dyn ActivityStore>,
        coordinator: Arc<ApprovalCoordinator>,
        settings: Arc<dyn SettingsProvider>,
        secret_vault: Arc<dyn SecretVault>,
        clock: Arc<dyn Clock>,
    ) -> Arc<Self> {
        let (ui_feed, _) = broadcast::channel(UI_FEED_CAPACITY);
        Arc::new(Self {
            secret,
            sessions: DashMap::new(),
            policy_store,
            activity_store,
            coordinator,
            settings,
            secret_vault,
            ui_feed,
            clock,
        })
    }

    /// Register a session, replacing any prior registration with the same
    /// id (re-registration is allowed; see the data model's session
    /// lifecycle rules).
    pub fn register_session(&self, session: RegisteredSession) {
        self.sessions.insert(session.session_id.clone(), session);
    }

    /// Remove a session and deny every approval still pending for it.
    pub fn unregister_session(&self, session_id: &SessionId) {
        self.sessions.remove(session_id);
        self.coordinator.resolve_all_for_session(session_id);
    }
}
