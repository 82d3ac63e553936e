//! Loopback authorization HTTP server. Binds `127.0.0.1:0` and serves
//! `/authorize`, `/notify`, `/feed`, `/secrets/resolve`, and `/healthz`
//! behind a bearer secret the caller supplies when constructing
//! [`state::AppState`] (see [`random_secret`] to generate one).
//!
//! Replaces the gRPC `OrchestratorService` the module used to host: state
//! lives in an `Arc<AppState>` passed as axum `State`, not a module-level
//! singleton, so multiple server instances (as in tests) never share
//! secrets, sessions, or pending approvals.

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod auth;
pub mod error;
pub mod routes;
pub mod secrets;
pub mod session;
pub mod settings;
pub mod state;
pub mod ui;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::routing::any;
use axum::Router;
use rand::RngCore;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub use error::ServerError;
pub use session::RegisteredSession;
pub use state::AppState;

/// Request bodies over this size are rejected with 413 before a handler
/// ever runs.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Generate a fresh random bearer secret (64 hex characters, 256 bits of
/// entropy). Callers construct `AppState` with this before binding.
#[must_use]
pub fn random_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// A running authorization server instance. [`stop`] resolves every
/// pending approval as denied and stops accepting connections.
///
/// [`stop`]: AuthzServer::stop
pub struct AuthzServer {
    state: Arc<AppState>,
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl AuthzServer {
    /// Bind a fresh loopback listener and start serving in the background
    /// using the given, already-constructed, application state.
    ///
    /// # Errors
    ///
    /// Returns an error if the loopback listener cannot be bound.
    pub async fn bind(state: Arc<AppState>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let app = router(Arc::clone(&state));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let server_state = Arc::clone(&state);
        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "authorization server exited with error");
            }
            server_state.coordinator.resolve_all();
        });

        Ok(Self { state, addr, shutdown_tx: Some(shutdown_tx), handle: Some(handle) })
    }

    /// Local socket address the server is listening on.
    #[must_use]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Port the server is listening on.
    #[must_use]
    pub fn port(&self) -> u16 {
        self.addr.port()
    }

    /// The bearer secret clients must present.
    #[must_use]
    pub fn secret(&self) -> &str {
        &self.state.secret
    }

    /// Application state, for registering sessions or inspecting stores.
    #[must_use]
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Stop accepting connections and deny every pending approval.
    pub async fn stop(mut self) {
        self.state.coordinator.resolve_all();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

fn router(state: Arc<AppState>) -> Router {
    let authenticated = Router::new()
        .route("/authorize/:session_id", any(routes::authorize))
        .route("/notify/:session_id", any(routes::notify))
        .route("/feed/:session_id", any(routes::feed))
        .route("/secrets/resolve", any(routes::resolve_secrets))
        .route_layer(axum::middleware::from_fn_with_state(
            Arc::clone(&state),
            auth::require_bearer_auth,
        ));

    Router::new()
        .route("/healthz", any(routes::healthz))
        .merge(authenticated)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secrets::EnvSecretVault;
    use crate::settings::InMemorySettingsProvider;
    use latch_activity::InMemoryActivityStore;
    use latch_approval::ApprovalCoordinator;
    use latch_core::clock::SystemClock;
    use latch_policy::InMemoryPolicyStore;

    fn test_state(secret: &str) -> Arc<AppState> {
        AppState::new(
            secret.to_string(),
            Arc::new(InMemoryPolicyStore::default()),
            Arc::new(InMemoryActivityStore::default()),
            ApprovalCoordinator::new(),
            Arc::new(InMemorySettingsProvider::new()),
            Arc::new(EnvSecretVault),
            Arc::new(SystemClock),
        )
    }

    #[tokio::test]
    async fn bind_assigns_a_loopback_port() {
        let server = AuthzServer::bind(test_state("sekret")).await.unwrap();
        assert!(server.port() > 0);
        server.stop().await;
    }
}
