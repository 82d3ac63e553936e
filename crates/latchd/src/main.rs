//! `latchd`: the policy-enforcement core daemon. Loads configuration,
//! wires the policy store, activity log, approval coordinator, and
//! authorization server together, and serves until interrupted.

mod config;

use std::path::PathBuf;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use latch_activity::JsonlActivityStore;
use latch_approval::ApprovalCoordinator;
use latch_core::clock::SystemClock;
use latch_core::token::SessionId;
use latch_policy::FilePolicyStore;
use latch_server::state::AppState;
use latch_server::{random_secret, AuthzServer, RegisteredSession};
use latch_server::secrets::EnvSecretVault;
use latch_server::settings::InMemorySettingsProvider;

use config::Config;

#[derive(Debug, Parser)]
#[command(name = "latchd", about = "Policy-enforcement core daemon")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, default_value = "latchd.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Start the authorization server and keep it running until interrupted.
    Serve,
}

#[tokio::main]
async fn main() -> std::process::ExitCode {
    latch_telemetry::init_json_logging();

    let cli = Cli::parse();
    let config = if cli.config.exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("latchd: {e}");
                return std::process::ExitCode::from(1);
            }
        }
    } else {
        Config::default()
    }
    .with_env_overrides();

    match cli.command {
        Command::Serve => match serve(config).await {
            Ok(()) => std::process::ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("latchd: {e}");
                std::process::ExitCode::from(1)
            }
        },
    }
}

async fn serve(config: Config) -> Result<(), Box<dyn std::error::Error>> {
    std::fs::create_dir_all(&config.policy_dir)?;
    let policy_store = Arc::new(FilePolicyStore::open(&config.policy_dir)?);
    let activity_store = Arc::new(JsonlActivityStore::open(&config.activity_log_path)?);
    let coordinator = ApprovalCoordinator::new();
    let settings = Arc::new(InMemorySettingsProvider::new());
    let secret_vault = Arc::new(EnvSecretVault);
    let clock = Arc::new(SystemClock);

    let state = AppState::new(
        random_secret(),
        policy_store,
        activity_store,
        coordinator,
        settings,
        secret_vault,
        clock,
    );

    for entry in &config.sessions {
        let session_id = SessionId(
            latch_core::token::OpaqueToken::try_from(entry.id.clone())
                .map_err(|e| format!("invalid session id in config: {e}"))?,
        );
        state.register_session(RegisteredSession {
            session_id,
            harness_id: entry.harness_id.clone(),
            policy_id: entry.policy_id.clone(),
            policy_override: None,
        });
    }

    let server = AuthzServer::bind(state).await?;
    tracing::info!(port = server.port(), "latchd listening");
    println!("latchd listening on 127.0.0.1:{} secret={}", server.port(), server.secret());

    tokio::signal::ctrl_c().await?;
    tracing::info!("shutting down");
    server.stop().await;
    Ok(())
}
