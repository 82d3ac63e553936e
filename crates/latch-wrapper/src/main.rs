//! `latch-mcp-wrap <real-command> [args…]`
//!
//! Resolves `${secret:KEY}` environment references for an MCP server
//! subprocess without ever placing the resolved secret on disk or in a
//! generated config file: the harness's MCP config invokes this launcher
//! instead of the real server, with `LATCH_RESOLVE` describing which env
//! vars to fill in from the authorization server's secret vault.

#![deny(unsafe_code)]

use std::collections::BTreeMap;
use std::process::ExitCode;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors the wrapper can hit before it ever spawns the child process.
#[derive(Debug, Error)]
enum WrapError {
    #[error("no command given")]
    NoCommand,
    #[error("LATCH_RESOLVE entry {0:?} is malformed, expected VAR=secret:KEY")]
    MalformedResolveEntry(String),
    #[error("failed to reach authorization server: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("failed to spawn child process: {0}")]
    Spawn(std::io::Error),
}

#[derive(Debug, Serialize)]
struct ResolveRequest {
    keys: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ResolveResponse {
    resolved: BTreeMap<String, String>,
}

/// Parse `LATCH_RESOLVE = "VAR1=secret:KEY1;VAR2=secret:KEY2"` into
/// `(env_var_name, secret_key)` pairs.
fn parse_resolve_spec(spec: &str) -> Result<Vec<(String, String)>, WrapError> {
    spec.split(';')
        .filter(|entry| !entry.is_empty())
        .map(|entry| {
            let (var, secret_ref) = entry
                .split_once('=')
                .ok_or_else(|| WrapError::MalformedResolveEntry(entry.to_string()))?;
            let key = secret_ref
                .strip_prefix("secret:")
                .ok_or_else(|| WrapError::MalformedResolveEntry(entry.to_string()))?;
            Ok((var.to_string(), key.to_string()))
        })
        .collect()
}

async fn resolve_secrets(
    base_url: &str,
    secret: &str,
    keys: &[String],
) -> Result<BTreeMap<String, String>, WrapError> {
    let client = reqwest::Client::new();
    let response = client
        .post(format!("{base_url}/secrets/resolve"))
        .bearer_auth(secret)
        .json(&ResolveRequest { keys: keys.to_vec() })
        .send()
        .await?
        .error_for_status()?
        .json::<ResolveResponse>()
        .await?;
    Ok(response.resolved)
}

/// Environment variables the wrapper itself consumes and must not leak to
/// the child process.
fn is_internal_var(name: &str) -> bool {
    name.starts_with("LATCH_")
}

async fn run() -> Result<ExitCode, WrapError> {
    let mut args = std::env::args_os().skip(1);
    let command = args.next().ok_or(WrapError::NoCommand)?;
    let child_args: Vec<_> = args.collect();

    let mut cmd = tokio::process::Command::new(&command);
    cmd.args(&child_args);

    if let Ok(spec) = std::env::var("LATCH_RESOLVE") {
        let pairs = parse_resolve_spec(&spec)?;
        let keys: Vec<String> = pairs.iter().map(|(_, key)| key.clone()).collect();
        if !keys.is_empty() {
            let base_url = std::env::var("LATCH_AUTHZ_URL").unwrap_or_default();
            let secret = std::env::var("LATCH_AUTHZ_SECRET").unwrap_or_default();
            // Unreachable endpoint or non-200 response fails open: log and
            // proceed with an empty resolved set. The child may itself fail
            // for lack of credentials, but it still gets to start and report
            // that in its own way rather than the wrapper dying first.
            let resolved = match resolve_secrets(&base_url, &secret, &keys).await {
                Ok(resolved) => resolved,
                Err(e) => {
                    tracing::warn!(error = %e, "secret resolution failed; proceeding with no resolved secrets");
                    BTreeMap::new()
                }
            };
            for (var, key) in &pairs {
                if let Some(value) = resolved.get(key) {
                    cmd.env(var, value);
                }
            }
        }
    }

    for (name, _) in std::env::vars() {
        if is_internal_var(&name) {
            cmd.env_remove(&name);
        }
    }

    cmd.stdin(std::process::Stdio::inherit());
    cmd.stdout(std::process::Stdio::inherit());
    cmd.stderr(std::process::Stdio::inherit());

    let mut child = cmd.spawn().map_err(WrapError::Spawn)?;
    let status = child.wait().await.map_err(WrapError::Spawn)?;

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            if let Ok(sig) = nix::sys::signal::Signal::try_from(signal) {
                let _ = nix::sys::signal::raise(sig);
            }
            return Ok(ExitCode::from(128u8.wrapping_add(signal as u8)));
        }
    }

    Ok(ExitCode::from(status.code().unwrap_or(1) as u8))
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "warn".into()))
        .init();

    match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("latch-mcp-wrap: {e}");
            ExitCode::from(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_multiple_resolve_entries() {
        let pairs = parse_resolve_spec("VAR1=secret:KEY1;VAR2=secret:KEY2").unwrap();
        assert_eq!(pairs, vec![("VAR1".to_string(), "KEY1".to_string()), ("VAR2".to_string(), "KEY2".to_string())]);
    }

    #[test]
    fn rejects_malformed_entries() {
        assert!(parse_resolve_spec("VAR1").is_err());
        assert!(parse_resolve_spec("VAR1=plain").is_err());
    }

    #[test]
    fn internal_vars_are_recognized_by_prefix() {
        assert!(is_internal_var("LATCH_AUTHZ_URL"));
        assert!(!is_internal_var("PATH"));
    }

    #[tokio::test]
    async fn unreachable_resolve_endpoint_errors_without_panicking() {
        // Port 0 never accepts a connection, standing in for "endpoint
        // unreachable". `run()`'s caller is expected to treat this as
        // fail-open (log and continue with no resolved secrets), not
        // propagate it — this just pins down that the error surfaces as a
        // normal `Err`, not a panic, so that fail-open logic has something
        // sane to match on.
        let err = resolve_secrets("http://127.0.0.1:0", "secret", &["KEY1".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, WrapError::Transport(_)));
    }
}
