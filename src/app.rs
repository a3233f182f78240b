//! Application startup and utilities.
//!
//! Exit codes, tracing setup and role selection for the entry point.

use std::io::IsTerminal;

use framecast::config::{ConfigError, ConfigStore};
use framecast::control::{control_stream, ControlCodec, ControlStream, MAX_REQUEST_BUFFER_SIZE};
use framecast::FramingMode;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Application exit codes.
pub mod exit_code {
    use std::process::ExitCode;

    /// Success (exit code 0).
    pub const SUCCESS: ExitCode = ExitCode::SUCCESS;

    /// Configuration error or help (exit code 1).
    pub const CONFIG_ERROR: ExitCode = ExitCode::FAILURE;

    /// Runtime error (exit code 2) - sink failure, stalled capture, etc.
    pub fn runtime_error() -> ExitCode {
        ExitCode::from(2)
    }
}

/// Which side of the socket this process plays
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Server,
    Client,
}

impl Role {
    /// Pick the role from `--server`, `--client` and the send list
    pub fn select(store: &ConfigStore) -> Result<Self, ConfigError> {
        let server = store.flag("server");
        let client = store.flag("client");

        match (server, client) {
            (true, true) => Err(ConfigError::Conflict("Both --client and --server requested")),
            (true, false) if !store.send_list().is_empty() => Err(ConfigError::Conflict(
                "--send is only for clients; start the server separately",
            )),
            (true, false) => Ok(Role::Server),
            (false, true) => Ok(Role::Client),
            (false, false) if store.send_list().is_empty() => Ok(Role::Server),
            (false, false) => Ok(Role::Client),
        }
    }
}

/// Sets up the tracing subscriber for logging.
///
/// Logs go to stderr; stdout may be carrying frames.
pub fn setup_tracing(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };

    let filter = EnvFilter::builder()
        .with_default_directive(level.into())
        .from_env_lossy();

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Stdin as a control source, unless it is a terminal
pub fn stdin_reader() -> Option<tokio::io::Stdin> {
    if std::io::stdin().is_terminal() {
        return None;
    }
    Some(tokio::io::stdin())
}

/// Control stream on stdin for client mode
pub fn stdin_control(framing: FramingMode) -> Option<ControlStream> {
    let codec = ControlCodec::for_framing(framing, MAX_REQUEST_BUFFER_SIZE);
    stdin_reader().map(|stdin| control_stream(stdin, codec))
}

/// Resolves on SIGINT or SIGTERM
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
