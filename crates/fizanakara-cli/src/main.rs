//! Fizanakara console - command-line administration for the Fizanakara
//! membership registry and annual dues.

mod commands;

use std::path::Path;
use std::process::ExitCode;

use anyhow::Result;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fizanakara_core::api::user_message;
use fizanakara_core::auth::{open_store, Session};
use fizanakara_core::{ApiClient, Config, Console, SessionStatus};

use commands::Command;

/// Daily log file name prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "fizanakara.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to a daily rolling file so command output stays clean; stderr is
/// used when no log directory is available. `RUST_LOG` controls the level.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match log_dir.filter(|dir| std::fs::create_dir_all(dir).is_ok()) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(writer).with_ansi(false))
                .with(filter)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(fmt::layer().with_writer(std::io::stderr))
                .with(filter)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Warning: could not read config ({}), using defaults", e);
            Config::default()
        }
    };
    let cache_dir = config.cache_dir().ok();
    let _guard = init_tracing(cache_dir.as_deref());

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::from(2);
        }
    };

    let session = match build_session(&config, cache_dir.as_deref()) {
        Ok(session) => session,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };
    let console = match ApiClient::from_config(&config, session.clone()) {
        Ok(api) => Console::new(api),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    info!(command = ?command, base_url = %config.api_base_url, "Running command");
    match commands::run(command, &console, &mut config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %format!("{:#}", e), "Command failed");
            if let SessionStatus::LoginRequired { .. } = session.status() {
                eprintln!("Session expired, run `fizanakara login`");
            } else {
                eprintln!("Error: {}", user_message(&e));
            }
            ExitCode::FAILURE
        }
    }
}

fn build_session(config: &Config, cache_dir: Option<&Path>) -> Result<Session> {
    let cache_dir = cache_dir.ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
    let store = open_store(config.credential_backend, cache_dir)?;
    Ok(Session::with_login_path(store, config.login_path.clone()))
}
