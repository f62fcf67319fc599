//! Tracing configuration and log routing.
//!
//! Logs go to stdout through a compact formatter and to a file. `DOCQNA_LOG_FILE` selects the
//! file path; otherwise records are appended to `logs/docqna.log`. The file writer is
//! non-blocking.
use std::sync::OnceLock;

use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

/// Configure tracing subscribers for stdout and file logging.
///
/// `RUST_LOG` controls filtering and defaults to `info`.
pub fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(false).compact();

    let registry = tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer);

    match configure_file_writer() {
        Some(writer) => {
            let file_layer = fmt::layer()
                .with_writer(writer)
                .with_target(true)
                .with_ansi(false)
                .compact();
            registry.with(file_layer).init();
        }
        None => registry.init(),
    }
}

fn configure_file_writer() -> Option<NonBlocking> {
    let (non_blocking, guard) = match std::env::var("DOCQNA_LOG_FILE") {
        Ok(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|err| eprintln!("Failed to open log file {path}: {err}"))
                .ok()?;
            tracing_appender::non_blocking(file)
        }
        Err(_) => {
            if let Err(err) = std::fs::create_dir_all("logs") {
                eprintln!("Failed to create logs directory: {err}");
                return None;
            }
            tracing_appender::non_blocking(tracing_appender::rolling::never("logs", "docqna.log"))
        }
    };
    let _ = LOG_GUARD.set(guard);
    Some(non_blocking)
}
