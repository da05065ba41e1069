//! Structured logging setup using the `tracing` ecosystem.
//!
//! Console output goes to stderr so that stdout stays free for payloads
//! printed by the CLI. File output rotates daily.

use std::path::Path;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::SwarmResult;

/// File name prefix of the rolling log files.
const LOG_FILE_NAME: &str = "swarm.log";

/// Initialize the global tracing subscriber.
///
/// Sets up:
/// - Console output (stderr), compact format
/// - File output in `log_dir` with daily rotation, JSON when
///   `config.json_output` is set
///
/// `level` overrides `config.level` when given (e.g. from `--verbose`).
pub fn init_logging(
    config: &LoggingConfig,
    log_dir: &Path,
    level: Option<&str>,
) -> SwarmResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let level = level.unwrap_or(&config.level);
    let file_appender = rolling::daily(log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = level_filter(level);

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .compact();

    if config.json_output {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_target(true)
            .with_thread_ids(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| crate::error::SwarmError::Internal(e.to_string()))?;
    } else {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .try_init()
            .map_err(|e| crate::error::SwarmError::Internal(e.to_string()))?;
    }

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Guard that keeps the non-blocking log writer alive.
/// Drop this to flush and close the log file.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Filter for `level`, falling back to `info` when it does not parse.
fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialize a minimal console-only logger for tests or when no log
/// directory is available. Subsequent calls are no-ops.
pub fn init_console_logging(level: &str) {
    let env_filter = level_filter(level);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true).compact())
        .try_init();
}
