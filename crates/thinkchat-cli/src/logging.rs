//! File-based tracing setup.
//!
//! Logs go to a daily-rolling file under the app home so stdout stays clean
//! for streamed responses. `RUST_LOG` overrides the default filter.

use anyhow::{Context, Result};
use thinkchat_core::config::paths;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initializes tracing. The returned guard must be held for the lifetime of
/// the process so buffered log lines are flushed on exit.
pub fn init() -> Result<WorkerGuard> {
    let logs_dir = paths::logs_dir();
    std::fs::create_dir_all(&logs_dir)
        .with_context(|| format!("create logs directory {}", logs_dir.display()))?;

    let appender = tracing_appender::rolling::daily(&logs_dir, "thinkchat.log");
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(guard)
}
