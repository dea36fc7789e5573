// src/logging.rs

//! Logging setup for `binvisor` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `BINVISOR_LOG` environment variable (e.g. "info", "debug")
//! 3. default to `info`
//!
//! Everything goes to STDERR, so the child's forwarded diagnostics and our own
//! events end up in one stream.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::fmt;

use crate::cli::LogLevel;
use crate::exec::LineLogger;
use crate::provision::ProgressFn;

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let level = match cli_level {
        Some(lvl) => level_from_log_level(lvl),
        None => std::env::var("BINVISOR_LOG")
            .ok()
            .and_then(|s| parse_level_str(&s))
            .unwrap_or(tracing::Level::INFO),
    };

    fmt()
        .with_max_level(level)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow::anyhow!("installing tracing subscriber: {e}"))?;

    Ok(())
}

/// Forward child diagnostic lines verbatim to our stderr.
pub fn stderr_line_logger() -> LineLogger {
    Arc::new(|line: &str| eprintln!("{line}"))
}

/// Progress callback that logs once per 10% step (or once per MiB when the
/// total is unknown).
pub fn progress_logger() -> ProgressFn {
    const MIB: u64 = 1024 * 1024;
    let last_step = Arc::new(AtomicU64::new(0));

    Arc::new(move |done: u64, total: u64| {
        let step = if total > 0 { done * 10 / total } else { done / MIB };
        if last_step.fetch_max(step, Ordering::Relaxed) < step {
            if total > 0 {
                info!(done, total, percent = step * 10, "download progress");
            } else {
                info!(done, "download progress");
            }
        }
    })
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
