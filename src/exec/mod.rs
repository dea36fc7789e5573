// src/exec/mod.rs

//! Process execution layer.
//!
//! This module runs the provisioned binary with `tokio::process::Command`,
//! streams its stderr into the caller's logger and decides when the run is
//! really over.
//!
//! - [`completion`] holds the pure sentinel / grace-period state machine.
//! - [`runner`] owns the child process, the stderr reader task and the
//!   liveness loop that drives the state machine.

pub mod completion;
pub mod runner;

use std::sync::Arc;

use crate::errors::{BinvisorError, Result};

pub use completion::{CompletionEvent, CompletionPhase, CompletionTracker};
pub use runner::{ProcessOutcome, RunnerOptions, StreamedProcessRunner};

/// Receives each diagnostic line as soon as it is read, in child order.
pub type LineLogger = Arc<dyn Fn(&str) + Send + Sync>;

/// Split a single argument string into argv using POSIX shell quoting.
pub fn split_args(cmd: &str) -> Result<Vec<String>> {
    shell_words::split(cmd).map_err(|e| {
        BinvisorError::Execution(format!("invalid argument string '{cmd}': {e}"))
    })
}
