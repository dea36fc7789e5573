// src/exec/runner.rs

//! Streamed child-process runner.

use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;

use anyhow::{anyhow, Context};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, timeout, Instant};
use tracing::{debug, info, warn};

use crate::errors::{BinvisorError, Result};
use crate::types::FinishReason;

use super::completion::{
    is_sentinel, CompletionEvent, CompletionPhase, CompletionTracker, DEFAULT_GRACE_PERIOD,
    DEFAULT_SENTINEL,
};
use super::LineLogger;

/// Tunables for a supervised run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerOptions {
    /// Diagnostic line prefix that starts the grace period.
    pub sentinel: String,
    /// Delay between the sentinel and declaring the run finished.
    pub grace_period: Duration,
    /// Liveness polling granularity (not a deadline).
    pub poll_interval: Duration,
    /// How long to wait for the child to exit once the grace period is over,
    /// and how long to wait for trailing stderr after a natural exit.
    pub exit_timeout: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            sentinel: DEFAULT_SENTINEL.to_string(),
            grace_period: DEFAULT_GRACE_PERIOD,
            poll_interval: Duration::from_secs(10),
            exit_timeout: Duration::from_secs(30),
        }
    }
}

/// Result of one supervised invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// Child exit code; `-1` if it was terminated by a signal.
    pub exit_code: i32,
    pub finish: FinishReason,
    /// Every stderr line read, in order.
    pub diagnostics: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct StreamedProcessRunner {
    options: RunnerOptions,
}

impl StreamedProcessRunner {
    pub fn new(options: RunnerOptions) -> Self {
        Self { options }
    }

    /// Run `path` with `args`, forwarding stderr lines to `logger`.
    pub async fn execute(
        &self,
        path: &Path,
        args: &[String],
        logger: Option<LineLogger>,
    ) -> Result<ProcessOutcome> {
        self.execute_inner(path, args, logger)
            .await
            .map_err(BinvisorError::execution)
    }

    async fn execute_inner(
        &self,
        path: &Path,
        args: &[String],
        logger: Option<LineLogger>,
    ) -> anyhow::Result<ProcessOutcome> {
        info!(path = ?path, ?args, "starting child process");

        let mut cmd = Command::new(path);
        cmd.args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let mut child = cmd
            .spawn()
            .with_context(|| format!("spawning {:?}", path))?;
        let pid = child.id();

        // Stdout is not part of the diagnostic protocol; drain it so the
        // child never blocks on a full pipe.
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(async move {
                let mut segments = BufReader::new(stdout).split(b'\n');
                while let Ok(Some(segment)) = segments.next_segment().await {
                    debug!(pid, "stdout: {}", String::from_utf8_lossy(&segment));
                }
            });
        }

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| anyhow!("child stderr was not captured"))?;

        let (sentinel_tx, mut sentinel_rx) = mpsc::unbounded_channel::<()>();
        let (stop_tx, stop_rx) = watch::channel(false);
        let mut reader = tokio::spawn(stream_diagnostics(
            stderr,
            logger,
            self.options.sentinel.clone(),
            sentinel_tx,
            stop_rx,
        ));

        let mut tracker = CompletionTracker::new(self.options.grace_period);
        let mut exit_status: Option<ExitStatus> = None;

        while !tracker.is_finished() {
            let deadline = tracker.deadline();
            tokio::select! {
                waited = timeout(self.options.poll_interval, child.wait()) => match waited {
                    Ok(status) => {
                        let status = status.context("waiting for child process")?;
                        exit_status = Some(status);
                        tracker.handle(CompletionEvent::ChildExited, Instant::now());
                    }
                    Err(_) => debug!(pid, phase = ?tracker.phase(), "child still running"),
                },
                Some(()) = sentinel_rx.recv() => {
                    let before = tracker.phase();
                    let after = tracker.handle(CompletionEvent::SentinelLine, Instant::now());
                    if before == CompletionPhase::Streaming {
                        info!(
                            pid,
                            grace_secs = self.options.grace_period.as_secs_f64(),
                            ?after,
                            "completion sentinel seen; grace period started"
                        );
                    }
                }
                _ = sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => {
                    tracker.handle(CompletionEvent::Tick, Instant::now());
                }
            }
        }

        let mut drained = None;
        let (exit_code, finish) = match exit_status {
            Some(status) => {
                // Let the reader drain what the child wrote before exiting.
                match timeout(self.options.exit_timeout, &mut reader).await {
                    Ok(joined) => drained = Some(joined),
                    Err(_) => debug!(pid, "stderr still open after child exit; stopping reader"),
                }
                (exit_code_of(status), FinishReason::Exited)
            }
            None => {
                info!(pid, "grace period elapsed; waiting for child to exit");
                let _ = stop_tx.send(true);
                self.await_exit_after_grace(&mut child, pid).await?
            }
        };

        let _ = stop_tx.send(true);
        let joined = match drained {
            Some(joined) => joined,
            None => reader.await,
        };
        let diagnostics = joined.unwrap_or_else(|e| {
            warn!(pid, error = %e, "stderr reader task failed");
            Vec::new()
        });

        info!(pid, exit_code, ?finish, lines = diagnostics.len(), "child process finished");

        Ok(ProcessOutcome {
            exit_code,
            finish,
            diagnostics,
        })
    }

    async fn await_exit_after_grace(
        &self,
        child: &mut Child,
        pid: Option<u32>,
    ) -> anyhow::Result<(i32, FinishReason)> {
        match timeout(self.options.exit_timeout, child.wait()).await {
            Ok(status) => {
                let status = status.context("waiting for child process")?;
                Ok((exit_code_of(status), FinishReason::GracePeriodElapsed))
            }
            Err(_) => {
                warn!(
                    pid,
                    exit_timeout_secs = self.options.exit_timeout.as_secs_f64(),
                    "child outlived exit timeout; killing"
                );
                if let Err(e) = child.kill().await {
                    warn!(pid, error = %e, "failed to kill child process");
                }
                let status = child.wait().await.context("reaping killed child")?;
                Ok((exit_code_of(status), FinishReason::Killed))
            }
        }
    }
}

fn exit_code_of(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// Read stderr line by line until EOF, a read error, or a stop request.
///
/// Each line is handed to `logger` before the next read. Read errors end the
/// stream but are not fatal to the run.
async fn stream_diagnostics(
    stderr: ChildStderr,
    logger: Option<LineLogger>,
    sentinel: String,
    sentinel_tx: mpsc::UnboundedSender<()>,
    mut stop_rx: watch::Receiver<bool>,
) -> Vec<String> {
    let mut reader = BufReader::new(stderr);
    let mut lines = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        let read = tokio::select! {
            r = reader.read_until(b'\n', &mut buf) => r,
            _ = stop_rx.changed() => {
                debug!("stderr reader stopped");
                break;
            }
        };

        match read {
            Ok(0) => {
                debug!("stderr reached end of stream");
                break;
            }
            Ok(_) => {
                let line = decode_line(&buf);
                if let Some(log) = &logger {
                    log(&line);
                }
                if is_sentinel(&line, &sentinel) {
                    let _ = sentinel_tx.send(());
                }
                lines.push(line);
            }
            Err(e) => {
                warn!(error = %e, "error reading child stderr; diagnostics stream closed");
                break;
            }
        }
    }

    lines
}

fn decode_line(buf: &[u8]) -> String {
    String::from_utf8_lossy(buf)
        .trim_end_matches(['\n', '\r'])
        .to_string()
}
