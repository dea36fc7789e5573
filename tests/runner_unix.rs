// tests/runner_unix.rs

//! Real child processes (`/bin/sh` scripts) driven by the streamed runner.

#![cfg(unix)]

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use binvisor::errors::BinvisorError;
use binvisor::exec::{LineLogger, RunnerOptions, StreamedProcessRunner};
use binvisor::types::FinishReason;
use binvisor_test_utils::{init_tracing, with_timeout, write_script};
use tempfile::TempDir;

fn recording_logger() -> (LineLogger, Arc<Mutex<Vec<String>>>) {
    let lines = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&lines);
    let logger: LineLogger = Arc::new(move |line: &str| {
        sink.lock().unwrap().push(line.to_string());
    });
    (logger, lines)
}

fn fast_options(grace: Duration, exit_timeout: Duration) -> RunnerOptions {
    RunnerOptions {
        grace_period: grace,
        poll_interval: Duration::from_millis(100),
        exit_timeout,
        ..RunnerOptions::default()
    }
}

#[tokio::test]
async fn natural_exit_reports_code_and_forwards_only_stderr() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(
        dir.path(),
        "tool",
        "echo 'to stdout'\necho 'frame=1' >&2\necho 'frame=2' >&2\nexit 7",
    );
    let runner = StreamedProcessRunner::new(fast_options(
        Duration::from_secs(5),
        Duration::from_secs(5),
    ));
    let (logger, lines) = recording_logger();

    let outcome = with_timeout(10, runner.execute(&bin, &[], Some(logger)))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, 7);
    assert_eq!(outcome.finish, FinishReason::Exited);
    assert_eq!(*lines.lock().unwrap(), vec!["frame=1", "frame=2"]);
    assert_eq!(outcome.diagnostics, vec!["frame=1", "frame=2"]);
}

#[tokio::test]
async fn arguments_are_passed_through() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(dir.path(), "tool", "for a in \"$@\"; do echo \"arg:$a\" >&2; done");
    let runner = StreamedProcessRunner::new(fast_options(
        Duration::from_secs(5),
        Duration::from_secs(5),
    ));
    let args = binvisor::exec::split_args(r#"-i "in file.mp4" out.mp4"#).unwrap();

    let outcome = with_timeout(10, runner.execute(&bin, &args, None))
        .await
        .unwrap();

    assert_eq!(
        outcome.diagnostics,
        vec!["arg:-i", "arg:in file.mp4", "arg:out.mp4"]
    );
}

#[tokio::test]
async fn exit_shortly_after_sentinel_finishes_without_waiting_for_grace() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(
        dir.path(),
        "tool",
        "echo 'final ratefactor: 23.1' >&2\nexit 0",
    );
    let runner = StreamedProcessRunner::new(fast_options(
        Duration::from_secs(30),
        Duration::from_secs(5),
    ));

    let started = Instant::now();
    let outcome = with_timeout(10, runner.execute(&bin, &[], None))
        .await
        .unwrap();

    assert_eq!(outcome.exit_code, 0);
    assert_eq!(outcome.finish, FinishReason::Exited);
    assert!(started.elapsed() < Duration::from_secs(10));
}

#[tokio::test]
async fn hung_child_after_sentinel_is_killed_once_grace_and_exit_timeout_pass() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(
        dir.path(),
        "tool",
        "echo 'final ratefactor: 23.1' >&2\n\
         echo 'trailer 1' >&2\n\
         echo 'trailer 2' >&2\n\
         echo 'trailer 3' >&2\n\
         exec sleep 30",
    );
    let runner = StreamedProcessRunner::new(fast_options(
        Duration::from_secs(1),
        Duration::from_millis(500),
    ));
    let (logger, lines) = recording_logger();

    let started = Instant::now();
    let outcome = with_timeout(15, runner.execute(&bin, &[], Some(logger)))
        .await
        .unwrap();
    let elapsed = started.elapsed();

    assert!(elapsed >= Duration::from_secs(1), "finished after {elapsed:?}");
    assert!(elapsed < Duration::from_secs(10), "finished after {elapsed:?}");
    assert_eq!(outcome.finish, FinishReason::Killed);
    assert_eq!(outcome.exit_code, -1);
    assert_eq!(
        *lines.lock().unwrap(),
        vec!["final ratefactor: 23.1", "trailer 1", "trailer 2", "trailer 3"]
    );
}

#[tokio::test]
async fn child_exiting_within_exit_timeout_keeps_its_code() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(
        dir.path(),
        "tool",
        "echo 'final ratefactor: 23.1' >&2\nsleep 2\nexit 3",
    );
    let runner = StreamedProcessRunner::new(fast_options(
        Duration::from_millis(500),
        Duration::from_secs(10),
    ));

    let outcome = with_timeout(15, runner.execute(&bin, &[], None))
        .await
        .unwrap();

    assert_eq!(outcome.finish, FinishReason::GracePeriodElapsed);
    assert_eq!(outcome.exit_code, 3);
}

#[tokio::test]
async fn non_sentinel_lines_never_start_the_grace_period() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(
        dir.path(),
        "tool",
        "echo 'ratefactor: almost' >&2\nsleep 1\nexit 0",
    );
    let runner = StreamedProcessRunner::new(fast_options(
        Duration::from_millis(100),
        Duration::from_secs(5),
    ));

    let outcome = with_timeout(10, runner.execute(&bin, &[], None))
        .await
        .unwrap();

    assert_eq!(outcome.finish, FinishReason::Exited);
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let bin = write_script(dir.path(), "tool", r"printf 'bad \377 byte\n' >&2");
    let runner = StreamedProcessRunner::default();

    let outcome = with_timeout(10, runner.execute(&bin, &[], None))
        .await
        .unwrap();

    assert_eq!(outcome.diagnostics, vec!["bad \u{fffd} byte"]);
}

#[tokio::test]
async fn missing_binary_is_an_execution_error() {
    init_tracing();
    let dir = TempDir::new().unwrap();
    let runner = StreamedProcessRunner::default();

    let err = runner
        .execute(&dir.path().join("does-not-exist"), &[], None)
        .await
        .unwrap_err();

    assert!(matches!(err, BinvisorError::Execution(_)));
}
