// src/provision/provisioner.rs

//! Ensures a valid, executable artifact exists at the local path.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use anyhow::{anyhow, Context};
use futures_util::StreamExt;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::errors::{BinvisorError, Result};
use crate::fetch::Fetcher;
use crate::fs::FileSystem;
use crate::integrity::{DigestHasher, IntegrityChecker, Verdict};
use crate::source::SourceDescriptor;

use super::chunked::ChunkedWriter;
use super::{ProgressFn, ProvisioningState};

/// Write granularity for downloads (and hence progress callbacks).
pub const DEFAULT_CHUNK_SIZE: usize = 51_200;

// Body pieces buffered between the network stream and the file writer.
const WRITE_QUEUE_DEPTH: usize = 16;

/// Result of the most recent completed pass, shared with callers that were
/// waiting on the critical section while it ran.
#[derive(Debug, Default)]
struct PassRecord {
    last_error: Option<String>,
}

/// Owns the provisioning lifecycle for one artifact path.
///
/// `initialized` is the fast path: once set, `ensure` returns without
/// touching the disk. A provisioning pass runs while holding `pass`, so there
/// is never more than one download in flight. Callers that queued behind a
/// pass adopt its result instead of starting another one; `generation` is
/// bumped at the end of every pass so they can tell.
pub struct BinaryProvisioner {
    fs: Arc<dyn FileSystem>,
    fetcher: Arc<dyn Fetcher>,
    local_path: PathBuf,
    chunk_size: usize,
    initialized: AtomicBool,
    generation: AtomicU64,
    pass: Mutex<PassRecord>,
}

impl std::fmt::Debug for BinaryProvisioner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BinaryProvisioner")
            .field("local_path", &self.local_path)
            .field("chunk_size", &self.chunk_size)
            .field("initialized", &self.is_initialized())
            .finish_non_exhaustive()
    }
}

impl BinaryProvisioner {
    pub fn new(
        local_path: impl Into<PathBuf>,
        fs: Arc<dyn FileSystem>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        Self {
            fs,
            fetcher,
            local_path: local_path.into(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            initialized: AtomicBool::new(false),
            generation: AtomicU64::new(0),
            pass: Mutex::new(PassRecord::default()),
        }
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub fn state(&self) -> ProvisioningState {
        ProvisioningState {
            initialized: self.is_initialized(),
            initializing: self.pass.try_lock().is_err(),
            local_path: self.local_path.clone(),
        }
    }

    /// Forget that the artifact was validated; the next `ensure` re-checks
    /// the file on disk (and re-downloads it if needed).
    pub fn invalidate(&self) {
        if self.initialized.swap(false, Ordering::AcqRel) {
            info!(path = ?self.local_path, "artifact invalidated");
        }
    }

    /// Guarantee a valid, executable artifact at `local_path`.
    pub async fn ensure(
        &self,
        descriptor: &SourceDescriptor,
        on_progress: Option<ProgressFn>,
    ) -> Result<()> {
        if self.is_initialized() {
            return Ok(());
        }

        let observed = self.generation.load(Ordering::Acquire);
        let mut pass = self.pass.lock().await;

        if self.is_initialized() {
            return Ok(());
        }
        if self.generation.load(Ordering::Acquire) != observed {
            // A pass ran to completion while we were waiting for the guard.
            if let Some(err) = &pass.last_error {
                debug!(error = %err, "adopting failure of concurrent provisioning pass");
                return Err(BinvisorError::Provisioning(err.clone()));
            }
        }

        let result = self.run_pass(descriptor, on_progress).await;

        pass.last_error = result.as_ref().err().map(|e| format!("{e:#}"));
        if result.is_ok() {
            self.initialized.store(true, Ordering::Release);
        }
        self.generation.fetch_add(1, Ordering::AcqRel);

        result.map_err(BinvisorError::provisioning)
    }

    /// Check the current on-disk artifact without modifying it.
    pub async fn verify_local(&self, descriptor: &SourceDescriptor) -> Result<Verdict> {
        let checker = IntegrityChecker::new(descriptor.algorithm());
        let expected = descriptor.expected_digest().to_vec();

        self.on_blocking("verification", move |fs, path| {
            Ok(checker.verify_file(fs, path, &expected))
        })
        .await
        .map_err(BinvisorError::Other)
    }

    async fn run_pass(
        &self,
        descriptor: &SourceDescriptor,
        on_progress: Option<ProgressFn>,
    ) -> anyhow::Result<()> {
        if self.accept_existing(descriptor).await? {
            return Ok(());
        }

        self.on_blocking("stale artifact removal", |fs, path| {
            fs.remove_file(path)
                .context("removing stale artifact before download")
        })
        .await?;

        let result = self.download(descriptor, on_progress).await;
        if let Err(err) = &result {
            warn!(
                path = ?self.local_path,
                error = %format!("{err:#}"),
                "artifact download failed; removing partial file"
            );
            let cleanup = self
                .on_blocking("partial artifact removal", |fs, path| fs.remove_file(path))
                .await;
            if let Err(e) = cleanup {
                warn!(path = ?self.local_path, error = %format!("{e:#}"), "failed to remove partial artifact");
            }
        }
        result
    }

    /// Validate an existing artifact. Returns `true` if it can be used
    /// as-is; an invalid artifact is deleted.
    async fn accept_existing(&self, descriptor: &SourceDescriptor) -> anyhow::Result<bool> {
        let checker = IntegrityChecker::new(descriptor.algorithm());
        let expected = descriptor.expected_digest().to_vec();

        self.on_blocking("existing-artifact check", move |fs, path| {
            accept_existing_blocking(fs, path, &checker, &expected)
        })
        .await
    }

    async fn download(
        &self,
        descriptor: &SourceDescriptor,
        on_progress: Option<ProgressFn>,
    ) -> anyhow::Result<()> {
        let download = self.fetcher.fetch(descriptor.url()).await?;
        let total = download.total();

        info!(url = %descriptor.url(), total, path = ?self.local_path, "downloading artifact");

        let (tx, rx) = mpsc::channel::<Vec<u8>>(WRITE_QUEUE_DEPTH);
        let writer = self.spawn_writer(rx, total, on_progress);
        let mut hasher = DigestHasher::new(descriptor.algorithm());

        let mut body = download.body;
        let mut streamed = Ok(());
        while let Some(chunk) = body.next().await {
            let chunk = match chunk.context("reading artifact body") {
                Ok(chunk) => chunk,
                Err(e) => {
                    streamed = Err(e);
                    break;
                }
            };
            hasher.update(&chunk);
            if tx.send(chunk).await.is_err() {
                // Writer gave up; its error is reported below.
                break;
            }
        }
        drop(tx);

        let written = writer.await.context("artifact writer worker failed")?;
        streamed?;
        let written = written?;

        let digest = hasher.finalize();
        if digest.as_slice() != descriptor.expected_digest() {
            return Err(anyhow!(
                "downloaded artifact digest mismatch (expected {}, got {})",
                hex::encode(descriptor.expected_digest()),
                hex::encode(&digest)
            ));
        }

        self.on_blocking("artifact finalisation", |fs, path| {
            if !fs.is_executable(path) {
                fs.set_executable(path, true)
                    .context("making downloaded artifact executable")?;
                debug!(path = ?path, "artifact made executable");
            }
            Ok(())
        })
        .await?;

        info!(path = ?self.local_path, bytes = written, "artifact downloaded");
        Ok(())
    }

    /// Create the artifact file and write body chunks as they arrive, on a
    /// blocking worker. Ends when `rx` is closed.
    fn spawn_writer(
        &self,
        mut rx: mpsc::Receiver<Vec<u8>>,
        total: u64,
        on_progress: Option<ProgressFn>,
    ) -> JoinHandle<anyhow::Result<u64>> {
        let fs = Arc::clone(&self.fs);
        let path = self.local_path.clone();
        let chunk_size = self.chunk_size;

        tokio::task::spawn_blocking(move || {
            let file = fs.create(&path)?;
            let mut writer = ChunkedWriter::new(file, chunk_size, total, on_progress);
            while let Some(chunk) = rx.blocking_recv() {
                writer.push(&chunk)?;
            }
            writer.finish()
        })
    }

    /// Run filesystem work against the artifact path on a blocking worker.
    async fn on_blocking<T, F>(&self, what: &'static str, f: F) -> anyhow::Result<T>
    where
        F: FnOnce(&dyn FileSystem, &Path) -> anyhow::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let fs = Arc::clone(&self.fs);
        let path = self.local_path.clone();
        tokio::task::spawn_blocking(move || f(fs.as_ref(), &path))
            .await
            .with_context(|| format!("{what} worker failed"))?
    }
}

/// `Ok(true)`: valid and executable. `Ok(false)`: absent, or invalid and
/// deleted. A valid artifact that cannot be made executable is an error.
fn accept_existing_blocking(
    fs: &dyn FileSystem,
    path: &Path,
    checker: &IntegrityChecker,
    expected: &[u8],
) -> anyhow::Result<bool> {
    if !fs.exists(path) {
        debug!(path = ?path, "no existing artifact");
        return Ok(false);
    }

    match checker.verify_file(fs, path, expected) {
        Verdict::Match => {
            if !fs.is_executable(path) {
                fs.set_executable(path, true)
                    .context("making existing artifact executable")?;
                info!(path = ?path, "existing artifact is valid; made executable");
            } else {
                info!(path = ?path, "existing artifact is valid");
            }
            return Ok(true);
        }
        Verdict::Mismatch => {
            warn!(path = ?path, "existing artifact digest mismatch");
        }
        Verdict::Unreadable(reason) => {
            warn!(path = ?path, reason = %reason, "existing artifact unreadable");
        }
    }

    if fs.is_executable(path) {
        if let Err(e) = fs.set_executable(path, false) {
            debug!(path = ?path, error = %e, "failed to revoke executable bit");
        }
    }
    match fs.remove_file(path) {
        Ok(()) => info!(path = ?path, "invalid artifact deleted"),
        Err(e) => warn!(path = ?path, error = %format!("{e:#}"), "failed to delete invalid artifact"),
    }
    Ok(false)
}
