// src/supervisor.rs

//! Public entry point: provision, then run on a background worker.

use std::sync::Arc;

use tokio::sync::oneshot;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::errors::{BinvisorError, Result};
use crate::exec::{split_args, LineLogger, ProcessOutcome, StreamedProcessRunner};
use crate::fetch::{Fetcher, HttpFetcher};
use crate::fs::{FileSystem, RealFileSystem};
use crate::provision::{BinaryProvisioner, ProgressFn};
use crate::source::SourceDescriptor;

/// Ties a provisioner, the artifact's descriptor and a runner together.
///
/// Cheap to share: the provisioner is reference counted, so several
/// supervisors (or clones of one) see the same provisioning state.
#[derive(Clone)]
pub struct Supervisor {
    provisioner: Arc<BinaryProvisioner>,
    descriptor: SourceDescriptor,
    runner: StreamedProcessRunner,
    on_progress: Option<ProgressFn>,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("provisioner", &self.provisioner)
            .field("descriptor", &self.descriptor)
            .field("runner", &self.runner)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    pub fn new(
        provisioner: Arc<BinaryProvisioner>,
        descriptor: SourceDescriptor,
        runner: StreamedProcessRunner,
    ) -> Self {
        Self {
            provisioner,
            descriptor,
            runner,
            on_progress: None,
        }
    }

    /// Production wiring: real filesystem and HTTP fetcher.
    pub fn from_config(cfg: &Config) -> Result<Self> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(&cfg.length_header)?);
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        Ok(Self::with_backends(cfg, fs, fetcher))
    }

    /// Same as [`Supervisor::from_config`] with injected backends.
    pub fn with_backends(
        cfg: &Config,
        fs: Arc<dyn FileSystem>,
        fetcher: Arc<dyn Fetcher>,
    ) -> Self {
        let provisioner = BinaryProvisioner::new(cfg.local_path.clone(), fs, fetcher)
            .with_chunk_size(cfg.chunk_size);
        Self::new(
            Arc::new(provisioner),
            cfg.source.clone(),
            StreamedProcessRunner::new(cfg.runner.clone()),
        )
    }

    /// Progress callback used by the implicit provisioning inside [`run`].
    ///
    /// [`run`]: Supervisor::run
    pub fn with_progress(mut self, on_progress: ProgressFn) -> Self {
        self.on_progress = Some(on_progress);
        self
    }

    pub fn provisioner(&self) -> &Arc<BinaryProvisioner> {
        &self.provisioner
    }

    pub fn descriptor(&self) -> &SourceDescriptor {
        &self.descriptor
    }

    pub async fn ensure_provisioned(&self, on_progress: Option<ProgressFn>) -> Result<()> {
        self.provisioner.ensure(&self.descriptor, on_progress).await
    }

    /// Provision if needed, run the binary with `cmd` and return its exit code.
    pub async fn run(&self, cmd: &str, logger: Option<LineLogger>) -> Result<i32> {
        self.run_with_outcome(cmd, logger)
            .await
            .map(|outcome| outcome.exit_code)
    }

    /// Like [`Supervisor::run`] but returns the full [`ProcessOutcome`].
    pub async fn run_with_outcome(
        &self,
        cmd: &str,
        logger: Option<LineLogger>,
    ) -> Result<ProcessOutcome> {
        let args = split_args(cmd)?;

        if let Err(err) = self
            .provisioner
            .ensure(&self.descriptor, self.on_progress.clone())
            .await
        {
            error!(error = %err, "artifact provisioning failed; not executing");
            return Err(err);
        }
        // `ensure` only resolves once the artifact is validated.
        debug_assert!(self.provisioner.is_initialized());

        let path = self.provisioner.local_path().to_path_buf();
        let runner = self.runner.clone();
        let (tx, rx) = oneshot::channel();

        debug!(path = ?path, "dispatching execution to background worker");
        tokio::spawn(async move {
            let result = runner.execute(&path, &args, logger).await;
            if let Err(err) = &result {
                error!(error = %err, "supervised execution failed");
            }
            let _ = tx.send(result);
        });

        match rx.await {
            Ok(result) => {
                if let Ok(outcome) = &result {
                    info!(exit_code = outcome.exit_code, finish = ?outcome.finish, "run complete");
                }
                result
            }
            Err(_) => {
                error!("execution worker ended without a result");
                Err(BinvisorError::Execution(
                    "execution worker ended without a result".to_string(),
                ))
            }
        }
    }
}
