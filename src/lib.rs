// src/lib.rs

pub mod cli;
pub mod config;
pub mod errors;
pub mod exec;
pub mod fetch;
pub mod fs;
pub mod integrity;
pub mod logging;
pub mod provision;
pub mod source;
pub mod supervisor;
pub mod types;

use anyhow::Result;
use tracing::{info, warn};

use crate::cli::{CliArgs, CliCommand};
use crate::config::load_and_validate;
use crate::integrity::Verdict;
use crate::logging::{progress_logger, stderr_line_logger};

pub use crate::errors::BinvisorError;
pub use crate::supervisor::Supervisor;

/// High-level entry point used by `main.rs`.
///
/// Returns the process exit code: the child's exit code for `run`, `0`/`1`
/// for `provision` and `verify`.
pub async fn run(args: CliArgs) -> Result<i32> {
    let cfg = load_and_validate(&args.config, args.host.as_deref())?;
    let supervisor = Supervisor::from_config(&cfg)?.with_progress(progress_logger());

    match args.command {
        CliCommand::Provision => {
            supervisor.ensure_provisioned(Some(progress_logger())).await?;
            println!("{}", cfg.local_path.display());
            Ok(0)
        }
        CliCommand::Verify => {
            let verdict = supervisor
                .provisioner()
                .verify_local(supervisor.descriptor())
                .await?;
            match verdict {
                Verdict::Match => {
                    info!(path = ?cfg.local_path, "artifact is valid");
                    Ok(0)
                }
                Verdict::Mismatch => {
                    warn!(path = ?cfg.local_path, "artifact digest mismatch");
                    Ok(1)
                }
                Verdict::Unreadable(reason) => {
                    warn!(path = ?cfg.local_path, reason = %reason, "artifact missing or unreadable");
                    Ok(1)
                }
            }
        }
        CliCommand::Run { args: cmd } => {
            let code = supervisor.run(&cmd, Some(stderr_line_logger())).await?;
            Ok(code)
        }
    }
}
