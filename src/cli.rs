// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::config::default_config_path;

/// Command-line arguments for `binvisor`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "binvisor",
    version,
    about = "Provision a verified external binary and run it under supervision.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    #[arg(long, value_name = "PATH", default_value_os_t = default_config_path())]
    pub config: PathBuf,

    /// Override the remote host the artifact is fetched from.
    #[arg(long, value_name = "HOST")]
    pub host: Option<String>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `BINVISOR_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Clone, Subcommand)]
pub enum CliCommand {
    /// Make sure the artifact is present, authentic and executable.
    Provision,

    /// Check the local artifact against its digest without changing it.
    Verify,

    /// Provision if needed, then run the artifact.
    ///
    /// The whole argument string is passed as one value and split using
    /// shell quoting rules, e.g. `binvisor run "-i 'in put.mp4' out.webm"`.
    Run {
        #[arg(value_name = "ARGS", allow_hyphen_values = true)]
        args: String,
    },
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
