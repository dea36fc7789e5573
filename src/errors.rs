// src/errors.rs

//! Crate-wide error aliases and helpers.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BinvisorError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    /// Fetching, writing or finalising the artifact failed. Any partial file
    /// has already been removed when this is returned.
    #[error("provisioning failed: {0}")]
    Provisioning(String),

    /// Launching or supervising the child process failed.
    #[error("execution failed: {0}")]
    Execution(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl BinvisorError {
    /// Wrap an internal error chain as a provisioning failure, keeping the
    /// full context chain in the message.
    pub fn provisioning(err: impl Into<anyhow::Error>) -> Self {
        BinvisorError::Provisioning(format!("{:#}", err.into()))
    }

    pub fn execution(err: impl Into<anyhow::Error>) -> Self {
        BinvisorError::Execution(format!("{:#}", err.into()))
    }
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, BinvisorError>;
