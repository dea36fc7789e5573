// src/config/model.rs

use std::path::PathBuf;

use serde::Deserialize;

use crate::exec::completion::DEFAULT_SENTINEL;
use crate::exec::RunnerOptions;
use crate::fetch::http::DEFAULT_LENGTH_HEADER;
use crate::provision::DEFAULT_CHUNK_SIZE;
use crate::source::SourceDescriptor;
use crate::types::DigestAlgorithm;

/// Top-level configuration as read from a TOML file.
///
/// ```toml
/// [source]
/// host = "raw.githubusercontent.com"
/// path = "/owner/repo/main/ffmpeg"
/// digest = "d74981ef..."
///
/// [provision]
/// file_name = "ffmpeg"
///
/// [run]
/// grace_period = "1m"
/// ```
///
/// Only `[source]` is required. Use [`Config`] (via `TryFrom`) for a
/// validated view.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    pub source: RawSourceSection,

    #[serde(default)]
    pub provision: ProvisionSection,

    #[serde(default)]
    pub run: RunSection,
}

impl RawConfigFile {
    /// Replace the remote host (the CDN override).
    ///
    /// With `host` + `path`, only the host is swapped. With a full `url`, the
    /// URL's host component is rewritten during validation.
    pub fn with_host_override(mut self, host: Option<&str>) -> Self {
        if let Some(host) = host {
            self.source.host = Some(host.to_string());
        }
        self
    }
}

/// `[source]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct RawSourceSection {
    /// Full artifact URL. Mutually exclusive with `path`.
    #[serde(default)]
    pub url: Option<String>,

    /// CDN host, combined with `scheme` and `path`.
    #[serde(default)]
    pub host: Option<String>,

    #[serde(default)]
    pub path: Option<String>,

    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Expected digest, hex-encoded.
    pub digest: String,

    #[serde(default)]
    pub algorithm: DigestAlgorithm,

    /// Header consulted for the progress total when the body length is
    /// unknown.
    #[serde(default = "default_length_header")]
    pub length_header: String,
}

fn default_scheme() -> String {
    "https".to_string()
}

fn default_length_header() -> String {
    DEFAULT_LENGTH_HEADER.to_string()
}

/// `[provision]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct ProvisionSection {
    /// Directory holding the artifact. Defaults to the user's data dir.
    #[serde(default)]
    pub dir: Option<PathBuf>,

    #[serde(default = "default_file_name")]
    pub file_name: String,

    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
}

fn default_file_name() -> String {
    "ffmpeg".to_string()
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

impl Default for ProvisionSection {
    fn default() -> Self {
        Self {
            dir: None,
            file_name: default_file_name(),
            chunk_size: default_chunk_size(),
        }
    }
}

/// `[run]` section. Durations use the `"10s"` / `"1m"` syntax.
#[derive(Debug, Clone, Deserialize)]
pub struct RunSection {
    #[serde(default = "default_sentinel")]
    pub sentinel: String,

    #[serde(default = "default_grace_period")]
    pub grace_period: String,

    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,

    #[serde(default = "default_exit_timeout")]
    pub exit_timeout: String,
}

fn default_sentinel() -> String {
    DEFAULT_SENTINEL.to_string()
}

fn default_grace_period() -> String {
    "1m".to_string()
}

fn default_poll_interval() -> String {
    "10s".to_string()
}

fn default_exit_timeout() -> String {
    "30s".to_string()
}

impl Default for RunSection {
    fn default() -> Self {
        Self {
            sentinel: default_sentinel(),
            grace_period: default_grace_period(),
            poll_interval: default_poll_interval(),
            exit_timeout: default_exit_timeout(),
        }
    }
}

/// Validated configuration.
#[derive(Debug, Clone)]
pub struct Config {
    pub source: SourceDescriptor,
    pub length_header: String,
    pub local_path: PathBuf,
    pub chunk_size: usize,
    pub runner: RunnerOptions,
}

/// Directory used when `[provision].dir` is not set.
pub fn default_artifact_dir() -> PathBuf {
    dirs::data_dir()
        .map(|d| d.join("binvisor"))
        .unwrap_or_else(|| PathBuf::from(".binvisor"))
}
