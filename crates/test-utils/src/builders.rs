#![allow(dead_code)]

use std::path::Path;

use binvisor::config::{Config, ProvisionSection, RawConfigFile, RawSourceSection, RunSection};
use binvisor::integrity::compute_digest;
use binvisor::types::DigestAlgorithm;

/// Hex-encoded blake3 digest of `bytes`, as it would appear in a config file.
pub fn digest_hex(bytes: &[u8]) -> String {
    compute_digest(DigestAlgorithm::Blake3, bytes)
        .iter()
        .map(|b| format!("{b:02x}"))
        .collect()
}

/// Builder for `Config` to simplify test setup.
pub struct ConfigBuilder {
    config: RawConfigFile,
}

impl ConfigBuilder {
    /// Config for an artifact at `url` whose content is `artifact`.
    pub fn new(url: &str, artifact: &[u8]) -> Self {
        Self {
            config: RawConfigFile {
                source: RawSourceSection {
                    url: Some(url.to_string()),
                    host: None,
                    path: None,
                    scheme: "https".to_string(),
                    digest: digest_hex(artifact),
                    algorithm: DigestAlgorithm::Blake3,
                    length_header: "content-length".to_string(),
                },
                provision: ProvisionSection::default(),
                run: RunSection::default(),
            },
        }
    }

    pub fn dir(mut self, dir: &Path) -> Self {
        self.config.provision.dir = Some(dir.to_path_buf());
        self
    }

    pub fn file_name(mut self, name: &str) -> Self {
        self.config.provision.file_name = name.to_string();
        self
    }

    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.provision.chunk_size = size;
        self
    }

    pub fn grace_period(mut self, value: &str) -> Self {
        self.config.run.grace_period = value.to_string();
        self
    }

    pub fn poll_interval(mut self, value: &str) -> Self {
        self.config.run.poll_interval = value.to_string();
        self
    }

    pub fn exit_timeout(mut self, value: &str) -> Self {
        self.config.run.exit_timeout = value.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> Config {
        Config::try_from(self.config).expect("Failed to build valid config from builder")
    }
}
