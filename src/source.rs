// src/source.rs

use std::fmt;

use crate::errors::{BinvisorError, Result};
use crate::types::DigestAlgorithm;

/// Where to fetch the artifact from and the digest it must have.
///
/// Immutable once built; the expected digest is raw bytes and is compared
/// byte-for-byte.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceDescriptor {
    url: String,
    expected_digest: Vec<u8>,
    algorithm: DigestAlgorithm,
}

impl SourceDescriptor {
    pub fn new(
        url: impl Into<String>,
        expected_digest: Vec<u8>,
        algorithm: DigestAlgorithm,
    ) -> Result<Self> {
        let url = url.into();
        if url.trim().is_empty() {
            return Err(BinvisorError::ConfigError(
                "source url must not be empty".to_string(),
            ));
        }
        if expected_digest.is_empty() {
            return Err(BinvisorError::ConfigError(
                "expected digest must not be empty".to_string(),
            ));
        }
        Ok(Self {
            url,
            expected_digest,
            algorithm,
        })
    }

    /// Build a descriptor from a CDN host and a path on that host.
    pub fn from_host(
        scheme: &str,
        host: &str,
        path: &str,
        expected_digest: Vec<u8>,
        algorithm: DigestAlgorithm,
    ) -> Result<Self> {
        let host = host.trim().trim_end_matches('/');
        if host.is_empty() {
            return Err(BinvisorError::ConfigError(
                "source host must not be empty".to_string(),
            ));
        }
        let path = path.trim().trim_start_matches('/');
        Self::new(
            format!("{scheme}://{host}/{path}"),
            expected_digest,
            algorithm,
        )
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn expected_digest(&self) -> &[u8] {
        &self.expected_digest
    }

    pub fn algorithm(&self) -> DigestAlgorithm {
        self.algorithm
    }
}

impl fmt::Debug for SourceDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDescriptor")
            .field("url", &self.url)
            .field("expected_digest", &hex::encode(&self.expected_digest))
            .field("algorithm", &self.algorithm)
            .finish()
    }
}
