use std::str::FromStr;

use serde::Deserialize;

/// Digest algorithm used to authenticate the provisioned artifact.
///
/// - `Blake3`: default; fast and what the rest of the crate hashes with.
/// - `Sha256`: for upstreams that publish SHA-256 sums.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DigestAlgorithm {
    Blake3,
    Sha256,
}

impl DigestAlgorithm {
    /// Length in bytes of a digest produced by this algorithm.
    pub fn digest_len(self) -> usize {
        match self {
            DigestAlgorithm::Blake3 => blake3::OUT_LEN,
            DigestAlgorithm::Sha256 => 32,
        }
    }
}

impl Default for DigestAlgorithm {
    fn default() -> Self {
        DigestAlgorithm::Blake3
    }
}

impl FromStr for DigestAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "blake3" => Ok(DigestAlgorithm::Blake3),
            "sha256" | "sha-256" => Ok(DigestAlgorithm::Sha256),
            other => Err(format!(
                "invalid digest algorithm: {other} (expected \"blake3\" or \"sha256\")"
            )),
        }
    }
}

/// Why a supervised run stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishReason {
    /// The child exited on its own before any grace period elapsed.
    Exited,
    /// The sentinel grace period elapsed and the child then exited within
    /// the exit timeout.
    GracePeriodElapsed,
    /// The grace period elapsed and the child outlived the exit timeout, so
    /// it was killed.
    Killed,
}
