// src/integrity.rs

//! Content digests for the provisioned artifact.
//!
//! Verification never returns an error: an unreadable artifact is reported as
//! [`Verdict::Unreadable`] and the provisioner treats it exactly like a
//! digest mismatch (delete and re-fetch).

use std::path::Path;

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::fs::FileSystem;
use crate::types::DigestAlgorithm;

/// Outcome of checking an artifact against its expected digest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    Match,
    Mismatch,
    Unreadable(String),
}

impl Verdict {
    pub fn is_match(&self) -> bool {
        matches!(self, Verdict::Match)
    }
}

/// Incremental hasher, so downloads can be digested while streaming.
pub enum DigestHasher {
    Blake3(Box<blake3::Hasher>),
    Sha256(Sha256),
}

impl DigestHasher {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        match algorithm {
            DigestAlgorithm::Blake3 => DigestHasher::Blake3(Box::new(blake3::Hasher::new())),
            DigestAlgorithm::Sha256 => DigestHasher::Sha256(Sha256::new()),
        }
    }

    pub fn update(&mut self, bytes: &[u8]) {
        match self {
            DigestHasher::Blake3(h) => {
                h.update(bytes);
            }
            DigestHasher::Sha256(h) => h.update(bytes),
        }
    }

    pub fn finalize(self) -> Vec<u8> {
        match self {
            DigestHasher::Blake3(h) => h.finalize().as_bytes().to_vec(),
            DigestHasher::Sha256(h) => h.finalize().to_vec(),
        }
    }
}

/// Compute the digest of `bytes` with the given algorithm.
pub fn compute_digest(algorithm: DigestAlgorithm, bytes: &[u8]) -> Vec<u8> {
    let mut hasher = DigestHasher::new(algorithm);
    hasher.update(bytes);
    hasher.finalize()
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IntegrityChecker {
    algorithm: DigestAlgorithm,
}

impl IntegrityChecker {
    pub fn new(algorithm: DigestAlgorithm) -> Self {
        Self { algorithm }
    }

    /// Digest the full content and compare byte-for-byte with `expected`.
    pub fn verify(&self, bytes: &[u8], expected: &[u8]) -> bool {
        let actual = compute_digest(self.algorithm, bytes);
        !expected.is_empty() && actual.as_slice() == expected
    }

    /// Read the whole file at `path` and check it against `expected`.
    pub fn verify_file(&self, fs: &dyn FileSystem, path: &Path, expected: &[u8]) -> Verdict {
        let bytes = match fs.read(path) {
            Ok(bytes) => bytes,
            Err(e) => return Verdict::Unreadable(format!("{e:#}")),
        };

        if self.verify(&bytes, expected) {
            debug!(path = ?path, len = bytes.len(), "artifact digest matches");
            Verdict::Match
        } else {
            debug!(path = ?path, len = bytes.len(), "artifact digest mismatch");
            Verdict::Mismatch
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::mock::MockFileSystem;

    #[test]
    fn blake3_digest_of_known_input() {
        let digest = compute_digest(DigestAlgorithm::Blake3, b"hello world");
        assert_eq!(
            hex::encode(digest),
            "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24"
        );
    }

    #[test]
    fn sha256_digest_of_known_input() {
        let digest = compute_digest(DigestAlgorithm::Sha256, b"hello world");
        assert_eq!(
            hex::encode(digest),
            "b94d27b9934d3e08a52e52d7da7dabfac484efe37a5380ee9088f7ace2efcde9"
        );
    }

    #[test]
    fn incremental_hash_equals_one_shot() {
        let mut hasher = DigestHasher::new(DigestAlgorithm::Sha256);
        hasher.update(b"hello ");
        hasher.update(b"world");
        assert_eq!(
            hasher.finalize(),
            compute_digest(DigestAlgorithm::Sha256, b"hello world")
        );
    }

    #[test]
    fn empty_expected_digest_never_matches() {
        let checker = IntegrityChecker::new(DigestAlgorithm::Blake3);
        assert!(!checker.verify(b"anything", &[]));
    }

    #[test]
    fn truncated_content_is_rejected() {
        let checker = IntegrityChecker::new(DigestAlgorithm::Blake3);
        let expected = compute_digest(DigestAlgorithm::Blake3, b"full content");
        assert!(!checker.verify(b"full conten", &expected));
    }

    #[test]
    fn missing_file_is_unreadable_not_an_error() {
        let fs = MockFileSystem::new();
        let checker = IntegrityChecker::default();
        let verdict = checker.verify_file(&fs, Path::new("/nope"), &[1; 32]);
        assert!(matches!(verdict, Verdict::Unreadable(_)));
    }

    #[test]
    fn file_verdicts() {
        let fs = MockFileSystem::new();
        fs.add_file("/bin/tool", b"tool-bytes".to_vec());
        let checker = IntegrityChecker::default();

        let good = compute_digest(DigestAlgorithm::Blake3, b"tool-bytes");
        assert_eq!(
            checker.verify_file(&fs, Path::new("/bin/tool"), &good),
            Verdict::Match
        );

        let bad = compute_digest(DigestAlgorithm::Blake3, b"other");
        assert_eq!(
            checker.verify_file(&fs, Path::new("/bin/tool"), &bad),
            Verdict::Mismatch
        );
    }
}
