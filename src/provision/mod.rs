// src/provision/mod.rs

//! Artifact provisioning.
//!
//! - [`provisioner`] owns the check / delete / download state machine and the
//!   critical section that keeps concurrent callers to a single download.
//! - [`chunked`] re-chunks the download body into fixed-size writes and
//!   drives the progress callback.

pub mod chunked;
pub mod provisioner;

use std::path::PathBuf;
use std::sync::Arc;

pub use provisioner::{BinaryProvisioner, DEFAULT_CHUNK_SIZE};

/// Progress callback: `(bytes_done, bytes_total)`. `bytes_total` is `0` when
/// the remote did not advertise a length.
pub type ProgressFn = Arc<dyn Fn(u64, u64) + Send + Sync>;

/// Point-in-time view of a provisioner's lifecycle flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisioningState {
    pub initialized: bool,
    pub initializing: bool,
    pub local_path: PathBuf,
}
