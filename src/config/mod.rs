// src/config/mod.rs

//! Configuration loading and validation.
//!
//! - [`model`] mirrors the TOML layout (`RawConfigFile`) and holds the
//!   validated, ready-to-use [`Config`].
//! - [`validate`] turns the former into the latter.
//! - [`loader`] reads files from disk.
//! - [`duration`] parses `"250ms"` / `"10s"` / `"1m"` style values.

pub mod duration;
pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{Config, ProvisionSection, RawConfigFile, RawSourceSection, RunSection};
