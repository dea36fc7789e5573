// src/config/loader.rs

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::model::{Config, RawConfigFile};
use crate::errors::Result;

/// Load a configuration file from a given path and return the raw `RawConfigFile`.
///
/// This only performs TOML deserialization; it does **not** perform semantic
/// validation. Use [`load_and_validate`] for that.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<RawConfigFile> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path)?;

    let config: RawConfigFile = toml::from_str(&contents)?;

    Ok(config)
}

/// Load a configuration file, apply an optional host override, and validate.
pub fn load_and_validate(path: impl AsRef<Path>, host_override: Option<&str>) -> Result<Config> {
    let raw = load_from_path(&path)?.with_host_override(host_override);
    Config::try_from(raw)
}

/// `Binvisor.toml` in the current working directory.
pub fn default_config_path() -> PathBuf {
    PathBuf::from("Binvisor.toml")
}
