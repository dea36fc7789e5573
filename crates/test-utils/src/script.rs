use std::fs;
use std::path::{Path, PathBuf};

/// Write an executable `/bin/sh` script named `name` into `dir`.
#[cfg(unix)]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = dir.join(name);
    fs::write(&path, script_source(body)).expect("writing fake binary");
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755))
        .expect("making fake binary executable");
    path
}

#[cfg(not(unix))]
pub fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, script_source(body)).expect("writing fake binary");
    path
}

/// Source of a fake binary, suitable for serving over HTTP.
pub fn script_source(body: &str) -> String {
    format!("#!/bin/sh\n{body}\n")
}
