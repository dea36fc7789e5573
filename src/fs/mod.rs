// src/fs/mod.rs

use std::fmt::Debug;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

pub mod mock;

/// Abstract filesystem interface used by the provisioner.
///
/// Everything the provisioner does to the artifact goes through this trait
/// so the check/delete/refetch logic can be exercised against
/// [`mock::MockFileSystem`].
pub trait FileSystem: Send + Sync + Debug {
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    /// Create (or truncate) a file for writing, creating parent directories.
    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>>;
    fn exists(&self, path: &Path) -> bool;

    /// Remove a file. Removing a missing file is not an error.
    fn remove_file(&self, path: &Path) -> Result<()>;

    fn is_executable(&self, path: &Path) -> bool;
    fn set_executable(&self, path: &Path, executable: bool) -> Result<()>;
}

/// Implementation that uses `std::fs`.
#[derive(Debug, Clone, Default)]
pub struct RealFileSystem;

impl FileSystem for RealFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        fs::read(path).with_context(|| format!("reading file {:?}", path))
    }

    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("creating dir {:?}", parent))?;
            }
        }
        let file = fs::File::create(path).with_context(|| format!("creating file {:?}", path))?;
        Ok(Box::new(file))
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("removing file {:?}", path)),
        }
    }

    #[cfg(unix)]
    fn is_executable(&self, path: &Path) -> bool {
        use std::os::unix::fs::PermissionsExt;
        fs::metadata(path)
            .map(|m| m.permissions().mode() & 0o111 != 0)
            .unwrap_or(false)
    }

    #[cfg(not(unix))]
    fn is_executable(&self, path: &Path) -> bool {
        path.is_file()
    }

    #[cfg(unix)]
    fn set_executable(&self, path: &Path, executable: bool) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;
        let mut perms = fs::metadata(path)
            .with_context(|| format!("reading permissions of {:?}", path))?
            .permissions();
        let mode = perms.mode();
        perms.set_mode(if executable { mode | 0o755 } else { mode & !0o111 });
        fs::set_permissions(path, perms)
            .with_context(|| format!("setting permissions of {:?}", path))
    }

    // Windows decides executability by extension, nothing to toggle.
    #[cfg(not(unix))]
    fn set_executable(&self, path: &Path, _executable: bool) -> Result<()> {
        fs::metadata(path).with_context(|| format!("reading metadata of {:?}", path))?;
        Ok(())
    }
}
