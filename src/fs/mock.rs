// src/fs/mock.rs

use super::FileSystem;
use anyhow::{anyhow, Result};
use std::collections::HashMap;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Default)]
pub struct MockEntry {
    pub content: Vec<u8>,
    pub executable: bool,
}

/// In-memory filesystem. Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct MockFileSystem {
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    fail_writes: Arc<Mutex<bool>>,
    fail_permissions: Arc<Mutex<bool>>,
}

impl MockFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) {
        let mut files = self.files.lock().unwrap();
        files.insert(
            path.as_ref().to_path_buf(),
            MockEntry {
                content: content.into(),
                executable: false,
            },
        );
    }

    pub fn entry(&self, path: impl AsRef<Path>) -> Option<MockEntry> {
        self.files.lock().unwrap().get(path.as_ref()).cloned()
    }

    /// Make every subsequent write fail (simulates a full disk).
    pub fn fail_writes(&self, fail: bool) {
        *self.fail_writes.lock().unwrap() = fail;
    }

    /// Make every subsequent permission change fail.
    pub fn fail_permissions(&self, fail: bool) {
        *self.fail_permissions.lock().unwrap() = fail;
    }
}

/// Writer that commits its buffer into the shared map on every write.
struct MockWriter {
    path: PathBuf,
    files: Arc<Mutex<HashMap<PathBuf, MockEntry>>>,
    fail: Arc<Mutex<bool>>,
}

impl Write for MockWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if *self.fail.lock().unwrap() {
            return Err(io::Error::other("mock write failure"));
        }
        let mut files = self.files.lock().unwrap();
        let entry = files.entry(self.path.clone()).or_default();
        entry.content.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl FileSystem for MockFileSystem {
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        let files = self.files.lock().unwrap();
        match files.get(path) {
            Some(entry) => Ok(entry.content.clone()),
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }

    fn create(&self, path: &Path) -> Result<Box<dyn Write + Send>> {
        if *self.fail_writes.lock().unwrap() {
            return Err(anyhow!("mock create failure: {:?}", path));
        }
        self.files
            .lock()
            .unwrap()
            .insert(path.to_path_buf(), MockEntry::default());
        Ok(Box::new(MockWriter {
            path: path.to_path_buf(),
            files: Arc::clone(&self.files),
            fail: Arc::clone(&self.fail_writes),
        }))
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    fn remove_file(&self, path: &Path) -> Result<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn is_executable(&self, path: &Path) -> bool {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .is_some_and(|e| e.executable)
    }

    fn set_executable(&self, path: &Path, executable: bool) -> Result<()> {
        if *self.fail_permissions.lock().unwrap() {
            return Err(anyhow!("mock permission failure: {:?}", path));
        }
        let mut files = self.files.lock().unwrap();
        match files.get_mut(path) {
            Some(entry) => {
                entry.executable = executable;
                Ok(())
            }
            None => Err(anyhow!("File not found: {:?}", path)),
        }
    }
}
