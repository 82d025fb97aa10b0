//! Filesystem-backed key store: one file per entry.
//!
//! Values are written as plain bytes under a configured directory, with no
//! platform protection of any kind. This backend exists for development
//! boxes and headless environments without an OS keychain; production
//! deployments are expected to wire a platform-backed [`KeyStore`]
//! implementation instead.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use crate::error::StoreError;
use crate::store::KeyStore;

/// [`KeyStore`] that maps each entry name to a file in one directory.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    dir: PathBuf,
}

impl FileKeyStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first write, not here.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Resolve `name` to its backing file, rejecting names that could
    /// escape the store directory or collide with path syntax.
    fn entry_path(&self, name: &str) -> Result<PathBuf, StoreError> {
        let valid = !name.is_empty()
            && name != "."
            && name != ".."
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StoreError::Backend(format!("invalid entry name: {name:?}")));
        }
        Ok(self.dir.join(name))
    }
}

impl KeyStore for FileKeyStore {
    fn retrieve(&self, name: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let path = self.entry_path(name)?;
        match fs::read(&path) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn store(&self, name: &str, value: &[u8]) -> Result<(), StoreError> {
        let path = self.entry_path(name)?;
        fs::create_dir_all(&self.dir)?;
        fs::write(&path, value)?;
        Ok(())
    }

    fn delete(&self, name: &str) -> Result<(), StoreError> {
        let path = self.entry_path(name)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
