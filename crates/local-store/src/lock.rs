//! Advisory file locks shared by every process that opens the same store.
//!
//! The daemon and each CLI invocation hold their own [`LocalStore`]; these
//! locks keep their sync-state updates and per-team attempts from
//! interleaving. Released when the guard drops or the process exits.
//!
//! [`LocalStore`]: crate::LocalStore

use std::fs::{File, OpenOptions, TryLockError};
use std::path::{Path, PathBuf};

use crate::StoreError;

pub const LOCK_EXT: &str = ".lock";

/// Held exclusive lock on one lock file.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    _file: File,
}

impl FileLock {
    /// Block until the lock is held.
    pub fn acquire(path: &Path) -> Result<Self, StoreError> {
        let file = open(path)?;
        file.lock().map_err(|e| StoreError::io(path.display(), e))?;
        Ok(Self {
            path: path.to_path_buf(),
            _file: file,
        })
    }

    /// `None` when another holder has it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>, StoreError> {
        let file = open(path)?;
        match file.try_lock() {
            Ok(()) => Ok(Some(Self {
                path: path.to_path_buf(),
                _file: file,
            })),
            Err(TryLockError::WouldBlock) => Ok(None),
            Err(TryLockError::Error(e)) => Err(StoreError::io(path.display(), e)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

fn open(path: &Path) -> Result<File, StoreError> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .write(true)
        .open(path)
        .map_err(|e| StoreError::io(path.display(), e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_holder_waits_for_release() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("sync_state.lock");

        let held = FileLock::acquire(&path).unwrap();
        assert!(FileLock::try_acquire(&path).unwrap().is_none());
        drop(held);
        assert!(FileLock::try_acquire(&path).unwrap().is_some());
    }
}
