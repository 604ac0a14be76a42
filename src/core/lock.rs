//! core::lock
//!
//! Advisory file locks guarding read-modify-write of shared local files
//! (the CSV side-index, the content store).
//!
//! # Invariants
//!
//! - The lock lives in a sibling file `<target>.lock`, never the target
//!   itself, so the target can be replaced by rename while locked
//! - Lock is automatically released on drop (RAII pattern)
//! - [`FileLock::acquire`] blocks; [`FileLock::try_acquire`] fails fast
//!
//! Locks are advisory: they coordinate processes using this crate, not
//! arbitrary editors of the same file.
//!
//! # Example
//!
//! ```
//! use quarto_press::core::lock::FileLock;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let target = dir.path().join("input.csv");
//! let lock = FileLock::acquire(&target).unwrap();
//! assert!(lock.is_held());
//! drop(lock);
//! ```

use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

/// Errors from locking operations.
#[derive(Debug, Error)]
pub enum LockError {
    /// Another process already holds the lock.
    #[error("'{0}' is locked by another process")]
    AlreadyLocked(PathBuf),

    /// Failed to create the lock file or its directory.
    #[error("failed to create lock: {0}")]
    CreateFailed(String),

    /// Failed to acquire the OS lock.
    #[error("failed to acquire lock: {0}")]
    AcquireFailed(String),
}

/// An exclusive advisory lock tied to a target path.
#[derive(Debug)]
pub struct FileLock {
    path: PathBuf,
    file: Option<File>,
}

impl FileLock {
    /// Path of the lock file guarding `target`.
    pub fn lock_path_for(target: &Path) -> PathBuf {
        let mut name = target
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".lock");
        target.with_file_name(name)
    }

    fn open(target: &Path) -> Result<(PathBuf, File), LockError> {
        if let Some(parent) = target.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                LockError::CreateFailed(format!("cannot create {}: {}", parent.display(), e))
            })?;
        }

        let path = Self::lock_path_for(target);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| {
                LockError::CreateFailed(format!("cannot open {}: {}", path.display(), e))
            })?;
        Ok((path, file))
    }

    /// Acquire the lock for `target`, waiting for other holders.
    pub fn acquire(target: &Path) -> Result<Self, LockError> {
        let (path, file) = Self::open(target)?;
        file.lock_exclusive()
            .map_err(|e| LockError::AcquireFailed(e.to_string()))?;
        Ok(Self {
            path,
            file: Some(file),
        })
    }

    /// Acquire the lock for `target` without waiting.
    ///
    /// # Errors
    ///
    /// [`LockError::AlreadyLocked`] if another handle holds it.
    pub fn try_acquire(target: &Path) -> Result<Self, LockError> {
        let (path, file) = Self::open(target)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self {
                path,
                file: Some(file),
            }),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Err(LockError::AlreadyLocked(target.to_path_buf()))
            }
            Err(e) => Err(LockError::AcquireFailed(e.to_string())),
        }
    }

    /// Check if the lock is currently held.
    pub fn is_held(&self) -> bool {
        self.file.is_some()
    }

    /// Get the path to the lock file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for FileLock {
    fn drop(&mut self) {
        if let Some(file) = self.file.take() {
            let _ = FileExt::unlock(&file);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn lock_path_is_sibling() {
        assert_eq!(
            FileLock::lock_path_for(Path::new("/tmp/site/input.csv")),
            PathBuf::from("/tmp/site/input.csv.lock")
        );
    }

    #[test]
    fn second_try_acquire_fails_while_held() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("store.json");

        let lock = FileLock::acquire(&target).unwrap();
        assert!(lock.is_held());
        assert!(matches!(
            FileLock::try_acquire(&target),
            Err(LockError::AlreadyLocked(_))
        ));

        drop(lock);
        assert!(FileLock::try_acquire(&target).is_ok());
    }

    #[test]
    fn creates_missing_parent() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("nested/deeper/input.csv");
        let lock = FileLock::acquire(&target).unwrap();
        assert!(lock.path().exists());
    }
}
