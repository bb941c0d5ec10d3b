//! Advisory directory locking.

use crate::error::{StorageError, StorageResult};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};

/// Name of the lock file inside a locked directory.
const LOCK_FILE: &str = "LOCK";

/// An exclusive advisory lock on a directory.
///
/// The lock is implemented as an `fs2` exclusive lock on a `LOCK` file
/// inside the directory. It guards against a second process (or a second
/// handle in the same process) opening the same collection directory: the
/// collection's write serialization is in-memory and provides no
/// cross-process exclusion on its own.
///
/// The lock is released when the `DirLock` is dropped.
#[derive(Debug)]
pub struct DirLock {
    path: PathBuf,
    /// Held for the lifetime of the lock; closing the file releases it.
    _file: File,
}

impl DirLock {
    /// Acquires an exclusive lock on `dir`.
    ///
    /// The directory must already exist.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::Locked`] if another owner holds the lock,
    /// or an I/O error if the lock file cannot be opened.
    pub fn acquire(dir: &Path) -> StorageResult<Self> {
        let lock_path = dir.join(LOCK_FILE);
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)?;

        if file.try_lock_exclusive().is_err() {
            return Err(StorageError::Locked {
                path: dir.to_path_buf(),
            });
        }

        Ok(Self {
            path: dir.to_path_buf(),
            _file: file,
        })
    }

    /// Returns the locked directory.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
