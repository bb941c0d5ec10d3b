//! Collection directory layout.
//!
//! ```text
//! <collectionDir>/
//! ├─ LOCK                         advisory single-owner lock
//! ├─ _meta.json                   sequence metadata
//! ├─ _index_unique_<field>.json   one per declared unique field
//! └─ <primaryKeyString>.json      one per record
//! ```
//!
//! Record files are named by the primary key's string form; everything that
//! is not a record carries the reserved `_` prefix (or no `.json`
//! extension), which is what keeps the directory scan sound.

use crate::config::name_of;
use crate::error::CoreResult;
use docstore_storage::DirLock;
use std::fs;
use std::path::{Path, PathBuf};

/// Sequence metadata file name.
const META_FILE: &str = "_meta.json";
/// Prefix of unique-index file names.
const INDEX_PREFIX: &str = "_index_unique_";
/// Extension shared by all persisted JSON files.
const JSON_EXT: &str = "json";

/// A collection's directory on disk, held under an exclusive lock.
///
/// Only one `CollectionDir` can exist per directory at a time — the
/// in-memory write queue serializes mutations within a process, and the
/// lock extends that exclusivity across processes.
#[derive(Debug)]
pub struct CollectionDir {
    path: PathBuf,
    _lock: DirLock,
}

impl CollectionDir {
    /// Opens the directory at `path`, creating it if missing, and acquires
    /// its lock.
    ///
    /// # Errors
    ///
    /// Returns [`docstore_storage::StorageError::Locked`] (wrapped in
    /// [`crate::CoreError::Storage`]) if another owner holds the directory.
    pub fn open(path: &Path) -> CoreResult<Self> {
        fs::create_dir_all(path)?;
        let lock = DirLock::acquire(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            _lock: lock,
        })
    }

    /// The directory path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The collection name (final path component).
    #[must_use]
    pub fn name(&self) -> &str {
        name_of(&self.path)
    }

    /// Path of the sequence metadata file.
    #[must_use]
    pub fn meta_path(&self) -> PathBuf {
        self.path.join(META_FILE)
    }

    /// Path of the unique-index file for `field`.
    #[must_use]
    pub fn index_path(&self, field: &str) -> PathBuf {
        self.path.join(format!("{INDEX_PREFIX}{field}.{JSON_EXT}"))
    }

    /// Path of the record file for a stringified primary key.
    #[must_use]
    pub fn record_path(&self, key: &str) -> PathBuf {
        self.path.join(format!("{key}.{JSON_EXT}"))
    }

    /// Whether a record file exists for the stringified key.
    #[must_use]
    pub fn record_exists(&self, key: &str) -> bool {
        self.record_path(key).exists()
    }

    /// Lists the stringified primary keys of all record files.
    ///
    /// Skips the metadata and index files (reserved `_` prefix), the lock
    /// file, orphaned `.tmp` files, and subdirectories. Order is the
    /// directory's enumeration order.
    pub fn record_keys(&self) -> CoreResult<Vec<String>> {
        let mut keys = Vec::new();
        for entry in fs::read_dir(&self.path)? {
            let entry = entry?;
            let path = entry.path();
            if !path.is_file() || path.extension().is_none_or(|ext| ext != JSON_EXT) {
                continue;
            }
            let Some(stem) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            if stem.starts_with('_') {
                continue;
            }
            keys.push(stem.to_string());
        }
        Ok(keys)
    }
}
