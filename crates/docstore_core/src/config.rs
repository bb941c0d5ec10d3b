//! Collection configuration.

use std::path::{Path, PathBuf};

/// Cache capacity used when none is configured.
pub const DEFAULT_CACHE_CAPACITY: usize = 1024;

/// Configuration for opening a collection.
///
/// The collection name is the final component of `path`. Setting
/// `cache_capacity` at least as large as the collection ever grows turns the
/// store into the fully memory-resident model: after the first access of
/// each record, reads never fall back to disk.
#[derive(Debug, Clone)]
pub struct CollectionConfig {
    /// Directory that holds the collection's files.
    pub path: PathBuf,

    /// Name of the primary-key field.
    pub primary_key: String,

    /// Names of fields with a uniqueness constraint.
    pub unique_keys: Vec<String>,

    /// Maximum number of records held in the in-memory cache.
    pub cache_capacity: usize,
}

impl CollectionConfig {
    /// Creates a configuration for the collection at `path`, identified by
    /// the `primary_key` field.
    pub fn new(path: impl Into<PathBuf>, primary_key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            primary_key: primary_key.into(),
            unique_keys: Vec::new(),
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }

    /// Declares a unique field.
    #[must_use]
    pub fn unique_key(mut self, field: impl Into<String>) -> Self {
        self.unique_keys.push(field.into());
        self
    }

    /// Declares several unique fields at once.
    #[must_use]
    pub fn unique_keys<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unique_keys.extend(fields.into_iter().map(Into::into));
        self
    }

    /// Sets the cache capacity.
    #[must_use]
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Returns the collection name (the final path component).
    #[must_use]
    pub fn name(&self) -> &str {
        name_of(&self.path)
    }
}

/// Collection name for a directory path.
pub(crate) fn name_of(path: &Path) -> &str {
    path.file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("collection")
}
