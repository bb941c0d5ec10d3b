//! Bounded LRU cache of records.

use crate::collection::Document;
use lru::LruCache;
use std::num::NonZeroUsize;

/// A bounded, recency-ordered cache from stringified primary key to record.
///
/// The cache is a read-through, write-through accelerator: disk stays
/// authoritative. Eviction is capacity-triggered only — no TTL, no
/// background sweep — and never touches disk, so an evicted record remains
/// fully durable and is simply re-loaded on its next access.
#[derive(Debug)]
pub struct RecordCache {
    entries: LruCache<String, Document>,
}

impl RecordCache {
    /// Creates a cache bounded to `capacity` records.
    ///
    /// A capacity of zero is clamped to one.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: LruCache::new(capacity),
        }
    }

    /// Returns a copy of the cached record and marks it most recently used.
    pub fn get(&mut self, key: &str) -> Option<Document> {
        self.entries.get(key).cloned()
    }

    /// Caches a record, refreshing its recency.
    ///
    /// When the key is new and the cache is full, the least-recently-used
    /// entry is evicted first.
    pub fn insert(&mut self, key: String, record: Document) {
        self.entries.put(key, record);
    }

    /// Whether a record is cached. Does not touch recency.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains(key)
    }

    /// Drops a record from the cache, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Document> {
        self.entries.pop(key)
    }

    /// Iterates over cached `(key, record)` pairs without touching recency.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Document)> {
        self.entries.iter()
    }

    /// Number of cached records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured capacity.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.entries.cap().get()
    }
}
