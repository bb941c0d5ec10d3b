//! Sequence metadata for auto-generated primary keys.

use crate::error::CoreResult;
use docstore_storage::{atomic_write, read};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Persisted counter supplying the next auto-generated primary key.
///
/// Stored as `_meta.json` in the collection directory:
///
/// ```json
/// { "nextNumericId": 7 }
/// ```
///
/// The counter is strictly increasing and never reused, even after deletes:
/// an insert that consumes the current value persists the incremented
/// counter immediately after the record itself is durable. Caller-provided
/// primary keys never advance the counter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionMeta {
    /// The next numeric primary key to hand out.
    #[serde(rename = "nextNumericId")]
    pub next_numeric_id: u64,
}

impl Default for CollectionMeta {
    fn default() -> Self {
        Self { next_numeric_id: 1 }
    }
}

impl CollectionMeta {
    /// Loads the metadata file, or `None` if it does not exist yet.
    pub fn load(path: &Path) -> CoreResult<Option<Self>> {
        match read(path)? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Persists the metadata atomically.
    pub fn store(&self, path: &Path) -> CoreResult<()> {
        atomic_write(path, &serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }

    /// Advances the counter by one.
    pub fn advance(&mut self) {
        self.next_numeric_id += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn load_missing_is_none() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_meta.json");

        assert_eq!(CollectionMeta::load(&path).unwrap(), None);
    }

    #[test]
    fn default_starts_at_one() {
        assert_eq!(CollectionMeta::default().next_numeric_id, 1);
    }

    #[test]
    fn store_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_meta.json");

        let meta = CollectionMeta { next_numeric_id: 42 };
        meta.store(&path).unwrap();

        assert_eq!(CollectionMeta::load(&path).unwrap(), Some(meta));
    }

    #[test]
    fn persisted_field_name_is_stable() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("_meta.json");

        CollectionMeta::default().store(&path).unwrap();

        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(raw.contains("\"nextNumericId\": 1"));
    }

    #[test]
    fn advance_increments() {
        let mut meta = CollectionMeta::default();
        meta.advance();
        meta.advance();

        assert_eq!(meta.next_numeric_id, 3);
    }
}
