//! Unique secondary-index files.

use crate::error::{CoreError, CoreResult};
use crate::key;
use docstore_storage::{atomic_write, read};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

/// The in-memory form of one index file: stringified field value → primary
/// key of the record holding it.
///
/// A `BTreeMap` keeps the rewritten file's entries in a stable order.
pub type IndexMap = BTreeMap<String, Value>;

/// Handle to the unique index for one declared field.
///
/// The index lives in `_index_unique_<field>.json` inside the collection
/// directory. It is deliberately stateless between operations: every touch
/// loads the whole file, mutates the map, and rewrites it wholesale through
/// the atomic writer. That is acceptable because each index is one flat
/// mapping per field.
///
/// Invariant: for every live record `r`, `index[stringify(r[field])]` is
/// `r`'s primary key; absence of an entry means no live record holds that
/// value. Entries are keyed by *string form*, so values of different JSON
/// types with the same rendering collide.
#[derive(Debug, Clone)]
pub struct UniqueIndex {
    field: String,
    path: PathBuf,
}

impl UniqueIndex {
    /// Creates a handle for `field`, persisted at `path`.
    pub fn new(field: impl Into<String>, path: PathBuf) -> Self {
        Self {
            field: field.into(),
            path,
        }
    }

    /// The indexed field name.
    #[must_use]
    pub fn field(&self) -> &str {
        &self.field
    }

    /// Loads the index file. A missing file is an empty index.
    pub fn load(&self) -> CoreResult<IndexMap> {
        match read(&self.path)? {
            Some(bytes) => Ok(serde_json::from_slice(&bytes)?),
            None => Ok(IndexMap::new()),
        }
    }

    /// Persists the index atomically.
    pub fn store(&self, map: &IndexMap) -> CoreResult<()> {
        atomic_write(&self.path, &serde_json::to_vec_pretty(map)?)?;
        Ok(())
    }

    /// Fails if `value_str` is already mapped to a primary key other than
    /// `pk`.
    ///
    /// Primary keys are compared by string form, consistent with how the
    /// index itself is keyed.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::UniqueConstraint`] on a conflict.
    pub fn check(&self, map: &IndexMap, value_str: &str, pk: &Value) -> CoreResult<()> {
        if let Some(existing) = map.get(value_str) {
            if key::stringify(existing) != key::stringify(pk) {
                return Err(CoreError::unique_constraint(&self.field, value_str));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;

    fn index_at(dir: &std::path::Path) -> UniqueIndex {
        UniqueIndex::new("email", dir.join("_index_unique_email.json"))
    }

    #[test]
    fn missing_file_is_empty_index() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path());

        assert!(index.load().unwrap().is_empty());
    }

    #[test]
    fn store_and_load_round_trip() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path());

        let mut map = IndexMap::new();
        map.insert("a@x.com".into(), json!(1));
        map.insert("b@x.com".into(), json!("user-2"));
        index.store(&map).unwrap();

        assert_eq!(index.load().unwrap(), map);
    }

    #[test]
    fn check_passes_on_vacant_value() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path());

        index.check(&IndexMap::new(), "a@x.com", &json!(1)).unwrap();
    }

    #[test]
    fn check_passes_for_same_record() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path());

        let mut map = IndexMap::new();
        map.insert("a@x.com".into(), json!(1));

        // The record that owns the value may keep it.
        index.check(&map, "a@x.com", &json!(1)).unwrap();
    }

    #[test]
    fn check_fails_for_other_record() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path());

        let mut map = IndexMap::new();
        map.insert("a@x.com".into(), json!(1));

        let err = index.check(&map, "a@x.com", &json!(2)).unwrap_err();
        match err {
            CoreError::UniqueConstraint { field, value } => {
                assert_eq!(field, "email");
                assert_eq!(value, "a@x.com");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn primary_keys_compare_by_string_form() {
        let dir = tempdir().unwrap();
        let index = index_at(dir.path());

        let mut map = IndexMap::new();
        map.insert("a@x.com".into(), json!(1));

        // Numeric 1 and string "1" are the same record identity here.
        index.check(&map, "a@x.com", &json!("1")).unwrap();
    }
}
