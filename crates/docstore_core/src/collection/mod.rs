//! The collection engine.

pub mod typed;

use crate::cache::RecordCache;
use crate::config::CollectionConfig;
use crate::dir::CollectionDir;
use crate::error::{CoreError, CoreResult};
use crate::index::UniqueIndex;
use crate::key;
use crate::meta::CollectionMeta;
use crate::queue::WriteQueue;
use docstore_storage as storage;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::HashSet;
use tracing::{debug, trace};

/// A record: a field-name → value mapping, always containing the
/// primary-key field once stored.
pub type Document = serde_json::Map<String, Value>;

/// A named, durable collection of JSON documents.
///
/// A collection owns a directory on disk (one pretty-printed JSON file per
/// record, named by the primary key's string form), a sequence file for
/// auto-generated numeric keys, one index file per declared unique field, a
/// bounded LRU cache, and a FIFO write queue.
///
/// # Concurrency
///
/// `Collection` is `Send + Sync`. Mutating operations ([`insert`],
/// [`update`], [`delete`]) are serialized in strict FIFO order through the
/// write queue; [`find_by_id`] and [`find`] never wait on it. A read
/// concurrent with a mutation observes the record's old or new file
/// contents — never torn bytes — because every write goes through atomic
/// write-temp-then-rename. Different collections are fully independent.
///
/// # Crash safety
///
/// Record, index, and sequence writes are independent atomic writes, not
/// one transaction. A crash between them can leave an index entry without
/// its record (or vice versa); this is an accepted risk window, matching
/// the persisted layout's contract.
///
/// [`insert`]: Collection::insert
/// [`update`]: Collection::update
/// [`delete`]: Collection::delete
/// [`find_by_id`]: Collection::find_by_id
/// [`find`]: Collection::find
pub struct Collection {
    config: CollectionConfig,
    dir: CollectionDir,
    indexes: Vec<UniqueIndex>,
    cache: Mutex<RecordCache>,
    queue: WriteQueue,
}

impl Collection {
    /// Opens (or creates) the collection described by `config`.
    ///
    /// Creates the directory if missing, acquires its exclusive lock, and
    /// primes the sequence file.
    ///
    /// # Errors
    ///
    /// Fails if another owner holds the directory lock or on I/O errors.
    pub fn open(config: CollectionConfig) -> CoreResult<Self> {
        let dir = CollectionDir::open(&config.path)?;
        let indexes = config
            .unique_keys
            .iter()
            .map(|field| UniqueIndex::new(field.clone(), dir.index_path(field)))
            .collect();
        let cache = Mutex::new(RecordCache::new(config.cache_capacity));

        let collection = Self {
            config,
            dir,
            indexes,
            cache,
            queue: WriteQueue::new(),
        };

        if CollectionMeta::load(&collection.dir.meta_path())?.is_none() {
            CollectionMeta::default().store(&collection.dir.meta_path())?;
        }

        debug!(
            collection = collection.name(),
            primary_key = %collection.config.primary_key,
            unique_keys = collection.indexes.len(),
            cache_capacity = collection.config.cache_capacity,
            "collection opened"
        );
        Ok(collection)
    }

    /// The collection name (final component of its directory path).
    #[must_use]
    pub fn name(&self) -> &str {
        self.dir.name()
    }

    /// The collection's configuration.
    #[must_use]
    pub fn config(&self) -> &CollectionConfig {
        &self.config
    }

    /// Inserts a document and returns it as stored, primary key included.
    ///
    /// If the document carries the primary-key field (and it is not null),
    /// that value is used verbatim; otherwise the next numeric key is
    /// allocated from the sequence file. Uniqueness of the primary key and
    /// of every declared unique field is checked before anything is
    /// written.
    ///
    /// # Errors
    ///
    /// - [`CoreError::DuplicateKey`] if a live record already has this key
    /// - [`CoreError::UniqueConstraint`] if a declared unique field's value
    ///   already belongs to a different record
    /// - [`CoreError::InvalidKey`] if the key's string form cannot name a
    ///   record file
    pub fn insert(&self, mut doc: Document) -> CoreResult<Document> {
        let _guard = self.queue.acquire();

        // Caller-provided key, or the next sequence value. A null primary
        // key counts as absent.
        let provided = matches!(doc.get(&self.config.primary_key), Some(v) if !v.is_null());
        let mut meta = None;
        if !provided {
            let loaded = CollectionMeta::load(&self.dir.meta_path())?.unwrap_or_default();
            doc.insert(
                self.config.primary_key.clone(),
                Value::from(loaded.next_numeric_id),
            );
            meta = Some(loaded);
        }
        let pk = doc[&self.config.primary_key].clone();
        let key_str = key::stringify(&pk);
        key::validate(&key_str)?;

        if self.cache.lock().contains(&key_str) || self.dir.record_exists(&key_str) {
            return Err(CoreError::duplicate_key(key_str));
        }

        // Validate every unique field before the first index write, so a
        // collision on a later field leaves earlier indexes untouched.
        let mut touched = Vec::new();
        for index in &self.indexes {
            let Some(value) = doc.get(index.field()) else {
                continue;
            };
            let value_str = key::stringify(value);
            let map = index.load()?;
            index.check(&map, &value_str, &pk)?;
            touched.push((index, map, value_str));
        }
        for (index, mut map, value_str) in touched {
            map.insert(value_str, pk.clone());
            index.store(&map)?;
        }

        self.write_record(&key_str, &doc)?;
        self.cache.lock().insert(key_str.clone(), doc.clone());

        if let Some(mut meta) = meta {
            meta.advance();
            meta.store(&self.dir.meta_path())?;
        }

        trace!(collection = self.name(), key = %key_str, "inserted record");
        Ok(doc)
    }

    /// Looks a record up by primary key.
    ///
    /// A cache hit returns immediately (and refreshes recency); a miss
    /// reads the record file and populates the cache. Returns `None` when
    /// no record exists — never an error.
    pub fn find_by_id(&self, id: &Value) -> CoreResult<Option<Document>> {
        let key_str = key::stringify(id);

        if let Some(doc) = self.cache.lock().get(&key_str) {
            return Ok(Some(doc));
        }

        match self.read_record(&key_str)? {
            Some(doc) => {
                self.cache.lock().insert(key_str, doc.clone());
                Ok(Some(doc))
            }
            None => Ok(None),
        }
    }

    /// Returns every record matching `predicate`.
    ///
    /// Cached records are tested first, then the directory is scanned for
    /// record files the cache does not hold, loading and testing each.
    /// Result order is "cached first, then scan order" and must not be
    /// relied on. The scan does not populate the cache.
    pub fn find<P>(&self, mut predicate: P) -> CoreResult<Vec<Document>>
    where
        P: FnMut(&Document) -> bool,
    {
        let mut results = Vec::new();
        let mut cached_keys = HashSet::new();

        {
            let cache = self.cache.lock();
            for (key_str, doc) in cache.iter() {
                cached_keys.insert(key_str.clone());
                if predicate(doc) {
                    results.push(doc.clone());
                }
            }
        }

        for key_str in self.dir.record_keys()? {
            if cached_keys.contains(&key_str) {
                continue;
            }
            // A record deleted between the scan and the read is skipped.
            if let Some(doc) = self.read_record(&key_str)? {
                if predicate(&doc) {
                    results.push(doc);
                }
            }
        }

        Ok(results)
    }

    /// Merges `changes` over the record with the given primary key.
    ///
    /// Returns the updated record, or `None` if no record exists. Unique
    /// fields present in `changes` are validated against their indexes
    /// before any index is rewritten; on success each touched index drops
    /// the old-value entry and gains the new one.
    ///
    /// # Errors
    ///
    /// - [`CoreError::UniqueConstraint`] if a changed unique value belongs
    ///   to a different record
    /// - [`CoreError::PrimaryKeyModified`] if `changes` would alter the
    ///   primary key
    pub fn update(&self, id: &Value, changes: Document) -> CoreResult<Option<Document>> {
        let _guard = self.queue.acquire();

        let key_str = key::stringify(id);
        let Some(current) = self.load_current(&key_str)? else {
            return Ok(None);
        };

        if let Some(new_pk) = changes.get(&self.config.primary_key) {
            if key::stringify(new_pk) != key_str {
                return Err(CoreError::PrimaryKeyModified {
                    field: self.config.primary_key.clone(),
                });
            }
        }

        let pk = current
            .get(&self.config.primary_key)
            .cloned()
            .unwrap_or_else(|| id.clone());

        let mut touched = Vec::new();
        for index in &self.indexes {
            let Some(new_value) = changes.get(index.field()) else {
                continue;
            };
            let new_str = key::stringify(new_value);
            let map = index.load()?;
            index.check(&map, &new_str, &pk)?;
            touched.push((index, map, new_str));
        }
        for (index, mut map, new_str) in touched {
            if let Some(old_value) = current.get(index.field()) {
                map.remove(&key::stringify(old_value));
            }
            map.insert(new_str, pk.clone());
            index.store(&map)?;
        }

        let mut updated = current;
        for (field, value) in changes {
            updated.insert(field, value);
        }

        self.write_record(&key_str, &updated)?;
        self.cache.lock().insert(key_str.clone(), updated.clone());

        trace!(collection = self.name(), key = %key_str, "updated record");
        Ok(Some(updated))
    }

    /// Deletes the record with the given primary key.
    ///
    /// Removes the record's entries from every unique index, deletes the
    /// record file, and drops the cache entry. Returns `false` if no record
    /// exists — never an error.
    pub fn delete(&self, id: &Value) -> CoreResult<bool> {
        let _guard = self.queue.acquire();

        let key_str = key::stringify(id);
        let Some(current) = self.load_current(&key_str)? else {
            return Ok(false);
        };

        for index in &self.indexes {
            let Some(value) = current.get(index.field()) else {
                continue;
            };
            let value_str = key::stringify(value);
            let mut map = index.load()?;
            // Only drop the entry if it still points at this record.
            let ours = map
                .get(&value_str)
                .is_some_and(|pk| key::stringify(pk) == key_str);
            if ours {
                map.remove(&value_str);
                index.store(&map)?;
            }
        }

        storage::remove(&self.dir.record_path(&key_str))?;
        self.cache.lock().remove(&key_str);

        trace!(collection = self.name(), key = %key_str, "deleted record");
        Ok(true)
    }

    /// Number of live records, counted from disk.
    pub fn len(&self) -> CoreResult<usize> {
        Ok(self.dir.record_keys()?.len())
    }

    /// Whether the collection has no records.
    pub fn is_empty(&self) -> CoreResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Cache-then-disk load without populating the cache.
    fn load_current(&self, key_str: &str) -> CoreResult<Option<Document>> {
        if let Some(doc) = self.cache.lock().get(key_str) {
            return Ok(Some(doc));
        }
        self.read_record(key_str)
    }

    fn read_record(&self, key_str: &str) -> CoreResult<Option<Document>> {
        match storage::read(&self.dir.record_path(key_str))? {
            Some(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(map) => Ok(Some(map)),
                _ => Err(CoreError::invalid_document(format!(
                    "record file {key_str}.json is not a JSON object"
                ))),
            },
            None => Ok(None),
        }
    }

    fn write_record(&self, key_str: &str, doc: &Document) -> CoreResult<()> {
        storage::atomic_write(
            &self.dir.record_path(key_str),
            &serde_json::to_vec_pretty(doc)?,
        )?;
        Ok(())
    }
}

impl std::fmt::Debug for Collection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collection")
            .field("name", &self.name())
            .field("primary_key", &self.config.primary_key)
            .field("unique_keys", &self.config.unique_keys)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    fn users() -> (TempDir, Collection) {
        let temp = tempdir().unwrap();
        let collection = Collection::open(
            CollectionConfig::new(temp.path().join("users"), "id").unique_key("email"),
        )
        .unwrap();
        (temp, collection)
    }

    fn doc(fields: Value) -> Document {
        fields.as_object().unwrap().clone()
    }

    #[test]
    fn insert_assigns_sequential_ids() {
        let (_temp, users) = users();

        let a = users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        let b = users.insert(doc(json!({"email": "b@x.com"}))).unwrap();

        assert_eq!(a["id"], json!(1));
        assert_eq!(b["id"], json!(2));
    }

    #[test]
    fn insert_uses_provided_key() {
        let (_temp, users) = users();

        let stored = users
            .insert(doc(json!({"id": "alice", "email": "a@x.com"})))
            .unwrap();

        assert_eq!(stored["id"], json!("alice"));
        // Provided keys do not consume the sequence.
        let next = users.insert(doc(json!({"email": "b@x.com"}))).unwrap();
        assert_eq!(next["id"], json!(1));
    }

    #[test]
    fn null_primary_key_is_allocated() {
        let (_temp, users) = users();

        let stored = users
            .insert(doc(json!({"id": null, "email": "a@x.com"})))
            .unwrap();

        assert_eq!(stored["id"], json!(1));
    }

    #[test]
    fn insert_duplicate_key_fails() {
        let (_temp, users) = users();

        users.insert(doc(json!({"id": 7, "email": "a@x.com"}))).unwrap();
        let err = users
            .insert(doc(json!({"id": 7, "email": "b@x.com"})))
            .unwrap_err();

        assert!(matches!(err, CoreError::DuplicateKey { key } if key == "7"));
    }

    #[test]
    fn insert_duplicate_unique_value_fails_cleanly() {
        let (_temp, users) = users();

        let first = users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        let err = users.insert(doc(json!({"email": "a@x.com"}))).unwrap_err();

        assert!(matches!(
            err,
            CoreError::UniqueConstraint { ref field, ref value }
                if field == "email" && value == "a@x.com"
        ));
        // First record and its index entry are unchanged.
        assert_eq!(users.find_by_id(&json!(1)).unwrap(), Some(first));
        // The failed insert never became a record.
        assert_eq!(users.len().unwrap(), 1);
    }

    #[test]
    fn insert_rejects_reserved_keys() {
        let (_temp, users) = users();

        for bad in ["_meta", "", "a/b"] {
            let err = users.insert(doc(json!({"id": bad}))).unwrap_err();
            assert!(matches!(err, CoreError::InvalidKey { .. }), "key {bad:?}");
        }
    }

    #[test]
    fn missing_unique_field_is_not_indexed() {
        let (_temp, users) = users();

        // Two documents without the unique field coexist.
        users.insert(doc(json!({"name": "a"}))).unwrap();
        users.insert(doc(json!({"name": "b"}))).unwrap();

        assert_eq!(users.len().unwrap(), 2);
    }

    #[test]
    fn find_by_id_round_trip() {
        let (_temp, users) = users();

        let stored = users
            .insert(doc(json!({"email": "a@x.com", "name": "Alice"})))
            .unwrap();

        assert_eq!(users.find_by_id(&json!(1)).unwrap(), Some(stored));
    }

    #[test]
    fn find_by_id_missing_is_none() {
        let (_temp, users) = users();

        assert_eq!(users.find_by_id(&json!(999)).unwrap(), None);
    }

    #[test]
    fn numeric_and_string_ids_are_the_same_record() {
        let (_temp, users) = users();

        users.insert(doc(json!({"id": 1, "email": "a@x.com"}))).unwrap();

        // String "1" names the same record file as numeric 1.
        assert!(users.find_by_id(&json!("1")).unwrap().is_some());
    }

    #[test]
    fn unique_values_collide_across_types() {
        let (_temp, users) = users();

        users.insert(doc(json!({"email": 1}))).unwrap();
        let err = users.insert(doc(json!({"email": "1"}))).unwrap_err();

        assert!(matches!(err, CoreError::UniqueConstraint { .. }));
    }

    #[test]
    fn find_covers_cache_and_disk() {
        let temp = tempdir().unwrap();
        // Capacity 2 forces most records out to disk.
        let users = Collection::open(
            CollectionConfig::new(temp.path().join("users"), "id").cache_capacity(2),
        )
        .unwrap();

        for n in 0..6 {
            users.insert(doc(json!({"n": n}))).unwrap();
        }

        let evens = users
            .find(|d| d["n"].as_i64().unwrap() % 2 == 0)
            .unwrap();
        assert_eq!(evens.len(), 3);

        let all = users.find(|_| true).unwrap();
        assert_eq!(all.len(), 6);
    }

    #[test]
    fn update_merges_changes() {
        let (_temp, users) = users();

        users
            .insert(doc(json!({"email": "a@x.com", "name": "Alice"})))
            .unwrap();
        let updated = users
            .update(&json!(1), doc(json!({"name": "Alicia", "age": 30})))
            .unwrap()
            .unwrap();

        assert_eq!(updated["name"], json!("Alicia"));
        assert_eq!(updated["age"], json!(30));
        assert_eq!(updated["email"], json!("a@x.com"));
        assert_eq!(users.find_by_id(&json!(1)).unwrap(), Some(updated));
    }

    #[test]
    fn update_missing_is_none() {
        let (_temp, users) = users();

        assert_eq!(users.update(&json!(1), Document::new()).unwrap(), None);
    }

    #[test]
    fn update_unique_collision_keeps_original_value() {
        let (_temp, users) = users();

        users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        users.insert(doc(json!({"email": "b@x.com"}))).unwrap();

        let err = users
            .update(&json!(2), doc(json!({"email": "a@x.com"})))
            .unwrap_err();
        assert!(matches!(err, CoreError::UniqueConstraint { .. }));

        let two = users.find_by_id(&json!(2)).unwrap().unwrap();
        assert_eq!(two["email"], json!("b@x.com"));
    }

    #[test]
    fn update_unique_value_to_itself_is_allowed() {
        let (_temp, users) = users();

        users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        let updated = users
            .update(&json!(1), doc(json!({"email": "a@x.com"})))
            .unwrap();

        assert!(updated.is_some());
    }

    #[test]
    fn update_moves_unique_value() {
        let (_temp, users) = users();

        users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        users
            .update(&json!(1), doc(json!({"email": "b@x.com"})))
            .unwrap()
            .unwrap();

        // The old value is free again.
        let second = users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        assert_eq!(second["id"], json!(2));
    }

    #[test]
    fn update_cannot_change_primary_key() {
        let (_temp, users) = users();

        users.insert(doc(json!({"email": "a@x.com"}))).unwrap();

        let err = users.update(&json!(1), doc(json!({"id": 2}))).unwrap_err();
        assert!(matches!(err, CoreError::PrimaryKeyModified { .. }));

        // Restating the same key is not a change.
        assert!(users.update(&json!(1), doc(json!({"id": 1}))).unwrap().is_some());
    }

    #[test]
    fn delete_removes_record_and_frees_unique_value() {
        let (_temp, users) = users();

        users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        assert!(users.delete(&json!(1)).unwrap());

        assert_eq!(users.find_by_id(&json!(1)).unwrap(), None);
        assert_eq!(users.len().unwrap(), 0);

        // The deleted record's unique value is reusable, and its key is not.
        let next = users.insert(doc(json!({"email": "a@x.com"}))).unwrap();
        assert_eq!(next["id"], json!(2));
    }

    #[test]
    fn delete_missing_is_false() {
        let (_temp, users) = users();

        assert!(!users.delete(&json!(1)).unwrap());
    }
}
