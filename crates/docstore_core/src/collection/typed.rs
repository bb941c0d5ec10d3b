//! Typed collection wrapper.

use crate::collection::{Collection, Document};
use crate::error::{CoreError, CoreResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::marker::PhantomData;
use std::sync::Arc;

/// Type-safe access to a [`Collection`].
///
/// `TypedCollection<T>` encodes values of `T` to JSON documents on the way
/// in and decodes them on the way out. `T` must serialize to a JSON object.
///
/// # Language-Native Querying
///
/// There is no query DSL. Filtering is done with host-language constructs:
///
/// ```rust,ignore
/// let adults: Vec<User> = users.find(|u| u.age >= 18)?;
///
/// // Or over the full set, with iterator adapters:
/// let names: Vec<String> = users.scan_all()?.into_iter().map(|u| u.name).collect();
/// ```
///
/// # Example
///
/// ```rust,ignore
/// use docstore_core::{Collection, CollectionConfig, TypedCollection};
/// use serde::{Deserialize, Serialize};
/// use std::sync::Arc;
///
/// #[derive(Serialize, Deserialize)]
/// struct User {
///     id: Option<u64>,
///     email: String,
/// }
///
/// let raw = Arc::new(Collection::open(
///     CollectionConfig::new("data/users", "id").unique_key("email"),
/// )?);
/// let users: TypedCollection<User> = TypedCollection::new(raw);
///
/// let alice = users.insert(&User { id: None, email: "alice@example.com".into() })?;
/// assert!(alice.id.is_some());
/// ```
pub struct TypedCollection<T> {
    inner: Arc<Collection>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> TypedCollection<T>
where
    T: Serialize + DeserializeOwned,
{
    /// Wraps a collection.
    #[must_use]
    pub fn new(inner: Arc<Collection>) -> Self {
        Self {
            inner,
            _marker: PhantomData,
        }
    }

    /// The underlying raw collection.
    #[must_use]
    pub fn collection(&self) -> &Collection {
        &self.inner
    }

    /// Inserts a value, returning it as stored (primary key included).
    pub fn insert(&self, value: &T) -> CoreResult<T> {
        let doc = encode(value)?;
        decode(self.inner.insert(doc)?)
    }

    /// Gets a value by primary key. `None` if no record exists.
    pub fn get(&self, id: &Value) -> CoreResult<Option<T>> {
        self.inner.find_by_id(id)?.map(decode).transpose()
    }

    /// Returns every value matching `predicate`.
    ///
    /// Every record is decoded to `T` before the predicate runs; a record
    /// that does not decode is an error, not a non-match.
    pub fn find<P>(&self, mut predicate: P) -> CoreResult<Vec<T>>
    where
        P: FnMut(&T) -> bool,
    {
        let mut results = Vec::new();
        for doc in self.inner.find(|_| true)? {
            let value = decode(doc)?;
            if predicate(&value) {
                results.push(value);
            }
        }
        Ok(results)
    }

    /// Merges raw `changes` over the record and returns the updated value.
    pub fn update(&self, id: &Value, changes: Document) -> CoreResult<Option<T>> {
        self.inner.update(id, changes)?.map(decode).transpose()
    }

    /// Deletes a record by primary key.
    pub fn delete(&self, id: &Value) -> CoreResult<bool> {
        self.inner.delete(id)
    }

    /// Returns all values.
    ///
    /// **Warning**: full collection scan.
    pub fn scan_all(&self) -> CoreResult<Vec<T>> {
        self.find(|_| true)
    }

    /// Number of live records.
    pub fn len(&self) -> CoreResult<usize> {
        self.inner.len()
    }

    /// Whether the collection has no records.
    pub fn is_empty(&self) -> CoreResult<bool> {
        self.inner.is_empty()
    }
}

fn encode<T: Serialize>(value: &T) -> CoreResult<Document> {
    match serde_json::to_value(value)? {
        Value::Object(map) => Ok(map),
        other => Err(CoreError::invalid_document(format!(
            "expected a JSON object, got {other}"
        ))),
    }
}

fn decode<T: DeserializeOwned>(doc: Document) -> CoreResult<T> {
    Ok(serde_json::from_value(Value::Object(doc))?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CollectionConfig;
    use serde::Deserialize;
    use serde_json::json;
    use tempfile::{tempdir, TempDir};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct User {
        #[serde(default)]
        id: Option<u64>,
        email: String,
        age: i64,
    }

    fn users() -> (TempDir, TypedCollection<User>) {
        let temp = tempdir().unwrap();
        let raw = Arc::new(
            Collection::open(
                CollectionConfig::new(temp.path().join("users"), "id").unique_key("email"),
            )
            .unwrap(),
        );
        (temp, TypedCollection::new(raw))
    }

    fn user(email: &str, age: i64) -> User {
        User {
            id: None,
            email: email.to_string(),
            age,
        }
    }

    #[test]
    fn insert_assigns_id() {
        let (_temp, users) = users();

        let alice = users.insert(&user("alice@example.com", 30)).unwrap();

        assert_eq!(alice.id, Some(1));
        assert_eq!(alice.email, "alice@example.com");
    }

    #[test]
    fn get_round_trip() {
        let (_temp, users) = users();

        let alice = users.insert(&user("alice@example.com", 30)).unwrap();
        let found = users.get(&json!(1)).unwrap();

        assert_eq!(found, Some(alice));
    }

    #[test]
    fn get_missing_is_none() {
        let (_temp, users) = users();

        assert_eq!(users.get(&json!(99)).unwrap(), None);
    }

    #[test]
    fn find_with_host_language_predicate() {
        let (_temp, users) = users();

        users.insert(&user("young@example.com", 20)).unwrap();
        users.insert(&user("adult@example.com", 30)).unwrap();
        users.insert(&user("senior@example.com", 50)).unwrap();

        let adults = users.find(|u| u.age >= 25).unwrap();

        assert_eq!(adults.len(), 2);
    }

    #[test]
    fn unique_constraint_surfaces() {
        let (_temp, users) = users();

        users.insert(&user("alice@example.com", 30)).unwrap();
        let err = users.insert(&user("alice@example.com", 31)).unwrap_err();

        assert!(matches!(err, CoreError::UniqueConstraint { .. }));
    }

    #[test]
    fn update_and_delete() {
        let (_temp, users) = users();

        users.insert(&user("alice@example.com", 30)).unwrap();

        let updated = users
            .update(&json!(1), json!({"age": 31}).as_object().unwrap().clone())
            .unwrap()
            .unwrap();
        assert_eq!(updated.age, 31);

        assert!(users.delete(&json!(1)).unwrap());
        assert_eq!(users.get(&json!(1)).unwrap(), None);
    }

    #[test]
    fn non_object_values_are_rejected() {
        let err = encode(&42i64).unwrap_err();
        assert!(matches!(err, CoreError::InvalidDocument { .. }));
    }
}
