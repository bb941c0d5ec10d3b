//! Primary-key and index-key stringification.
//!
//! Index files and record file names use the *string form* of a value, not
//! its type: strings are taken verbatim, everything else uses its compact
//! JSON rendering. Numeric `1` and string `"1"` therefore collide. This
//! coercion is part of the persisted format; switching to typed keys would
//! change collision semantics for existing data.

use crate::error::{CoreError, CoreResult};
use serde_json::Value;

/// Characters that can never appear in a record file name.
const FORBIDDEN: &[char] = &['/', '\\', '\0'];

/// Returns the string form of a key value.
#[must_use]
pub fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Validates a stringified primary key.
///
/// Record files share the collection directory with `_meta.json` and the
/// `_index_unique_*.json` files, so keys that are empty, `_`-prefixed, or
/// contain a path separator or NUL are rejected.
///
/// # Errors
///
/// Returns [`CoreError::InvalidKey`] for an unusable key.
pub fn validate(key: &str) -> CoreResult<()> {
    if key.is_empty() || key.starts_with('_') || key.contains(FORBIDDEN) {
        return Err(CoreError::invalid_key(key));
    }
    Ok(())
}
