//! Error types for the collection engine.

use std::io;
use thiserror::Error;

/// Result type for collection operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in collection operations.
///
/// "File does not exist" is never an error anywhere in the engine: a missing
/// record file means "no record", a missing index file means "empty index",
/// and a missing sequence file means "no metadata yet".
#[derive(Debug, Error)]
pub enum CoreError {
    /// Storage layer error.
    #[error("storage error: {0}")]
    Storage(#[from] docstore_storage::StorageError),

    /// JSON encoding or decoding error.
    #[error("codec error: {0}")]
    Codec(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A record with this primary key already exists.
    #[error("duplicate primary key: {key}")]
    DuplicateKey {
        /// The stringified primary key.
        key: String,
    },

    /// A declared unique field already holds this value on another record.
    #[error("unique constraint violated: field {field} already holds {value}")]
    UniqueConstraint {
        /// The unique field that collided.
        field: String,
        /// The stringified colliding value.
        value: String,
    },

    /// The primary key's string form cannot name a record file.
    #[error("invalid primary key: {key:?}")]
    InvalidKey {
        /// The rejected key string.
        key: String,
    },

    /// An update attempted to change the record's primary key.
    #[error("primary key field {field} cannot be modified")]
    PrimaryKeyModified {
        /// The primary-key field name.
        field: String,
    },

    /// A record or value is not a JSON object.
    #[error("invalid document: {message}")]
    InvalidDocument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a duplicate-key error.
    pub fn duplicate_key(key: impl Into<String>) -> Self {
        Self::DuplicateKey { key: key.into() }
    }

    /// Creates a unique-constraint error.
    pub fn unique_constraint(field: impl Into<String>, value: impl Into<String>) -> Self {
        Self::UniqueConstraint {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Creates an invalid-key error.
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }

    /// Creates an invalid-document error.
    pub fn invalid_document(message: impl Into<String>) -> Self {
        Self::InvalidDocument {
            message: message.into(),
        }
    }
}
