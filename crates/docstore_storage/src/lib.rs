//! # docstore storage
//!
//! Byte-level file primitives for docstore.
//!
//! This crate is the lowest storage layer. It knows nothing about
//! collections, records, or JSON — it moves **opaque bytes** between memory
//! and the filesystem with two guarantees the engine above relies on:
//!
//! - [`atomic_write`] replaces a file's contents via write-temp-then-rename,
//!   so a concurrent reader observes either the old contents or the new
//!   contents, never a mix.
//! - [`DirLock`] holds an exclusive advisory lock on a directory, so at most
//!   one process owns a collection directory at a time.
//!
//! ## Example
//!
//! ```no_run
//! use docstore_storage::{atomic_write, read};
//! use std::path::Path;
//!
//! let path = Path::new("data/users/1.json");
//! atomic_write(path, b"{}").unwrap();
//! assert_eq!(read(path).unwrap(), Some(b"{}".to_vec()));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod atomic;
mod error;
mod lock;

pub use atomic::{atomic_write, read, remove};
pub use error::{StorageError, StorageResult};
pub use lock::DirLock;
