//! # docstore core
//!
//! An embedded, file-backed document store. Each [`Collection`] is a
//! directory of pretty-printed JSON files — one per record, named by the
//! record's primary key — plus a sequence file for auto-generated numeric
//! keys and one index file per declared unique field.
//!
//! The engine keeps a bounded LRU cache of records in front of disk, so a
//! collection larger than memory pages records in on demand; configuring the
//! cache at least as large as the collection degenerates into the
//! fully-memory-resident model. All mutations on a collection are serialized
//! through a strict-FIFO write queue; reads never wait on it.
//!
//! Every file write goes through atomic write-temp-then-rename
//! ([`docstore_storage::atomic_write`]), so readers observe old or new file
//! contents, never torn bytes. Record, index, and sequence writes are
//! *independent* atomic writes — a crash between them can leave an index
//! entry without its record (or vice versa); there is no multi-file
//! transaction.
//!
//! ## Example
//!
//! ```no_run
//! use docstore_core::{Collection, CollectionConfig, CoreResult, Document};
//! use serde_json::Value;
//!
//! fn main() -> CoreResult<()> {
//!     let users = Collection::open(
//!         CollectionConfig::new("data/users", "id").unique_key("email"),
//!     )?;
//!
//!     let mut doc = Document::new();
//!     doc.insert("email".into(), Value::from("alice@example.com"));
//!     let alice = users.insert(doc)?;
//!     assert!(alice.contains_key("id"));
//!
//!     let found = users.find_by_id(&alice["id"])?;
//!     assert_eq!(found, Some(alice));
//!     Ok(())
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
mod collection;
pub mod config;
mod dir;
mod error;
pub mod index;
pub mod key;
pub mod meta;
pub mod queue;

pub use collection::typed::TypedCollection;
pub use collection::{Collection, Document};
pub use config::{CollectionConfig, DEFAULT_CACHE_CAPACITY};
pub use dir::CollectionDir;
pub use error::{CoreError, CoreResult};
