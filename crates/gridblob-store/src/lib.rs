//! Named and id-addressed blobs on top of a large-object storage engine.
//!
//! A [`BlobStore`] binds one engine [`Session`] to a (database, bucket)
//! namespace and mints, finds and removes blobs there. Each open blob is a
//! [`BlobHandle`]: write-only when it comes from [`BlobStore::create`],
//! read/seek-only when it comes from one of the `open_*` methods.
//!
//! Blobs have two keys. The name is human-readable and may be shared by
//! several blobs; the [`BlobId`] is assigned by the engine at creation,
//! never reused, and exchanged with callers as 24 hex characters.
//!
//! ```
//! use std::io::{Read, Write};
//! use gridblob_store::{BlobStore, MemoryEngine, StoreConfig};
//!
//! # fn main() -> gridblob_store::BlobResult<()> {
//! let engine = MemoryEngine::new();
//! let store = BlobStore::connect(&engine, &StoreConfig::default())?;
//!
//! let mut handle = store.create("hello.txt")?;
//! handle.write_all(b"Hello World!")?;
//! let info = handle.close()?;
//!
//! let mut reopened = store.open_by_id(&info.id.to_hex())?;
//! let mut text = String::new();
//! reopened.read_to_string(&mut text)?;
//! assert_eq!(text, "Hello World!");
//! # Ok(())
//! # }
//! ```
//!
//! # Concurrency
//!
//! Every call blocks until the engine answers. The session is shared by all
//! handles of a store and must tolerate whatever concurrency the caller
//! uses; a single handle must not be shared across threads without
//! external synchronization.

pub mod config;
pub mod copy;
pub mod error;
pub mod handle;
pub mod store;

pub use config::StoreConfig;
pub use copy::{copy_in, copy_out, write_file};
pub use error::{BlobError, BlobResult, ErrorKind};
pub use handle::{decode_id, BlobHandle, BlobInfo};
pub use store::BlobStore;

// Re-export the types that appear in this crate's public API.
pub use gridblob_engine::{Connector, FileMode, MemoryEngine, Namespace, Session};
pub use gridblob_types::{BlobId, Checksum};
