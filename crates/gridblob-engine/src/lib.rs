//! Storage-engine interface for gridblob.
//!
//! The blob facade never talks to a database directly. It goes through the
//! small set of primitives defined here: a [`Connector`] that dials a host,
//! a [`Session`] that creates, opens and removes files inside a
//! [`Namespace`], and an [`EngineFile`] byte stream with read, write, seek
//! and close.
//!
//! # Backends
//!
//! - [`MemoryEngine`] -- chunked, in-process large-object engine for tests
//!   and embedding
//!
//! # Design Rules
//!
//! 1. A file created for writing becomes visible to readers only once closed.
//! 2. Names are not unique; ids are, and are never reused.
//! 3. Errors crossing `std::io` traits keep the [`EngineError`] inside.
//! 4. Removing something that does not exist is not an error.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::{EngineError, EngineResult};
pub use memory::{MemoryEngine, MemoryFile, MemorySession, DEFAULT_CHUNK_SIZE};
pub use traits::{Connector, EngineFile, FileMode, Namespace, RawId, Session};
