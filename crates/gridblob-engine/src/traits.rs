use std::fmt;
use std::io::{Read, Seek, Write};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use gridblob_types::{BlobId, Checksum};
use serde::{Deserialize, Serialize};

use crate::error::EngineResult;

/// A (database, bucket) pair naming where a set of blobs and their chunks
/// live.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Namespace {
    pub database: String,
    pub bucket: String,
}

impl Namespace {
    pub fn new(database: impl Into<String>, bucket: impl Into<String>) -> Self {
        Self {
            database: database.into(),
            bucket: bucket.into(),
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.database, self.bucket)
    }
}

/// Identifier value as stored by the engine.
///
/// Engines may key files by any scalar. Callers of this crate only ever mint
/// [`RawId::ObjectId`], but must be prepared to see the other variants on
/// files the engine hands back.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum RawId {
    ObjectId(BlobId),
    String(String),
    Int(i64),
}

impl fmt::Display for RawId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObjectId(id) => write!(f, "ObjectId({id})"),
            Self::String(s) => write!(f, "{s:?}"),
            Self::Int(n) => write!(f, "{n}"),
        }
    }
}

impl From<BlobId> for RawId {
    fn from(id: BlobId) -> Self {
        Self::ObjectId(id)
    }
}

/// Access mode a file was opened in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    /// Opened by `create`: write-only until closed.
    Write,
    /// Opened by `open_by_name` / `open_by_id`: read and seek only.
    Read,
}

impl fmt::Display for FileMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Write => write!(f, "write"),
            Self::Read => write!(f, "read"),
        }
    }
}

/// Opens sessions to an engine addressed by host string.
pub trait Connector {
    /// Establish a session. Fails with `EngineError::Connection` when the
    /// host cannot be reached.
    fn dial(&self, host: &str) -> EngineResult<Arc<dyn Session>>;
}

/// A live connection to the engine.
///
/// Sessions are shared by every file opened through them. Once `close` has
/// been called, every operation on the session and on its files fails.
pub trait Session: Send + Sync {
    /// Host string this session was dialed with.
    fn host(&self) -> &str;

    /// Allocate a new file in write mode. The id is assigned immediately.
    fn create(&self, ns: &Namespace, name: &str) -> EngineResult<Box<dyn EngineFile>>;

    /// Open the file with the given name for reading.
    ///
    /// Names are not unique; when several files share one, the engine picks
    /// the most recently uploaded.
    fn open_by_name(&self, ns: &Namespace, name: &str) -> EngineResult<Box<dyn EngineFile>>;

    /// Open the file with the given id for reading.
    fn open_by_id(&self, ns: &Namespace, id: &RawId) -> EngineResult<Box<dyn EngineFile>>;

    /// Remove every file with the given name. Returns how many were removed.
    fn remove_by_name(&self, ns: &Namespace, name: &str) -> EngineResult<usize>;

    /// Remove the file with the given id. Returns `true` if it existed.
    fn remove_by_id(&self, ns: &Namespace, id: &RawId) -> EngineResult<bool>;

    /// Release the connection. Idempotent.
    fn close(&self);

    fn is_closed(&self) -> bool;
}

/// One open file: a byte stream plus the metadata the engine keeps for it.
///
/// Errors surfaced through `Read`, `Write` and `Seek` carry an
/// [`EngineError`](crate::EngineError) inside the `io::Error`.
pub trait EngineFile: Read + Write + Seek + Send {
    fn id(&self) -> RawId;

    fn name(&self) -> &str;

    fn mode(&self) -> FileMode;

    /// Bytes written so far (write mode) or total length (read mode).
    fn size(&self) -> u64;

    /// Content digest; `None` until a write-mode file is closed.
    fn checksum(&self) -> Option<Checksum>;

    /// Creation time while writing, upload time once finalized.
    fn upload_date(&self) -> DateTime<Utc>;

    /// Finalize the file. For write mode this flushes buffered bytes and
    /// makes the blob visible to readers.
    fn close(&mut self) -> EngineResult<()>;
}
