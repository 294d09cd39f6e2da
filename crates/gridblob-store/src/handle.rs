use std::fmt;
use std::io::{self, Read, Seek, SeekFrom, Write};

use chrono::{DateTime, Utc};
use gridblob_engine::{EngineFile, FileMode, RawId};
use gridblob_types::{BlobId, Checksum};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{BlobError, BlobResult};

/// Metadata snapshot of a blob.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobInfo {
    pub id: BlobId,
    pub name: String,
    pub size: u64,
    /// `None` only for a write handle that has not been closed yet.
    pub checksum: Option<Checksum>,
    pub upload_date: DateTime<Utc>,
}

/// Narrow an engine identifier to a [`BlobId`].
///
/// Engines may store any scalar as a file id; this crate only hands object
/// ids to callers, so anything else is reported rather than coerced.
pub fn decode_id(raw: RawId) -> BlobResult<BlobId> {
    match raw {
        RawId::ObjectId(id) => Ok(id),
        other => Err(BlobError::UnexpectedIdKind(other.to_string())),
    }
}

/// An open blob.
///
/// Handles returned by [`BlobStore::create`](crate::BlobStore::create) are
/// write-only; handles returned by the `open_*` methods are read/seek-only.
/// `Read`, `Write` and `Seek` are forwarded straight to the engine, so a
/// handle plugs into `std::io::copy` and friends.
///
/// A handle is finished with [`close`](Self::close), which consumes it. A
/// write handle dropped without closing is abandoned and its blob never
/// becomes visible.
pub struct BlobHandle {
    file: Box<dyn EngineFile>,
    id: BlobId,
}

impl BlobHandle {
    pub(crate) fn new(file: Box<dyn EngineFile>) -> BlobResult<Self> {
        let id = decode_id(file.id())?;
        Ok(Self { file, id })
    }

    pub fn id(&self) -> &BlobId {
        &self.id
    }

    /// The identifier as 24 lowercase hex characters.
    pub fn id_hex(&self) -> String {
        self.id.to_hex()
    }

    pub fn name(&self) -> &str {
        self.file.name()
    }

    /// Bytes written so far on a write handle; blob length on a read handle.
    pub fn size(&self) -> u64 {
        self.file.size()
    }

    pub fn checksum(&self) -> Option<Checksum> {
        self.file.checksum()
    }

    pub fn upload_date(&self) -> DateTime<Utc> {
        self.file.upload_date()
    }

    pub fn mode(&self) -> FileMode {
        self.file.mode()
    }

    pub fn info(&self) -> BlobInfo {
        BlobInfo {
            id: self.id,
            name: self.name().to_string(),
            size: self.size(),
            checksum: self.checksum(),
            upload_date: self.upload_date(),
        }
    }

    /// Finalize the blob and return its settled metadata.
    ///
    /// On a write handle this is when the blob becomes durable and its size
    /// and checksum are fixed. On a read handle it releases engine resources.
    pub fn close(mut self) -> BlobResult<BlobInfo> {
        self.file.close()?;
        let info = self.info();
        debug!(id = %info.id, name = %info.name, size = info.size, "blob handle closed");
        Ok(info)
    }
}

impl Read for BlobHandle {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }
}

impl Write for BlobHandle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.file.flush()
    }
}

impl Seek for BlobHandle {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }
}

impl fmt::Debug for BlobHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlobHandle")
            .field("id", &self.id)
            .field("name", &self.name())
            .field("mode", &self.mode())
            .field("size", &self.size())
            .finish()
    }
}
