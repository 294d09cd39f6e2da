use std::collections::HashMap;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use gridblob_types::{BlobId, Checksum};
use tracing::{debug, trace, warn};

use crate::error::{EngineError, EngineResult};
use crate::traits::{Connector, EngineFile, FileMode, Namespace, RawId, Session};

/// Default chunk size: 255 KiB, so a chunk plus its envelope stays under a
/// 256 KiB document.
pub const DEFAULT_CHUNK_SIZE: usize = 255 * 1024;

/// Metadata row for a finished file.
#[derive(Clone, Debug)]
struct FileRecord {
    id: BlobId,
    name: String,
    length: u64,
    chunk_size: usize,
    upload_date: DateTime<Utc>,
    checksum: Checksum,
    /// Insertion order within the bucket; breaks upload-date ties.
    seq: u64,
}

/// Files table plus chunks table for one namespace.
#[derive(Default)]
struct Bucket {
    files: HashMap<BlobId, FileRecord>,
    chunks: HashMap<(BlobId, u32), Arc<[u8]>>,
    next_seq: u64,
}

impl Bucket {
    fn newest_named(&self, name: &str) -> Option<&FileRecord> {
        self.files
            .values()
            .filter(|f| f.name == name)
            .max_by_key(|f| (f.upload_date, f.seq))
    }

    fn remove_file(&mut self, id: &BlobId) -> bool {
        let existed = self.files.remove(id).is_some();
        if existed {
            self.drop_chunks(id);
        }
        existed
    }

    fn drop_chunks(&mut self, id: &BlobId) {
        self.chunks.retain(|(files_id, _), _| files_id != id);
    }
}

#[derive(Default)]
struct EngineState {
    buckets: HashMap<Namespace, Bucket>,
    shut_down: bool,
}

/// In-process large-object engine.
///
/// Blobs are split into fixed-size chunks held in a chunks table, with one
/// metadata row per finished blob in a files table, per namespace. A blob
/// only gets its metadata row when its write handle is closed, so readers
/// never observe a partial upload. All state sits behind one `RwLock`;
/// clones share it.
#[derive(Clone)]
pub struct MemoryEngine {
    state: Arc<RwLock<EngineState>>,
    chunk_size: usize,
}

impl MemoryEngine {
    /// Create an empty engine with the default chunk size.
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(EngineState::default())),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Use `size` bytes per chunk for files created from now on.
    pub fn with_chunk_size(mut self, size: usize) -> Self {
        self.chunk_size = size.max(1);
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Simulate losing the server: open sessions start failing with
    /// `EngineError::Connection` and new dials are refused.
    pub fn shutdown(&self) {
        self.state.write().expect("lock poisoned").shut_down = true;
    }

    pub fn is_shut_down(&self) -> bool {
        self.state.read().expect("lock poisoned").shut_down
    }

    /// Number of finished files in a namespace.
    pub fn file_count(&self, ns: &Namespace) -> usize {
        let state = self.state.read().expect("lock poisoned");
        state.buckets.get(ns).map_or(0, |b| b.files.len())
    }

    /// Number of stored chunks in a namespace, including chunks of files
    /// still being written.
    pub fn chunk_count(&self, ns: &Namespace) -> usize {
        let state = self.state.read().expect("lock poisoned");
        state.buckets.get(ns).map_or(0, |b| b.chunks.len())
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.read().expect("lock poisoned");
        let files: usize = state.buckets.values().map(|b| b.files.len()).sum();
        f.debug_struct("MemoryEngine")
            .field("buckets", &state.buckets.len())
            .field("file_count", &files)
            .field("chunk_size", &self.chunk_size)
            .field("shut_down", &state.shut_down)
            .finish()
    }
}

impl Connector for MemoryEngine {
    fn dial(&self, host: &str) -> EngineResult<Arc<dyn Session>> {
        if host.trim().is_empty() {
            return Err(EngineError::Connection("empty host".into()));
        }
        if self.is_shut_down() {
            return Err(EngineError::Connection(format!("{host}: no reachable server")));
        }
        debug!(host, "session opened");
        Ok(Arc::new(MemorySession {
            link: Arc::new(Link {
                state: Arc::clone(&self.state),
                closed: AtomicBool::new(false),
                host: host.to_string(),
            }),
            chunk_size: self.chunk_size,
        }))
    }
}

/// Connection state shared by a session and every file opened through it.
struct Link {
    state: Arc<RwLock<EngineState>>,
    closed: AtomicBool,
    host: String,
}

impl Link {
    fn check(&self) -> EngineResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(EngineError::Closed);
        }
        if self.state.read().expect("lock poisoned").shut_down {
            return Err(EngineError::Connection(format!("lost connection to {}", self.host)));
        }
        Ok(())
    }
}

fn fetch_chunk(link: &Link, ns: &Namespace, id: &BlobId, n: u32) -> EngineResult<Arc<[u8]>> {
    let state = link.state.read().expect("lock poisoned");
    state
        .buckets
        .get(ns)
        .and_then(|b| b.chunks.get(&(*id, n)))
        .cloned()
        .ok_or(EngineError::MissingChunk { id: *id, n })
}

fn store_chunk(link: &Link, ns: &Namespace, id: BlobId, n: u32, data: Vec<u8>) {
    trace!(%id, n, len = data.len(), "chunk stored");
    let mut state = link.state.write().expect("lock poisoned");
    state
        .buckets
        .entry(ns.clone())
        .or_default()
        .chunks
        .insert((id, n), Arc::from(data));
}

/// Session handed out by [`MemoryEngine::dial`].
pub struct MemorySession {
    link: Arc<Link>,
    chunk_size: usize,
}

impl MemorySession {
    fn reader(&self, ns: &Namespace, record: &FileRecord) -> Box<dyn EngineFile> {
        Box::new(MemoryFile {
            link: Arc::clone(&self.link),
            ns: ns.clone(),
            id: record.id,
            name: record.name.clone(),
            chunk_size: record.chunk_size,
            upload_date: record.upload_date,
            closed: false,
            state: FileState::Reading {
                length: record.length,
                checksum: record.checksum,
                pos: 0,
                current: None,
            },
        })
    }
}

impl Session for MemorySession {
    fn host(&self) -> &str {
        &self.link.host
    }

    fn create(&self, ns: &Namespace, name: &str) -> EngineResult<Box<dyn EngineFile>> {
        self.link.check()?;
        let id = BlobId::new();
        debug!(%ns, %id, name, "file created");
        Ok(Box::new(MemoryFile {
            link: Arc::clone(&self.link),
            ns: ns.clone(),
            id,
            name: name.to_string(),
            chunk_size: self.chunk_size,
            upload_date: Utc::now(),
            closed: false,
            state: FileState::Writing {
                buf: Vec::with_capacity(self.chunk_size.min(64 * 1024)),
                next_chunk: 0,
                length: 0,
                hasher: blake3::Hasher::new(),
                checksum: None,
            },
        }))
    }

    fn open_by_name(&self, ns: &Namespace, name: &str) -> EngineResult<Box<dyn EngineFile>> {
        self.link.check()?;
        let state = self.link.state.read().expect("lock poisoned");
        let record = state
            .buckets
            .get(ns)
            .and_then(|b| b.newest_named(name))
            .ok_or_else(|| EngineError::NotFound(format!("name {name:?} in {ns}")))?;
        Ok(self.reader(ns, record))
    }

    fn open_by_id(&self, ns: &Namespace, id: &RawId) -> EngineResult<Box<dyn EngineFile>> {
        self.link.check()?;
        let state = self.link.state.read().expect("lock poisoned");
        let record = match id {
            RawId::ObjectId(oid) => state.buckets.get(ns).and_then(|b| b.files.get(oid)),
            RawId::String(_) | RawId::Int(_) => None,
        }
        .ok_or_else(|| EngineError::NotFound(format!("id {id} in {ns}")))?;
        Ok(self.reader(ns, record))
    }

    fn remove_by_name(&self, ns: &Namespace, name: &str) -> EngineResult<usize> {
        self.link.check()?;
        let mut state = self.link.state.write().expect("lock poisoned");
        let Some(bucket) = state.buckets.get_mut(ns) else {
            return Ok(0);
        };
        let ids: Vec<BlobId> = bucket
            .files
            .values()
            .filter(|f| f.name == name)
            .map(|f| f.id)
            .collect();
        for id in &ids {
            bucket.remove_file(id);
        }
        debug!(%ns, name, removed = ids.len(), "files removed by name");
        Ok(ids.len())
    }

    fn remove_by_id(&self, ns: &Namespace, id: &RawId) -> EngineResult<bool> {
        self.link.check()?;
        let RawId::ObjectId(oid) = id else {
            return Ok(false);
        };
        let mut state = self.link.state.write().expect("lock poisoned");
        let existed = state
            .buckets
            .get_mut(ns)
            .is_some_and(|b| b.remove_file(oid));
        debug!(%ns, id = %oid, existed, "file removed by id");
        Ok(existed)
    }

    fn close(&self) {
        if !self.link.closed.swap(true, Ordering::AcqRel) {
            debug!(host = %self.link.host, "session closed");
        }
    }

    fn is_closed(&self) -> bool {
        self.link.closed.load(Ordering::Acquire)
    }
}

enum FileState {
    Writing {
        /// Bytes not yet forming a full chunk.
        buf: Vec<u8>,
        next_chunk: u32,
        length: u64,
        hasher: blake3::Hasher,
        checksum: Option<Checksum>,
    },
    Reading {
        length: u64,
        checksum: Checksum,
        pos: u64,
        /// Most recently fetched chunk.
        current: Option<(u32, Arc<[u8]>)>,
    },
}

/// File handle handed out by [`MemorySession`].
pub struct MemoryFile {
    link: Arc<Link>,
    ns: Namespace,
    id: BlobId,
    name: String,
    chunk_size: usize,
    upload_date: DateTime<Utc>,
    closed: bool,
    state: FileState,
}

impl MemoryFile {
    fn ensure_open(&self) -> EngineResult<()> {
        self.link.check()?;
        if self.closed {
            return Err(EngineError::FileClosed);
        }
        Ok(())
    }
}

impl Read for MemoryFile {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let FileState::Reading {
            length,
            pos,
            current,
            ..
        } = &mut self.state
        else {
            return Err(EngineError::WrongMode { op: "read", mode: FileMode::Write }.into());
        };
        if out.is_empty() || *pos >= *length {
            return Ok(0);
        }

        let chunk_size = self.chunk_size as u64;
        let n = (*pos / chunk_size) as u32;
        let chunk = match current.as_ref() {
            Some((cached, data)) if *cached == n => Arc::clone(data),
            _ => {
                let data = fetch_chunk(&self.link, &self.ns, &self.id, n)?;
                *current = Some((n, Arc::clone(&data)));
                data
            }
        };

        let within = ((*pos % chunk_size) as usize).min(chunk.len());
        let available = &chunk[within..];
        let count = available.len().min(out.len());
        out[..count].copy_from_slice(&available[..count]);
        *pos += count as u64;
        Ok(count)
    }
}

impl Write for MemoryFile {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.ensure_open()?;
        let FileState::Writing {
            buf,
            next_chunk,
            length,
            hasher,
            ..
        } = &mut self.state
        else {
            return Err(EngineError::WrongMode { op: "write", mode: FileMode::Read }.into());
        };

        let mut rest = data;
        while !rest.is_empty() {
            let take = (self.chunk_size - buf.len()).min(rest.len());
            buf.extend_from_slice(&rest[..take]);
            rest = &rest[take..];
            if buf.len() == self.chunk_size {
                store_chunk(&self.link, &self.ns, self.id, *next_chunk, std::mem::take(buf));
                *next_chunk += 1;
            }
        }
        hasher.update(data);
        *length += data.len() as u64;
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.ensure_open()?;
        Ok(())
    }
}

impl Seek for MemoryFile {
    fn seek(&mut self, from: SeekFrom) -> io::Result<u64> {
        self.ensure_open()?;
        let FileState::Reading { length, pos, .. } = &mut self.state else {
            return Err(EngineError::WrongMode { op: "seek", mode: FileMode::Write }.into());
        };
        let target = match from {
            SeekFrom::Start(offset) => i128::from(offset),
            SeekFrom::Current(delta) => i128::from(*pos) + i128::from(delta),
            SeekFrom::End(delta) => i128::from(*length) + i128::from(delta),
        };
        if target < 0 {
            return Err(EngineError::InvalidSeek(target as i64).into());
        }
        *pos = u64::try_from(target).unwrap_or(u64::MAX);
        Ok(*pos)
    }
}

impl EngineFile for MemoryFile {
    fn id(&self) -> RawId {
        RawId::ObjectId(self.id)
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn mode(&self) -> FileMode {
        match self.state {
            FileState::Writing { .. } => FileMode::Write,
            FileState::Reading { .. } => FileMode::Read,
        }
    }

    fn size(&self) -> u64 {
        match self.state {
            FileState::Writing { length, .. } | FileState::Reading { length, .. } => length,
        }
    }

    fn checksum(&self) -> Option<Checksum> {
        match self.state {
            FileState::Writing { checksum, .. } => checksum,
            FileState::Reading { checksum, .. } => Some(checksum),
        }
    }

    fn upload_date(&self) -> DateTime<Utc> {
        self.upload_date
    }

    fn close(&mut self) -> EngineResult<()> {
        self.ensure_open()?;
        if let FileState::Writing {
            buf,
            next_chunk,
            length,
            hasher,
            checksum,
        } = &mut self.state
        {
            if !buf.is_empty() {
                store_chunk(&self.link, &self.ns, self.id, *next_chunk, std::mem::take(buf));
                *next_chunk += 1;
            }
            let sum = Checksum::from_hasher(hasher);
            self.upload_date = Utc::now();

            let mut state = self.link.state.write().expect("lock poisoned");
            let bucket = state.buckets.entry(self.ns.clone()).or_default();
            let seq = bucket.next_seq;
            bucket.next_seq += 1;
            bucket.files.insert(
                self.id,
                FileRecord {
                    id: self.id,
                    name: self.name.clone(),
                    length: *length,
                    chunk_size: self.chunk_size,
                    upload_date: self.upload_date,
                    checksum: sum,
                    seq,
                },
            );
            *checksum = Some(sum);
            debug!(ns = %self.ns, id = %self.id, length = *length, chunks = *next_chunk, "file finalized");
        }
        self.closed = true;
        Ok(())
    }
}

impl Drop for MemoryFile {
    fn drop(&mut self) {
        if self.closed || !matches!(self.state, FileState::Writing { .. }) {
            return;
        }
        warn!(id = %self.id, name = %self.name, "write handle dropped without close; discarding chunks");
        if let Ok(mut state) = self.link.state.write() {
            if let Some(bucket) = state.buckets.get_mut(&self.ns) {
                bucket.drop_chunks(&self.id);
            }
        }
    }
}

impl std::fmt::Debug for MemoryFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryFile")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("mode", &self.mode())
            .field("size", &self.size())
            .field("closed", &self.closed)
            .finish()
    }
}
