use std::fs::File;
use std::path::Path;
use std::sync::Arc;

use gridblob_engine::{Connector, Namespace, RawId, Session};
use gridblob_types::BlobId;
use tracing::{debug, info};

use crate::config::StoreConfig;
use crate::copy::{copy_in, write_file};
use crate::error::{BlobError, BlobResult};
use crate::handle::BlobHandle;

/// A session bound to one (database, bucket) namespace.
///
/// The store owns its session: closing or dropping the store closes the
/// session, after which every handle opened through it fails as well.
/// There is no buffering, caching or retrying at this layer; each call is
/// one or more engine round trips and every engine error is returned as is,
/// normalized to a [`BlobError`].
pub struct BlobStore {
    session: Arc<dyn Session>,
    ns: Namespace,
}

impl BlobStore {
    /// Bind an existing session to a namespace.
    pub fn new(
        session: Arc<dyn Session>,
        database: impl Into<String>,
        bucket: impl Into<String>,
    ) -> BlobResult<Self> {
        let ns = Namespace::new(database, bucket);
        if ns.database.trim().is_empty() {
            return Err(BlobError::invalid("database must not be empty"));
        }
        if ns.bucket.trim().is_empty() {
            return Err(BlobError::invalid("bucket must not be empty"));
        }
        info!(host = session.host(), %ns, "blob store opened");
        Ok(Self { session, ns })
    }

    /// Dial `config.host` and bind the configured namespace.
    pub fn connect<C: Connector + ?Sized>(connector: &C, config: &StoreConfig) -> BlobResult<Self> {
        config.validate()?;
        let session = connector.dial(&config.host)?;
        Self::new(session, config.database.clone(), config.bucket.clone())
    }

    pub fn database(&self) -> &str {
        &self.ns.database
    }

    pub fn bucket(&self) -> &str {
        &self.ns.bucket
    }

    pub fn namespace(&self) -> &Namespace {
        &self.ns
    }

    /// Start a new blob called `name` and return a write handle.
    ///
    /// The id is assigned right away; the blob becomes visible to readers
    /// when the handle is closed.
    pub fn create(&self, name: &str) -> BlobResult<BlobHandle> {
        let handle = BlobHandle::new(self.session.create(&self.ns, name)?)?;
        debug!(ns = %self.ns, id = %handle.id(), name, "blob created");
        Ok(handle)
    }

    /// Open the blob called `name` for reading.
    ///
    /// When several blobs share the name, the most recently uploaded wins.
    pub fn open_by_name(&self, name: &str) -> BlobResult<BlobHandle> {
        debug!(ns = %self.ns, name, "open by name");
        BlobHandle::new(self.session.open_by_name(&self.ns, name)?)
    }

    /// Open the blob with hex identifier `id` for reading.
    ///
    /// A malformed id fails with `InvalidArgument` before the engine is
    /// contacted; a well-formed id with no blob fails with `NotFound`.
    pub fn open_by_id(&self, id: &str) -> BlobResult<BlobHandle> {
        let id = BlobId::from_hex(id)?;
        self.open(&id)
    }

    /// Open the blob with identifier `id` for reading.
    pub fn open(&self, id: &BlobId) -> BlobResult<BlobHandle> {
        debug!(ns = %self.ns, %id, "open by id");
        BlobHandle::new(self.session.open_by_id(&self.ns, &RawId::ObjectId(*id))?)
    }

    /// Remove every blob called `name`. Removing a name with no blobs is not
    /// an error.
    pub fn remove_by_name(&self, name: &str) -> BlobResult<()> {
        let removed = self.session.remove_by_name(&self.ns, name)?;
        debug!(ns = %self.ns, name, removed, "remove by name");
        Ok(())
    }

    /// Remove the blob with hex identifier `id`.
    ///
    /// Succeeds whether or not the blob existed, unlike `open_by_id` which
    /// reports `NotFound`. A malformed id is still `InvalidArgument`.
    pub fn remove_by_id(&self, id: &str) -> BlobResult<()> {
        let id = BlobId::from_hex(id)?;
        let existed = self.session.remove_by_id(&self.ns, &RawId::ObjectId(id))?;
        debug!(ns = %self.ns, %id, existed, "remove by id");
        Ok(())
    }

    /// Upload the local file at `path` as a new blob named after the path,
    /// returning the new blob's id.
    pub fn copy_file_in(&self, path: impl AsRef<Path>) -> BlobResult<BlobId> {
        let path = path.as_ref();
        let source = File::open(path)?;
        let mut handle = self.create(&path.to_string_lossy())?;
        let copied = copy_in(source, &mut handle)?;
        let info = handle.close()?;
        debug!(ns = %self.ns, id = %info.id, path = %path.display(), copied, "file copied in");
        Ok(info.id)
    }

    /// Download the blob with hex identifier `id` into a new local file at
    /// `path`, returning the number of bytes written.
    ///
    /// The id is validated and resolved before the destination is created.
    pub fn copy_file_out(&self, id: &str, path: impl AsRef<Path>) -> BlobResult<u64> {
        let path = path.as_ref();
        let mut handle = self.open_by_id(id)?;
        let written = write_file(path, &mut handle)?;
        handle.close()?;
        debug!(ns = %self.ns, id, path = %path.display(), written, "file copied out");
        Ok(written)
    }

    /// Release the session.
    pub fn close(self) {
        self.session.close();
        info!(ns = %self.ns, "blob store closed");
    }
}

impl Drop for BlobStore {
    fn drop(&mut self) {
        self.session.close();
    }
}

impl std::fmt::Debug for BlobStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BlobStore")
            .field("host", &self.session.host())
            .field("namespace", &self.ns)
            .field("closed", &self.session.is_closed())
            .finish()
    }
}
