//! Local byte-stream helpers used by the whole-file operations.
//!
//! None of these clean up after a failure: a partially written destination
//! file is left where it is.

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::Path;

use crate::error::BlobResult;
use crate::handle::BlobHandle;

/// Stream everything from `source` into a write handle.
pub fn copy_in<R: Read>(mut source: R, handle: &mut BlobHandle) -> BlobResult<u64> {
    Ok(io::copy(&mut source, handle)?)
}

/// Stream the rest of a read handle into `sink`.
pub fn copy_out<W: Write>(handle: &mut BlobHandle, mut sink: W) -> BlobResult<u64> {
    let written = io::copy(handle, &mut sink)?;
    sink.flush()?;
    Ok(written)
}

/// Create (or truncate) the file at `path` and fill it from a read handle.
pub fn write_file(path: impl AsRef<Path>, handle: &mut BlobHandle) -> BlobResult<u64> {
    let output = File::create(path.as_ref())?;
    let written = copy_out(handle, &output)?;
    output.sync_all()?;
    Ok(written)
}
