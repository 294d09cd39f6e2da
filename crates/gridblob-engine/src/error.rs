use std::io;

use gridblob_types::BlobId;

use crate::traits::FileMode;

/// Errors raised by a storage engine.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No blob matched the lookup key.
    #[error("blob not found: {0}")]
    NotFound(String),

    /// The engine could not be reached, or the connection was lost.
    #[error("connection failure: {0}")]
    Connection(String),

    /// The session was closed by its owner.
    #[error("session is closed")]
    Closed,

    /// The file handle was already closed.
    #[error("file handle is closed")]
    FileClosed,

    /// The operation does not apply to the mode the file was opened in.
    #[error("cannot {op} a file opened for {mode}")]
    WrongMode { op: &'static str, mode: FileMode },

    /// A seek resolved to a position before the start of the blob.
    #[error("invalid seek to negative position {0}")]
    InvalidSeek(i64),

    /// A chunk of a finished blob is missing (removed while being read).
    #[error("missing chunk {n} of blob {id}")]
    MissingChunk { id: BlobId, n: u32 },

    /// I/O error inside the engine.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

impl EngineError {
    /// The `io::ErrorKind` used when this error travels through `Read`,
    /// `Write` or `Seek`.
    pub fn io_kind(&self) -> io::ErrorKind {
        match self {
            Self::NotFound(_) | Self::MissingChunk { .. } => io::ErrorKind::NotFound,
            Self::Connection(_) => io::ErrorKind::ConnectionAborted,
            Self::Closed | Self::FileClosed => io::ErrorKind::NotConnected,
            Self::WrongMode { .. } => io::ErrorKind::Unsupported,
            Self::InvalidSeek(_) => io::ErrorKind::InvalidInput,
            Self::Io(e) => e.kind(),
        }
    }
}

/// Engine errors cross the `std::io` traits boxed inside an `io::Error`, so
/// callers can downcast to recover the original variant.
impl From<EngineError> for io::Error {
    fn from(err: EngineError) -> Self {
        io::Error::new(err.io_kind(), err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_error_survives_io_boundary() {
        let io_err: io::Error = EngineError::WrongMode { op: "write", mode: FileMode::Read }.into();
        assert_eq!(io_err.kind(), io::ErrorKind::Unsupported);
        let inner = io_err
            .get_ref()
            .and_then(|e| e.downcast_ref::<EngineError>())
            .unwrap();
        assert!(matches!(inner, EngineError::WrongMode { op: "write", .. }));
    }

    #[test]
    fn display_messages() {
        assert_eq!(EngineError::Closed.to_string(), "session is closed");
        assert_eq!(
            EngineError::WrongMode { op: "read", mode: FileMode::Write }.to_string(),
            "cannot read a file opened for write"
        );
    }
}
