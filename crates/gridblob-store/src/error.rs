use std::io;

use gridblob_engine::EngineError;
use gridblob_types::TypeError;

/// Coarse classification of a [`BlobError`], stable across variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A supplied identifier or setting is malformed. Raised locally.
    InvalidArgument,
    /// No blob matched the name or id.
    NotFound,
    /// The engine connection could not be made, was lost, or was closed.
    ConnectionFailure,
    /// A local source or sink failed.
    IoFailure,
    /// Anything else the engine reported.
    EngineFailure,
    /// Configuration could not be parsed.
    Config,
}

/// Errors from blob store and handle operations.
#[derive(Debug, thiserror::Error)]
pub enum BlobError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("blob not found: {0}")]
    NotFound(String),

    #[error("connection failure: {0}")]
    ConnectionFailure(#[source] EngineError),

    #[error("I/O error: {0}")]
    IoFailure(#[source] io::Error),

    #[error("engine error: {0}")]
    EngineFailure(#[source] EngineError),

    /// The engine handed back an identifier that is not an object id.
    #[error("engine returned an unexpected identifier kind: {0}")]
    UnexpectedIdKind(String),

    #[error("configuration error: {0}")]
    Config(String),
}

/// Result alias for blob operations.
pub type BlobResult<T> = Result<T, BlobError>;

impl BlobError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::ConnectionFailure(_) => ErrorKind::ConnectionFailure,
            Self::IoFailure(_) => ErrorKind::IoFailure,
            Self::EngineFailure(_) | Self::UnexpectedIdKind(_) => ErrorKind::EngineFailure,
            Self::Config(_) => ErrorKind::Config,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    pub(crate) fn invalid<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<TypeError> for BlobError {
    fn from(err: TypeError) -> Self {
        Self::InvalidArgument(err.to_string())
    }
}

impl From<EngineError> for BlobError {
    fn from(err: EngineError) -> Self {
        match err {
            EngineError::NotFound(what) => Self::NotFound(what),
            EngineError::Connection(_) | EngineError::Closed => Self::ConnectionFailure(err),
            other => Self::EngineFailure(other),
        }
    }
}

/// An `io::Error` carrying an [`EngineError`] came from a blob handle and is
/// classified by the engine error; any other is a local I/O failure.
impl From<io::Error> for BlobError {
    fn from(err: io::Error) -> Self {
        let from_engine = err
            .get_ref()
            .is_some_and(|inner| inner.is::<EngineError>());
        if from_engine {
            if let Some(inner) = err.into_inner() {
                if let Ok(engine) = inner.downcast::<EngineError>() {
                    return Self::from(*engine);
                }
            }
            return Self::IoFailure(io::Error::other("engine error lost in transit"));
        }
        Self::IoFailure(err)
    }
}
