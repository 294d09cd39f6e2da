use thiserror::Error;

/// Errors produced when decoding identifiers and digests.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("invalid hex string: {0}")]
    InvalidHex(String),

    #[error("invalid hex length: expected {expected} characters, got {actual}")]
    InvalidLength { expected: usize, actual: usize },
}
