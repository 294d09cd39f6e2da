//! Foundation types for gridblob.
//!
//! Every blob in a bucket is addressed by a [`BlobId`], a 12-byte value
//! assigned by the storage engine when the blob is created and rendered to
//! callers as 24 lowercase hex characters. The engine also fingerprints the
//! full byte stream of a finished blob; that digest is a [`Checksum`].
//!
//! # Key Types
//!
//! - [`BlobId`] -- engine-assigned identifier (timestamp + process nonce + counter)
//! - [`Checksum`] -- BLAKE3 digest of a blob's content
//! - [`TypeError`] -- decoding failures for both

pub mod checksum;
pub mod error;
pub mod id;

pub use checksum::Checksum;
pub use error::TypeError;
pub use id::BlobId;
