use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;
use std::time::{SystemTime, UNIX_EPOCH};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Engine-assigned identifier for a stored blob.
///
/// Layout of the 12 bytes:
///
/// ```text
/// [4 bytes: seconds since UNIX epoch, big-endian]
/// [5 bytes: random, fixed for the lifetime of the process]
/// [3 bytes: counter, big-endian, random start, wraps at 2^24]
/// ```
///
/// Ids minted by one process never repeat (until the counter wraps within
/// a single second) and sort roughly by creation time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlobId([u8; 12]);

/// Number of hex characters in the textual form of a [`BlobId`].
pub const BLOB_ID_HEX_LEN: usize = 24;

const COUNTER_MASK: u32 = 0x00ff_ffff;

fn process_nonce() -> &'static [u8; 5] {
    static NONCE: OnceLock<[u8; 5]> = OnceLock::new();
    NONCE.get_or_init(|| rand::random())
}

fn next_counter() -> u32 {
    static COUNTER: OnceLock<AtomicU32> = OnceLock::new();
    COUNTER
        .get_or_init(|| AtomicU32::new(rand::random::<u32>() & COUNTER_MASK))
        .fetch_add(1, Ordering::Relaxed)
        & COUNTER_MASK
}

impl BlobId {
    /// Mint a fresh identifier stamped with the current time.
    pub fn new() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs() as u32;
        Self::from_parts(secs, *process_nonce(), next_counter())
    }

    /// Assemble an identifier from its three components.
    ///
    /// Only the low 24 bits of `counter` are kept.
    pub fn from_parts(secs: u32, nonce: [u8; 5], counter: u32) -> Self {
        let mut bytes = [0u8; 12];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(&nonce);
        bytes[9..].copy_from_slice(&(counter & COUNTER_MASK).to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Wrap raw bytes received from the engine.
    pub const fn from_bytes(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }

    /// The raw 12 bytes.
    pub fn as_bytes(&self) -> &[u8; 12] {
        &self.0
    }

    /// Lowercase 24-character hex form.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// Short hex representation (first 8 characters).
    pub fn short_hex(&self) -> String {
        hex::encode(&self.0[..4])
    }

    /// Parse the 24-character hex form. Upper- and lowercase are accepted.
    pub fn from_hex(s: &str) -> Result<Self, TypeError> {
        if s.len() != BLOB_ID_HEX_LEN {
            return Err(TypeError::InvalidLength {
                expected: BLOB_ID_HEX_LEN,
                actual: s.len(),
            });
        }
        let mut bytes = [0u8; 12];
        hex::decode_to_slice(s, &mut bytes).map_err(|e| TypeError::InvalidHex(e.to_string()))?;
        Ok(Self(bytes))
    }

    /// Returns `true` if `s` has the shape of a blob identifier.
    pub fn is_valid_hex(s: &str) -> bool {
        s.len() == BLOB_ID_HEX_LEN && s.bytes().all(|b| b.is_ascii_hexdigit())
    }

    /// Seconds component of the identifier.
    pub fn secs(&self) -> u32 {
        u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]])
    }

    /// Creation time embedded in the identifier, at one-second resolution.
    pub fn timestamp(&self) -> DateTime<Utc> {
        DateTime::from_timestamp(i64::from(self.secs()), 0).unwrap_or_default()
    }
}

impl Default for BlobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BlobId({})", self.to_hex())
    }
}

impl fmt::Display for BlobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl FromStr for BlobId {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

impl From<[u8; 12]> for BlobId {
    fn from(bytes: [u8; 12]) -> Self {
        Self(bytes)
    }
}

impl From<BlobId> for [u8; 12] {
    fn from(id: BlobId) -> Self {
        id.0
    }
}

impl Serialize for BlobId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for BlobId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn new_ids_are_distinct() {
        let a = BlobId::new();
        let b = BlobId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn new_ids_share_process_nonce() {
        let a = BlobId::new();
        let b = BlobId::new();
        assert_eq!(a.as_bytes()[4..9], b.as_bytes()[4..9]);
    }

    #[test]
    fn hex_is_24_lowercase_chars() {
        let hex = BlobId::new().to_hex();
        assert_eq!(hex.len(), BLOB_ID_HEX_LEN);
        assert!(hex.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b)));
    }

    #[test]
    fn hex_roundtrip() {
        let id = BlobId::new();
        assert_eq!(BlobId::from_hex(&id.to_hex()).unwrap(), id);
    }

    #[test]
    fn uppercase_hex_is_accepted() {
        let id = BlobId::from_hex("4D88E15B60F486E428412DC9").unwrap();
        assert_eq!(id.to_hex(), "4d88e15b60f486e428412dc9");
    }

    #[test]
    fn short_string_is_invalid_length() {
        assert_eq!(
            BlobId::from_hex("00"),
            Err(TypeError::InvalidLength { expected: 24, actual: 2 })
        );
    }

    #[test]
    fn non_hex_char_is_invalid_hex() {
        let err = BlobId::from_hex("4d88e15b60f486e428412dcz").unwrap_err();
        assert!(matches!(err, TypeError::InvalidHex(_)));
    }

    #[test]
    fn from_parts_layout() {
        let id = BlobId::from_parts(0x4d88_e15b, [1, 2, 3, 4, 5], 0x0a0b_0c0d);
        assert_eq!(id.to_hex(), "4d88e15b01020304050b0c0d");
        assert_eq!(id.secs(), 0x4d88_e15b);
    }

    #[test]
    fn timestamp_reflects_secs() {
        let id = BlobId::from_parts(1_300_000_000, [0; 5], 0);
        assert_eq!(id.timestamp().timestamp(), 1_300_000_000);
    }

    #[test]
    fn fresh_id_timestamp_is_recent() {
        // After 2020-01-01.
        assert!(BlobId::new().timestamp().timestamp() > 1_577_836_800);
    }

    #[test]
    fn serde_uses_hex_string() {
        let id = BlobId::from_hex("4d88e15b60f486e428412dc9").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"4d88e15b60f486e428412dc9\"");
        let parsed: BlobId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn serde_rejects_malformed() {
        assert!(serde_json::from_str::<BlobId>("\"nope\"").is_err());
    }

    proptest! {
        #[test]
        fn wrong_length_never_parses(s in "[0-9a-f]{0,23}|[0-9a-f]{25,40}") {
            prop_assert!(!BlobId::is_valid_hex(&s));
            let is_length_error = matches!(
                BlobId::from_hex(&s),
                Err(TypeError::InvalidLength { .. })
            );
            prop_assert!(is_length_error);
        }

        #[test]
        fn any_24_hex_parses(s in "[0-9a-fA-F]{24}") {
            prop_assert!(BlobId::is_valid_hex(&s));
            let id = BlobId::from_hex(&s).unwrap();
            prop_assert_eq!(id.to_hex(), s.to_ascii_lowercase());
        }
    }
}
