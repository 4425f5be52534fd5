//! Storage identifiers.
//!
//! Every persisted entity is keyed by a 12-byte [`ObjectId`]:
//! - 4 bytes: big-endian seconds since the Unix epoch
//! - 5 bytes: random value fixed for the lifetime of the process
//! - 3 bytes: big-endian counter seeded with a random value
//!
//! Ids from one process sort by creation order, except that the counter wraps
//! from `0xffffff` to `0`: an id made after the wrap, within the same second,
//! sorts before the ones made just ahead of it. The random seed puts the
//! wrap anywhere in the counter range.
//!
//! Internally the id is binary; everything that leaves the system sees the
//! 24-character lowercase hex form.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use schemars::gen::SchemaGenerator;
use schemars::schema::{Schema, StringValidation};
use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::{ModelError, ModelResult};

/// Length of an id in bytes.
pub const OBJECT_ID_LEN: usize = 12;

/// Length of the hex form.
pub const OBJECT_ID_HEX_LEN: usize = OBJECT_ID_LEN * 2;

const COUNTER_MASK: u32 = 0x00FF_FFFF;

static PROCESS_UNIQUE: OnceLock<[u8; 5]> = OnceLock::new();
static COUNTER_SEED: OnceLock<u32> = OnceLock::new();
static COUNTER: AtomicU32 = AtomicU32::new(0);

/// Binary identifier assigned by the storage layer.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId([u8; OBJECT_ID_LEN]);

impl ObjectId {
    /// Generate a new id for the current second.
    pub fn new() -> Self {
        let secs = Utc::now().timestamp().clamp(0, u32::MAX as i64) as u32;
        Self::with_timestamp(secs)
    }

    fn with_timestamp(secs: u32) -> Self {
        let process = PROCESS_UNIQUE.get_or_init(|| {
            let seed = Uuid::new_v4();
            let mut bytes = [0u8; 5];
            bytes.copy_from_slice(&seed.as_bytes()[..5]);
            bytes
        });
        let seed = *COUNTER_SEED.get_or_init(|| {
            let bytes = Uuid::new_v4().into_bytes();
            u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]])
        });
        let count = seed.wrapping_add(COUNTER.fetch_add(1, Ordering::Relaxed));
        Self::compose(secs, process, count)
    }

    /// Only the low 24 bits of `count` are kept.
    fn compose(secs: u32, process: &[u8; 5], count: u32) -> Self {
        let count = count & COUNTER_MASK;
        let mut bytes = [0u8; OBJECT_ID_LEN];
        bytes[..4].copy_from_slice(&secs.to_be_bytes());
        bytes[4..9].copy_from_slice(process);
        bytes[9..].copy_from_slice(&count.to_be_bytes()[1..]);
        Self(bytes)
    }

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; OBJECT_ID_LEN]) -> Self {
        Self(bytes)
    }

    /// Build from a byte slice of exactly 12 bytes.
    pub fn from_slice(bytes: &[u8]) -> ModelResult<Self> {
        let array: [u8; OBJECT_ID_LEN] = bytes.try_into().map_err(|_| {
            ModelError::invalid_object_id(format!(
                "expected {} bytes, got {}",
                OBJECT_ID_LEN,
                bytes.len()
            ))
        })?;
        Ok(Self(array))
    }

    /// Get the raw bytes.
    pub const fn bytes(&self) -> [u8; OBJECT_ID_LEN] {
        self.0
    }

    /// Parse the 24-character hex form (case-insensitive).
    pub fn parse_str(s: &str) -> ModelResult<Self> {
        if s.len() != OBJECT_ID_HEX_LEN {
            return Err(ModelError::invalid_object_id(format!(
                "expected {} hex characters, got {:?}",
                OBJECT_ID_HEX_LEN, s
            )));
        }

        let mut bytes = [0u8; OBJECT_ID_LEN];
        for (i, pair) in s.as_bytes().chunks(2).enumerate() {
            let hi = hex_digit(pair[0]);
            let lo = hex_digit(pair[1]);
            match (hi, lo) {
                (Some(hi), Some(lo)) => bytes[i] = (hi << 4) | lo,
                _ => {
                    return Err(ModelError::invalid_object_id(format!(
                        "non-hex character in {:?}",
                        s
                    )))
                }
            }
        }
        Ok(Self(bytes))
    }

    /// Lowercase hex form.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Creation time embedded in the id (second precision).
    pub fn timestamp(&self) -> DateTime<Utc> {
        let secs = u32::from_be_bytes([self.0[0], self.0[1], self.0[2], self.0[3]]);
        DateTime::from_timestamp(secs as i64, 0).unwrap_or_default()
    }
}

fn hex_digit(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ObjectId({})", self.to_hex())
    }
}

impl FromStr for ObjectId {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_str(s)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for ObjectId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_str(&s).map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for ObjectId {
    fn schema_name() -> String {
        "ObjectId".to_string()
    }

    fn json_schema(gen: &mut SchemaGenerator) -> Schema {
        let mut schema = String::json_schema(gen).into_object();
        schema.string = Some(Box::new(StringValidation {
            max_length: Some(OBJECT_ID_HEX_LEN as u32),
            min_length: Some(OBJECT_ID_HEX_LEN as u32),
            pattern: Some("^[0-9a-f]{24}$".to_string()),
        }));
        Schema::Object(schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_is_24_lowercase_chars() {
        let id = ObjectId::new();
        let hex = id.to_hex();
        assert_eq!(hex.len(), OBJECT_ID_HEX_LEN);
        assert!(hex.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(id.to_string(), hex);
    }

    #[test]
    fn test_parse_accepts_hex_of_either_case() {
        let id = ObjectId::from_bytes([0x65, 0x0a, 0xbc, 0xde, 1, 2, 3, 4, 5, 0xff, 0x00, 0x10]);
        assert_eq!(id.to_hex(), "650abcde0102030405ff0010");
        assert_eq!(ObjectId::parse_str("650abcde0102030405ff0010").unwrap(), id);
        assert_eq!(ObjectId::parse_str("650ABCDE0102030405FF0010").unwrap(), id);
        assert_eq!("650abcde0102030405ff0010".parse::<ObjectId>().unwrap(), id);
    }

    #[test]
    fn test_parse_rejects_malformed_input() {
        assert!(ObjectId::parse_str("").is_err());
        assert!(ObjectId::parse_str("650abcde").is_err());
        assert!(ObjectId::parse_str("650abcde0102030405ff00100").is_err());
        assert!(ObjectId::parse_str("zz0abcde0102030405ff0010").is_err());
    }

    #[test]
    fn test_from_slice_checks_length() {
        assert!(ObjectId::from_slice(&[0u8; 12]).is_ok());
        assert!(matches!(
            ObjectId::from_slice(&[0u8; 11]),
            Err(ModelError::InvalidObjectId(_))
        ));
    }

    #[test]
    fn test_new_ids_are_unique() {
        let a = ObjectId::new();
        let b = ObjectId::new();
        assert_ne!(a, b);
        assert_eq!(a.bytes()[4..9], b.bytes()[4..9], "process bytes are shared");
    }

    #[test]
    fn test_timestamp_matches_creation_second() {
        let before = Utc::now().timestamp();
        let id = ObjectId::new();
        let after = Utc::now().timestamp();
        let ts = id.timestamp().timestamp();
        assert!(ts >= before && ts <= after);
    }

    #[test]
    fn test_ordering_follows_timestamp() {
        let older = ObjectId::with_timestamp(1_700_000_000);
        let newer = ObjectId::with_timestamp(1_700_000_001);
        assert!(older < newer);
    }

    #[test]
    fn test_counter_wrap_within_a_second_breaks_ordering() {
        let process = [1, 2, 3, 4, 5];
        let last = ObjectId::compose(1_700_000_000, &process, COUNTER_MASK);
        let wrapped = ObjectId::compose(1_700_000_000, &process, COUNTER_MASK + 1);
        assert_eq!(wrapped.bytes()[9..], [0, 0, 0]);
        assert!(wrapped < last);

        let next_second = ObjectId::compose(1_700_000_001, &process, COUNTER_MASK + 1);
        assert!(next_second > last);
    }

    #[test]
    fn test_serde_uses_hex_string() {
        let id = ObjectId::parse_str("650abcde0102030405ff0010").unwrap();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"650abcde0102030405ff0010\"");

        let back: ObjectId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
        assert!(serde_json::from_str::<ObjectId>("\"nope\"").is_err());
    }
}
