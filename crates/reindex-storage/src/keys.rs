//! Key encoding and decoding for storage layer.
//!
//! Record key format: `rec:{model}:{kind}:{value}`
//! - kind `i`: integer primary key, offset by 2^63 and zero-padded to 20
//!   digits so byte order equals numeric order (negative keys included)
//! - kind `s`: string primary key, stored verbatim
//!
//! All integer keys of a model sort before its string keys. A forward scan
//! over `rec:{model}:` therefore visits records in primary-key order, which
//! is the stable order batch fetches rely on.

use serde_json::Value;

use reindex_types::Record;

use crate::error::StorageError;

const SIGN_OFFSET: u64 = 1 << 63;

/// Key for model descriptors
/// Format: model:{name}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelKey {
    pub name: String,
}

impl ModelKey {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        format!("model:{}", self.name).into_bytes()
    }

    /// Prefix shared by every model key
    pub fn prefix() -> &'static [u8] {
        b"model:"
    }
}

/// Primary key value as it is ordered in storage.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum PrimaryKey {
    Int(i64),
    Str(String),
}

impl PrimaryKey {
    /// Extract the primary key of a record.
    pub fn from_record(record: &Record, field: &str) -> Result<Self, StorageError> {
        match record.get(field) {
            Some(Value::Number(n)) => n.as_i64().map(PrimaryKey::Int).ok_or_else(|| {
                StorageError::Key(format!("primary key '{}' is not an i64: {}", field, n))
            }),
            Some(Value::String(s)) => Ok(PrimaryKey::Str(s.clone())),
            Some(other) => Err(StorageError::Key(format!(
                "primary key '{}' must be an integer or string, got {}",
                field, other
            ))),
            None => Err(StorageError::Key(format!(
                "record is missing primary key '{}'",
                field
            ))),
        }
    }

    fn encode(&self) -> String {
        match self {
            PrimaryKey::Int(n) => format!("i:{:020}", (*n as u64) ^ SIGN_OFFSET),
            PrimaryKey::Str(s) => format!("s:{}", s),
        }
    }

    fn decode(s: &str) -> Result<Self, StorageError> {
        match s.split_once(':') {
            Some(("i", digits)) => {
                let raw: u64 = digits
                    .parse()
                    .map_err(|e| StorageError::Key(format!("Invalid integer key: {}", e)))?;
                Ok(PrimaryKey::Int((raw ^ SIGN_OFFSET) as i64))
            }
            Some(("s", value)) => Ok(PrimaryKey::Str(value.to_string())),
            _ => Err(StorageError::Key(format!("Invalid primary key encoding: {}", s))),
        }
    }
}

/// Key for record storage
/// Format: rec:{model}:{kind}:{value}
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordKey {
    pub model: String,
    pub primary_key: PrimaryKey,
}

impl RecordKey {
    pub fn new(model: impl Into<String>, primary_key: PrimaryKey) -> Self {
        Self {
            model: model.into(),
            primary_key,
        }
    }

    /// Encode key to bytes for storage
    pub fn to_bytes(&self) -> Vec<u8> {
        format!("rec:{}:{}", self.model, self.primary_key.encode()).into_bytes()
    }

    /// Decode key from bytes
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, StorageError> {
        let s = std::str::from_utf8(bytes)
            .map_err(|e| StorageError::Key(format!("Invalid UTF-8: {}", e)))?;

        let mut parts = s.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("rec"), Some(model), Some(pk)) => Ok(Self {
                model: model.to_string(),
                primary_key: PrimaryKey::decode(pk)?,
            }),
            _ => Err(StorageError::Key(format!("Invalid record key format: {}", s))),
        }
    }

    /// Prefix covering every record of a model
    pub fn prefix(model: &str) -> Vec<u8> {
        format!("rec:{}:", model).into_bytes()
    }
}
