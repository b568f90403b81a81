//! Records read from the document store and the documents pushed to the index.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypesError;

/// A raw record: field name to JSON value.
///
/// Keys are kept sorted so the serialized form is canonical.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(field.into(), value.into());
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// String identity of the record under the given primary key field.
    ///
    /// Only string and integer keys identify a record.
    pub fn identity(&self, primary_key: &str) -> Option<String> {
        match self.0.get(primary_key)? {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) if n.is_i64() || n.is_u64() => Some(n.to_string()),
            _ => None,
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        Ok(serde_json::to_vec(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

impl From<BTreeMap<String, Value>> for Record {
    fn from(map: BTreeMap<String, Value>) -> Self {
        Self(map)
    }
}

/// A record projected onto its model's mapping, ready for the index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    /// Document identity (string form of the primary key)
    pub id: String,
    /// Mapped fields only
    pub fields: BTreeMap<String, Value>,
}

impl IndexDocument {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    /// Canonical JSON of the mapped fields; equal content gives equal text.
    pub fn source_json(&self) -> Result<String, TypesError> {
        Ok(serde_json::to_string(&self.fields)?)
    }
}

/// Per-batch result of an index upsert.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriteOutcome {
    /// Documents that did not exist before
    pub created: u64,
    /// Documents whose content changed (version bumped)
    pub updated: u64,
    /// Documents already present with identical content
    pub unchanged: u64,
}

impl WriteOutcome {
    pub fn total(&self) -> u64 {
        self.created + self.updated + self.unchanged
    }

    pub fn merge(&mut self, other: &WriteOutcome) {
        self.created += other.created;
        self.updated += other.updated;
        self.unchanged += other.unchanged;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_record_identity() {
        let record = Record::new().with("id", 42).with("title", "hello");
        assert_eq!(record.identity("id"), Some("42".to_string()));
        assert_eq!(record.identity("title"), Some("hello".to_string()));
        assert_eq!(record.identity("missing"), None);

        let float_key = Record::new().with("id", 1.5);
        assert_eq!(float_key.identity("id"), None);
    }

    #[test]
    fn test_record_bytes_are_canonical() {
        let a = Record::new().with("b", 2).with("a", 1);
        let b = Record::new().with("a", 1).with("b", 2);
        assert_eq!(a.to_bytes().unwrap(), b.to_bytes().unwrap());
        assert_eq!(Record::from_bytes(&a.to_bytes().unwrap()).unwrap(), b);
    }

    #[test]
    fn test_source_json_sorted() {
        let doc = IndexDocument::new("1")
            .with("title", "x")
            .with("id", json!(1));
        assert_eq!(doc.source_json().unwrap(), r#"{"id":1,"title":"x"}"#);
    }

    #[test]
    fn test_write_outcome_merge() {
        let mut total = WriteOutcome::default();
        total.merge(&WriteOutcome {
            created: 2,
            updated: 1,
            unchanged: 0,
        });
        total.merge(&WriteOutcome {
            created: 0,
            updated: 0,
            unchanged: 3,
        });
        assert_eq!(total.total(), 6);
        assert_eq!(total.created, 2);
    }
}
