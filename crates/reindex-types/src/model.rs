//! Model descriptors and the index mappings derived from them.
//!
//! A model is a logical record type held by the document store. Its
//! descriptor names the primary key, the typed fields that get projected
//! into the search index, and whether the model is eligible for indexing
//! at all.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::error::TypesError;

/// Field names the index store reserves for its own bookkeeping.
pub const RESERVED_FIELD_NAMES: &[&str] = &["doc_id", "doc_version", "doc_source"];

/// How a mapped field is indexed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldKind {
    /// Tokenized full text
    Text,
    /// Exact-match string
    Keyword,
    /// Signed 64-bit integer
    I64,
    /// 64-bit float
    F64,
    /// Boolean flag
    Bool,
}

impl FieldKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKind::Text => "text",
            FieldKind::Keyword => "keyword",
            FieldKind::I64 => "i64",
            FieldKind::F64 => "f64",
            FieldKind::Bool => "bool",
        }
    }
}

impl std::fmt::Display for FieldKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed field of a model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub kind: FieldKind,
}

impl FieldSpec {
    pub fn new(name: impl Into<String>, kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            kind,
        }
    }
}

/// Static description of a model registered in the document store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelDescriptor {
    /// Model name, restricted to `[A-Za-z0-9_-]`
    pub name: String,
    /// Field that identifies a record; also the fetch sort key
    pub primary_key: String,
    /// Whether the model takes part in reindexing
    #[serde(default)]
    pub index_enabled: bool,
    /// Fields projected into the index
    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

impl ModelDescriptor {
    pub fn new(name: impl Into<String>, primary_key: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            primary_key: primary_key.into(),
            index_enabled: false,
            fields: Vec::new(),
        }
    }

    pub fn with_index_enabled(mut self, enabled: bool) -> Self {
        self.index_enabled = enabled;
        self
    }

    pub fn with_field(mut self, name: impl Into<String>, kind: FieldKind) -> Self {
        self.fields.push(FieldSpec::new(name, kind));
        self
    }

    /// Check the naming rules the stores rely on.
    pub fn validate(&self) -> Result<(), TypesError> {
        validate_model_name(&self.name)?;

        if self.primary_key.is_empty() {
            return Err(TypesError::InvalidInput(format!(
                "model '{}' has an empty primary key",
                self.name
            )));
        }

        let mut seen = BTreeSet::new();
        for field in &self.fields {
            if field.name.is_empty() {
                return Err(TypesError::InvalidInput(format!(
                    "model '{}' declares a field with an empty name",
                    self.name
                )));
            }
            if RESERVED_FIELD_NAMES.contains(&field.name.as_str()) {
                return Err(TypesError::InvalidInput(format!(
                    "model '{}' uses reserved field name '{}'",
                    self.name, field.name
                )));
            }
            if !seen.insert(field.name.as_str()) {
                return Err(TypesError::InvalidInput(format!(
                    "model '{}' declares field '{}' twice",
                    self.name, field.name
                )));
            }
        }

        if RESERVED_FIELD_NAMES.contains(&self.primary_key.as_str()) {
            return Err(TypesError::InvalidInput(format!(
                "model '{}' uses reserved field name '{}' as primary key",
                self.name, self.primary_key
            )));
        }

        Ok(())
    }

    /// Derive the index mapping for this model.
    ///
    /// An undeclared primary key is mapped as a keyword field.
    pub fn mapping(&self) -> Mapping {
        let mut fields = self.fields.clone();
        if !fields.iter().any(|f| f.name == self.primary_key) {
            fields.insert(0, FieldSpec::new(&self.primary_key, FieldKind::Keyword));
        }
        Mapping {
            model: self.name.clone(),
            id_field: self.primary_key.clone(),
            fields,
        }
    }
}

/// Index-side schema for one model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Mapping {
    pub model: String,
    pub id_field: String,
    pub fields: Vec<FieldSpec>,
}

impl Mapping {
    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, TypesError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, TypesError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// Model names double as storage key segments and directory names.
pub fn validate_model_name(name: &str) -> Result<(), TypesError> {
    if name.is_empty() {
        return Err(TypesError::InvalidInput("model name is empty".into()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return Err(TypesError::InvalidInput(format!(
            "model name '{}' may only contain ASCII letters, digits, '_' and '-'",
            name
        )));
    }
    Ok(())
}
