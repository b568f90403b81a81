//! Index store error types.

use reindex_types::TypesError;
use thiserror::Error;

/// Errors that can occur during index operations.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Tantivy index error
    #[error("Tantivy error: {0}")]
    Tantivy(#[from] tantivy::TantivyError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding/decoding error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Catalog root missing
    #[error("Index not found at path: {0}")]
    IndexNotFound(String),

    /// No mapping registered for the model
    #[error("Mapping not found for model: {0}")]
    MappingNotFound(String),

    /// A different mapping already exists for the model
    #[error("Mapping conflict: {0}")]
    MappingConflict(String),

    /// Document does not fit the model's mapping
    #[error("Schema mismatch: {0}")]
    SchemaMismatch(String),

    /// Index is locked (another writer has it open)
    #[error("Index is locked: {0}")]
    IndexLocked(String),
}

impl From<serde_json::Error> for SearchError {
    fn from(err: serde_json::Error) -> Self {
        SearchError::Serialization(err.to_string())
    }
}

impl From<TypesError> for SearchError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::Serialization(e) => SearchError::Serialization(e.to_string()),
            other => SearchError::SchemaMismatch(other.to_string()),
        }
    }
}
