//! Storage layer error types.

use reindex_types::TypesError;
use thiserror::Error;

/// Errors that can occur in the storage layer
#[derive(Error, Debug)]
pub enum StorageError {
    /// RocksDB operation failed
    #[error("RocksDB error: {0}")]
    RocksDb(#[from] rocksdb::Error),

    /// Column family not found
    #[error("Column family not found: {0}")]
    ColumnFamilyNotFound(String),

    /// Key encoding/decoding error
    #[error("Key error: {0}")]
    Key(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Model descriptor rejected or conflicting with a registered one
    #[error("Invalid model: {0}")]
    InvalidModel(String),

    /// Records are only ordered by their primary key
    #[error("Unsupported sort key '{sort_key}' for model '{model}'")]
    UnsupportedSortKey { model: String, sort_key: String },
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

impl From<TypesError> for StorageError {
    fn from(err: TypesError) -> Self {
        match err {
            TypesError::Serialization(e) => StorageError::Serialization(e.to_string()),
            other => StorageError::InvalidModel(other.to_string()),
        }
    }
}
