//! Error types for the reindex pipeline.

use reindex_search::SearchError;
use reindex_storage::StorageError;
use reindex_types::TypesError;
use thiserror::Error;

/// Errors that can occur while reindexing or changing the index structure
#[derive(Error, Debug)]
pub enum ReindexError {
    /// Requested model is not registered or not index-eligible
    #[error("model '{0}' not available. Use '--list-models' to list available models")]
    UnknownModel(String),

    /// Either store could not be reached or read
    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    /// The index store refused a write (mapping, schema or type conflict)
    #[error("Write rejected: {0}")]
    WriteRejected(String),

    /// A caller passed arguments the stores cannot serve
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Batch size must be positive
    #[error("Invalid box size: {0} (must be > 0)")]
    InvalidBoxSize(usize),

    /// Another pass or mapping change holds the model
    #[error("Model '{0}' is busy with another reindex or mapping change")]
    ModelBusy(String),

    /// A batch failed; earlier batches stay committed
    #[error("Reindex of '{model}' stopped at box {batch}/{total}: {source}")]
    BatchFailed {
        model: String,
        batch: usize,
        total: usize,
        #[source]
        source: Box<ReindexError>,
    },

    /// Worker task failure in the pipelined reindexer
    #[error("Pipeline error: {0}")]
    Pipeline(String),
}

impl ReindexError {
    /// Wrap an error with the batch it happened in.
    pub fn in_batch(self, model: &str, batch: usize, total: usize) -> Self {
        ReindexError::BatchFailed {
            model: model.to_string(),
            batch,
            total,
            source: Box::new(self),
        }
    }

    /// The innermost error, unwrapping batch context.
    pub fn root(&self) -> &ReindexError {
        match self {
            ReindexError::BatchFailed { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<StorageError> for ReindexError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::UnsupportedSortKey { .. } | StorageError::InvalidModel(_) => {
                ReindexError::InvalidRequest(err.to_string())
            }
            other => ReindexError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<SearchError> for ReindexError {
    fn from(err: SearchError) -> Self {
        match err {
            SearchError::IndexNotFound(_)
            | SearchError::MappingNotFound(_)
            | SearchError::MappingConflict(_)
            | SearchError::SchemaMismatch(_) => ReindexError::WriteRejected(err.to_string()),
            other => ReindexError::StoreUnavailable(other.to_string()),
        }
    }
}

impl From<TypesError> for ReindexError {
    fn from(err: TypesError) -> Self {
        ReindexError::InvalidRequest(err.to_string())
    }
}
