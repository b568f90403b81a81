//! Writing batches into the index store.

use std::sync::Arc;

use tracing::debug;

use reindex_types::{IndexDocument, WriteOutcome};

use crate::error::ReindexError;
use crate::store::IndexStore;

/// Writes one model's batches into the index store.
#[derive(Clone)]
pub struct IndexWriter {
    index: Arc<dyn IndexStore>,
    model: String,
}

impl IndexWriter {
    pub fn new(index: Arc<dyn IndexStore>, model: impl Into<String>) -> Self {
        Self {
            index,
            model: model.into(),
        }
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Upsert a batch. An empty batch succeeds without touching the store.
    pub fn write(&self, documents: &[IndexDocument]) -> Result<WriteOutcome, ReindexError> {
        if documents.is_empty() {
            debug!(model = %self.model, "Empty batch, nothing to write");
            return Ok(WriteOutcome::default());
        }
        self.index.upsert(&self.model, documents)
    }
}
