//! Reading batches out of the document store.

use serde_json::Value;
use tracing::debug;

use reindex_types::{FieldKind, IndexDocument, Mapping, Record};

use crate::error::ReindexError;
use crate::planner::BatchDescriptor;
use crate::registry::{ModelHandle, Queryable};

/// Reads one model's records batch by batch.
#[derive(Debug, Clone)]
pub struct DocumentFetcher {
    model: ModelHandle,
}

impl DocumentFetcher {
    pub fn new(model: ModelHandle) -> Self {
        Self { model }
    }

    pub fn model(&self) -> &str {
        self.model.name()
    }

    pub fn sort_key(&self) -> &str {
        self.model.sort_key()
    }

    pub fn mapping(&self) -> &Mapping {
        self.model.schema()
    }

    /// Total records of the model.
    pub fn count(&self) -> Result<u64, ReindexError> {
        self.model.count()
    }

    /// Fetch the records of one batch and project them into documents.
    pub fn fetch(&self, descriptor: &BatchDescriptor) -> Result<Vec<IndexDocument>, ReindexError> {
        let records = self.model.query(
            descriptor.offset(),
            descriptor.limit,
            &descriptor.sort_key,
        )?;
        debug!(
            model = self.model.name(),
            offset = descriptor.offset(),
            fetched = records.len(),
            "Fetched batch"
        );

        let mapping = self.model.schema();
        records
            .iter()
            .map(|record| project(record, mapping))
            .collect()
    }
}

/// Build the index document for a record: identity from the primary key,
/// fields limited to the mapping.
pub fn project(record: &Record, mapping: &Mapping) -> Result<IndexDocument, ReindexError> {
    let id = record.identity(&mapping.id_field).ok_or_else(|| {
        ReindexError::WriteRejected(format!(
            "{} record without usable '{}' value",
            mapping.model, mapping.id_field
        ))
    })?;

    let mut document = IndexDocument::new(id.clone());
    for spec in &mapping.fields {
        // A keyword primary key holds the identity string, whatever the
        // record stores (integer keys included).
        if spec.name == mapping.id_field && spec.kind == FieldKind::Keyword {
            document.fields.insert(spec.name.clone(), Value::String(id.clone()));
            continue;
        }
        match record.get(&spec.name) {
            Some(Value::Null) | None => {}
            Some(value) => {
                document.fields.insert(spec.name.clone(), value.clone());
            }
        }
    }
    Ok(document)
}
