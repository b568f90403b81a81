//! Upserts into a model index.
//!
//! Each document is looked up by identity in the last committed state:
//! - absent: added at version 1
//! - present with identical source: left alone, version kept
//! - present with different source: replaced at version + 1
//!
//! A batch is validated completely before anything is written and committed
//! once at the end, so a rejected document leaves the batch unwritten.

use std::collections::HashSet;
use std::sync::Mutex;

use tantivy::{IndexReader, IndexWriter, TantivyDocument, Term};
use tracing::{debug, info, warn};

use reindex_types::{IndexDocument, WriteOutcome};

use crate::document::to_tantivy_doc;
use crate::error::SearchError;
use crate::index::ModelIndex;
use crate::schema::ModelSchema;
use crate::searcher::lookup;

enum Pending {
    Create(TantivyDocument),
    Replace(String, TantivyDocument),
}

/// Manages document writes for one model index.
pub struct ModelIndexer {
    writer: Mutex<IndexWriter>,
    reader: IndexReader,
    schema: ModelSchema,
    model: String,
}

impl ModelIndexer {
    /// Create a new indexer from a ModelIndex.
    pub fn new(index: &ModelIndex) -> Result<Self, SearchError> {
        Ok(Self {
            writer: Mutex::new(index.writer()?),
            reader: index.reader()?,
            schema: index.schema().clone(),
            model: index.mapping().model.clone(),
        })
    }

    /// Insert or update documents by identity and commit.
    pub fn upsert(&self, docs: &[IndexDocument]) -> Result<WriteOutcome, SearchError> {
        let mut outcome = WriteOutcome::default();
        if docs.is_empty() {
            debug!(model = %self.model, "Empty batch, nothing to write");
            return Ok(outcome);
        }

        self.reader.reload()?;
        let searcher = self.reader.searcher();

        let mut seen = HashSet::with_capacity(docs.len());
        let mut pending = Vec::with_capacity(docs.len());
        for doc in docs {
            if !seen.insert(doc.id.as_str()) {
                return Err(SearchError::SchemaMismatch(format!(
                    "document '{}' appears twice in one batch",
                    doc.id
                )));
            }

            let source = doc.source_json()?;
            match lookup(&searcher, &self.schema, &doc.id)? {
                Some(stored) if stored.source == source => {
                    outcome.unchanged += 1;
                }
                Some(stored) => {
                    let tantivy_doc = to_tantivy_doc(&self.schema, doc, stored.version + 1, &source)?;
                    pending.push(Pending::Replace(doc.id.clone(), tantivy_doc));
                    outcome.updated += 1;
                }
                None => {
                    let tantivy_doc = to_tantivy_doc(&self.schema, doc, 1, &source)?;
                    pending.push(Pending::Create(tantivy_doc));
                    outcome.created += 1;
                }
            }
        }

        if pending.is_empty() {
            debug!(model = %self.model, unchanged = outcome.unchanged, "Batch already up to date");
            return Ok(outcome);
        }

        let mut writer = self
            .writer
            .lock()
            .map_err(|e| SearchError::IndexLocked(e.to_string()))?;

        for item in pending {
            match item {
                Pending::Create(tantivy_doc) => {
                    writer.add_document(tantivy_doc)?;
                }
                Pending::Replace(id, tantivy_doc) => {
                    writer.delete_term(Term::from_field_text(self.schema.doc_id, &id));
                    writer.add_document(tantivy_doc)?;
                }
            }
        }

        match writer.commit() {
            Ok(opstamp) => {
                info!(
                    model = %self.model,
                    opstamp,
                    created = outcome.created,
                    updated = outcome.updated,
                    unchanged = outcome.unchanged,
                    "Committed batch"
                );
                Ok(outcome)
            }
            Err(e) => {
                warn!(model = %self.model, error = %e, "Commit failed, rolling back");
                writer.rollback()?;
                Err(e.into())
            }
        }
    }
}
