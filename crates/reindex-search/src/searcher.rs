//! Point lookups over a model index.

use tantivy::collector::TopDocs;
use tantivy::query::TermQuery;
use tantivy::schema::IndexRecordOption;
use tantivy::{IndexReader, Searcher, TantivyDocument, Term};

use crate::document::StoredDocument;
use crate::error::SearchError;
use crate::index::ModelIndex;
use crate::schema::ModelSchema;

/// Read access to the documents of one model.
pub struct ModelReader {
    reader: IndexReader,
    schema: ModelSchema,
}

impl ModelReader {
    pub fn new(index: &ModelIndex) -> Result<Self, SearchError> {
        Ok(Self {
            reader: index.reader()?,
            schema: index.schema().clone(),
        })
    }

    /// Reload the reader to see recent commits.
    pub fn reload(&self) -> Result<(), SearchError> {
        self.reader.reload()?;
        Ok(())
    }

    /// Fetch a document by identity.
    pub fn get(&self, id: &str) -> Result<Option<StoredDocument>, SearchError> {
        lookup(&self.reader.searcher(), &self.schema, id)
    }

    /// Number of live documents.
    pub fn num_docs(&self) -> u64 {
        self.reader.searcher().num_docs()
    }
}

/// Find the stored document with the given identity.
pub(crate) fn lookup(
    searcher: &Searcher,
    schema: &ModelSchema,
    id: &str,
) -> Result<Option<StoredDocument>, SearchError> {
    let query = TermQuery::new(
        Term::from_field_text(schema.doc_id, id),
        IndexRecordOption::Basic,
    );
    let top_docs = searcher.search(&query, &TopDocs::with_limit(1))?;

    match top_docs.first() {
        Some((_, address)) => {
            let doc: TantivyDocument = searcher.doc(*address)?;
            Ok(StoredDocument::from_tantivy(schema, &doc))
        }
        None => Ok(None),
    }
}
