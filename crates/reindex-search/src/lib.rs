//! # reindex-search
//!
//! Search index store for the reindexer, built on Tantivy.
//!
//! ## Features
//! - A catalog root holding one embedded Tantivy index per model mapping
//! - Mappings derived from model descriptors, replaced by delete-then-put
//! - Idempotent upserts: identical content keeps its version marker
//! - Point lookups of stored documents by identity

pub mod document;
pub mod error;
pub mod index;
pub mod indexer;
pub mod schema;
pub mod searcher;

pub use document::{to_tantivy_doc, StoredDocument};
pub use error::SearchError;
pub use index::{IndexCatalog, ModelIndex, SearchIndexConfig};
pub use indexer::ModelIndexer;
pub use schema::{build_model_schema, MappedField, ModelSchema};
pub use searcher::ModelReader;
