//! Chunked reindexing from the document store into the search index.
//!
//! ## Key Components
//!
//! - [`DocumentStore`] / [`IndexStore`]: store contracts, with RocksDB and
//!   Tantivy implementations
//! - [`ModelRegistry`]: index-eligible models and their mappings
//! - [`plan`]: splits a record count into batches
//! - [`DocumentFetcher`] / [`IndexWriter`]: read and write one batch
//! - [`Reindexer`]: drives a pass per model, sequential or pipelined
//! - [`IndexLifecycle`]: recreates the index or resets a model's mapping
//! - [`Environment`]: opens the stores named by [`Settings`](reindex_types::Settings)
//!
//! ## Example
//!
//! ```ignore
//! use reindex_core::Environment;
//!
//! let env = Environment::bootstrap(settings)?;
//! let models = env.lifecycle().recreate_index()?;
//! let summary = env.reindexer().reindex_models(&models).await?;
//! ```

pub mod environment;
pub mod error;
pub mod fetcher;
pub mod guard;
pub mod lifecycle;
pub mod orchestrator;
pub mod pipeline;
pub mod planner;
pub mod progress;
pub mod registry;
pub mod store;
pub mod writer;

#[cfg(test)]
mod test_support;

pub use environment::Environment;
pub use error::ReindexError;
pub use fetcher::{project, DocumentFetcher};
pub use guard::{ModelGuard, ModelLease};
pub use lifecycle::IndexLifecycle;
pub use orchestrator::{ModelReport, ReindexConfig, Reindexer, RunState, RunSummary};
pub use planner::{plan, BatchDescriptor, BatchPlan};
pub use progress::{BatchProgress, LoggingProgressCallback, ProgressCallback};
pub use registry::{ModelHandle, ModelRegistry, Queryable};
pub use store::{DocumentStore, IndexStore, RocksDocumentStore, TantivyIndexStore};
pub use writer::IndexWriter;
