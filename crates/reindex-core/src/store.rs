//! Store contracts consumed by the reindexer, plus the RocksDB and Tantivy
//! implementations used by the binary.
//!
//! Adapters translate their crate errors into [`ReindexError`] so the
//! orchestrator only deals with one taxonomy.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use reindex_search::{IndexCatalog, ModelIndexer};
use reindex_storage::{Storage, StorageError};
use reindex_types::{IndexDocument, Mapping, ModelDescriptor, Record, WriteOutcome};

use crate::error::ReindexError;

/// The document store: source of truth for records.
pub trait DocumentStore: Send + Sync {
    /// Every model the store knows about, keyed by name.
    fn registered_types(&self) -> Result<BTreeMap<String, ModelDescriptor>, ReindexError>;

    /// Descriptor of one model.
    fn get_document_class(&self, name: &str) -> Result<ModelDescriptor, ReindexError>;

    /// Total records of a model.
    fn count(&self, model: &ModelDescriptor) -> Result<u64, ReindexError>;

    /// Up to `limit` records after skipping `offset`, ordered by `sort_key`.
    fn query(
        &self,
        model: &ModelDescriptor,
        offset: u64,
        limit: usize,
        sort_key: &str,
    ) -> Result<Vec<Record>, ReindexError>;
}

/// The search index store: derived, rebuildable copy of the records.
pub trait IndexStore: Send + Sync {
    /// Remove the whole index. Missing index is not an error.
    fn delete_index(&self) -> Result<(), ReindexError>;

    /// Create an empty index if none exists.
    fn create_index(&self) -> Result<(), ReindexError>;

    /// Register a mapping. Identical mappings are a no-op.
    fn put_mapping(&self, mapping: &Mapping) -> Result<(), ReindexError>;

    /// Drop a model's mapping together with its documents.
    fn delete_mapping(&self, model: &str) -> Result<(), ReindexError>;

    /// Insert or update documents by identity.
    fn upsert(&self, model: &str, documents: &[IndexDocument])
        -> Result<WriteOutcome, ReindexError>;

    fn put_all_mappings(&self, mappings: &[Mapping]) -> Result<(), ReindexError> {
        for mapping in mappings {
            self.put_mapping(mapping)?;
        }
        Ok(())
    }

    /// Make sure a model can receive documents, creating the index and
    /// mapping on first use.
    fn ensure_mapping(&self, mapping: &Mapping) -> Result<(), ReindexError> {
        self.create_index()?;
        self.put_mapping(mapping)
    }
}

// ===== RocksDB =====

/// [`DocumentStore`] backed by the RocksDB record store.
pub struct RocksDocumentStore {
    storage: Arc<Storage>,
}

impl RocksDocumentStore {
    pub fn new(storage: Arc<Storage>) -> Self {
        Self { storage }
    }
}

impl DocumentStore for RocksDocumentStore {
    fn registered_types(&self) -> Result<BTreeMap<String, ModelDescriptor>, ReindexError> {
        Ok(self
            .storage
            .list_models()?
            .into_iter()
            .map(|descriptor| (descriptor.name.clone(), descriptor))
            .collect())
    }

    fn get_document_class(&self, name: &str) -> Result<ModelDescriptor, ReindexError> {
        self.storage
            .get_model(name)?
            .ok_or_else(|| ReindexError::UnknownModel(name.to_string()))
    }

    fn count(&self, model: &ModelDescriptor) -> Result<u64, ReindexError> {
        Ok(self.storage.count_records(&model.name)?)
    }

    fn query(
        &self,
        model: &ModelDescriptor,
        offset: u64,
        limit: usize,
        sort_key: &str,
    ) -> Result<Vec<Record>, ReindexError> {
        // Records are keyed by primary key, which is the only order a scan gives.
        if sort_key != model.primary_key {
            return Err(StorageError::UnsupportedSortKey {
                model: model.name.clone(),
                sort_key: sort_key.to_string(),
            }
            .into());
        }
        Ok(self.storage.scan_records(&model.name, offset, limit)?)
    }
}

// ===== Tantivy =====

/// [`IndexStore`] backed by the Tantivy index catalog.
///
/// Each model's indexer (and its writer lock) is opened on the first upsert
/// and kept until the model's mapping or the whole index is deleted.
pub struct TantivyIndexStore {
    catalog: IndexCatalog,
    indexers: Mutex<HashMap<String, Arc<ModelIndexer>>>,
}

impl TantivyIndexStore {
    pub fn new(catalog: IndexCatalog) -> Self {
        Self {
            catalog,
            indexers: Mutex::new(HashMap::new()),
        }
    }

    fn indexers(&self) -> MutexGuard<'_, HashMap<String, Arc<ModelIndexer>>> {
        self.indexers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn indexer(&self, model: &str) -> Result<Arc<ModelIndexer>, ReindexError> {
        let mut indexers = self.indexers();
        if let Some(indexer) = indexers.get(model) {
            return Ok(Arc::clone(indexer));
        }

        let index = self.catalog.open_model(model)?;
        let indexer = Arc::new(ModelIndexer::new(&index)?);
        indexers.insert(model.to_string(), Arc::clone(&indexer));
        debug!(model, "Opened model indexer");
        Ok(indexer)
    }
}

impl IndexStore for TantivyIndexStore {
    fn delete_index(&self) -> Result<(), ReindexError> {
        self.indexers().clear();
        self.catalog.delete()?;
        Ok(())
    }

    fn create_index(&self) -> Result<(), ReindexError> {
        self.catalog.create()?;
        Ok(())
    }

    fn put_mapping(&self, mapping: &Mapping) -> Result<(), ReindexError> {
        if self.catalog.put_mapping(mapping)? {
            info!(model = %mapping.model, "Registered mapping");
        } else {
            debug!(model = %mapping.model, "Mapping already registered");
        }
        Ok(())
    }

    fn delete_mapping(&self, model: &str) -> Result<(), ReindexError> {
        self.indexers().remove(model);
        if !self.catalog.exists() {
            debug!(model, "No index yet, nothing to delete");
            return Ok(());
        }
        if !self.catalog.delete_mapping(model)? {
            warn!(model, "No mapping to delete");
        }
        Ok(())
    }

    fn upsert(
        &self,
        model: &str,
        documents: &[IndexDocument],
    ) -> Result<WriteOutcome, ReindexError> {
        Ok(self.indexer(model)?.upsert(documents)?)
    }
}
