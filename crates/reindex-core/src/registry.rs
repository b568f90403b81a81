//! Index-eligible models and handles to query them.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use reindex_types::{Mapping, ModelDescriptor, Record};

use crate::error::ReindexError;
use crate::store::DocumentStore;

/// Capability every index-eligible model exposes.
pub trait Queryable {
    fn name(&self) -> &str;

    /// Field the model is fetched in order of.
    fn sort_key(&self) -> &str;

    fn count(&self) -> Result<u64, ReindexError>;

    fn query(&self, offset: u64, limit: usize, sort_key: &str)
        -> Result<Vec<Record>, ReindexError>;

    /// Index mapping for the model.
    fn schema(&self) -> &Mapping;
}

/// A model bound to the document store it lives in.
#[derive(Clone)]
pub struct ModelHandle {
    descriptor: ModelDescriptor,
    mapping: Mapping,
    store: Arc<dyn DocumentStore>,
}

impl ModelHandle {
    pub fn new(descriptor: ModelDescriptor, store: Arc<dyn DocumentStore>) -> Self {
        let mapping = descriptor.mapping();
        Self {
            descriptor,
            mapping,
            store,
        }
    }
}

impl Queryable for ModelHandle {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn sort_key(&self) -> &str {
        &self.descriptor.primary_key
    }

    fn count(&self) -> Result<u64, ReindexError> {
        self.store.count(&self.descriptor)
    }

    fn query(
        &self,
        offset: u64,
        limit: usize,
        sort_key: &str,
    ) -> Result<Vec<Record>, ReindexError> {
        self.store.query(&self.descriptor, offset, limit, sort_key)
    }

    fn schema(&self) -> &Mapping {
        &self.mapping
    }
}

impl std::fmt::Debug for ModelHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelHandle")
            .field("descriptor", &self.descriptor)
            .finish_non_exhaustive()
    }
}

/// The set of models that take part in reindexing.
#[derive(Debug, Clone, Default)]
pub struct ModelRegistry {
    models: BTreeMap<String, ModelHandle>,
}

impl ModelRegistry {
    /// Build the registry from the store's registered types, keeping only
    /// index-enabled models.
    pub fn load(store: Arc<dyn DocumentStore>) -> Result<Self, ReindexError> {
        let mut models = BTreeMap::new();
        for (name, descriptor) in store.registered_types()? {
            if descriptor.index_enabled {
                models.insert(name, ModelHandle::new(descriptor, Arc::clone(&store)));
            } else {
                debug!(model = %name, "Model not index-enabled, skipping");
            }
        }
        debug!(count = models.len(), "Loaded model registry");
        Ok(Self { models })
    }

    /// Names of eligible models, sorted.
    pub fn eligible_models(&self) -> Vec<String> {
        self.models.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Result<&ModelHandle, ReindexError> {
        self.models
            .get(name)
            .ok_or_else(|| ReindexError::UnknownModel(name.to_string()))
    }

    /// Resolve every name or fail on the first unknown one.
    pub fn validate(&self, names: &[String]) -> Result<Vec<ModelHandle>, ReindexError> {
        names
            .iter()
            .map(|name| self.get(name).cloned())
            .collect()
    }

    /// Mappings of every eligible model.
    pub fn mappings(&self) -> Vec<Mapping> {
        self.models
            .values()
            .map(|handle| handle.schema().clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.models.len()
    }

    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
