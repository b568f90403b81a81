//! Structural changes to the index: full recreate and per-model mapping reset.

use std::sync::Arc;

use tracing::{info, warn};

use crate::error::ReindexError;
use crate::guard::ModelGuard;
use crate::registry::{ModelRegistry, Queryable};
use crate::store::IndexStore;

/// Recreates the index or resets single mappings.
#[derive(Clone)]
pub struct IndexLifecycle {
    registry: Arc<ModelRegistry>,
    index: Arc<dyn IndexStore>,
    guard: ModelGuard,
}

impl IndexLifecycle {
    pub fn new(registry: Arc<ModelRegistry>, index: Arc<dyn IndexStore>, guard: ModelGuard) -> Self {
        Self {
            registry,
            index,
            guard,
        }
    }

    /// Delete the index, create it empty and register every eligible
    /// model's mapping.
    ///
    /// Returns the models that now need reindexing. The index stays empty
    /// until they are.
    pub fn recreate_index(&self) -> Result<Vec<String>, ReindexError> {
        let models = self.registry.eligible_models();
        let _leases = self.guard.acquire_all(&models)?;

        warn!("Recreating the search index; all indexed documents are removed");
        self.index.delete_index()?;
        self.index.create_index()?;
        self.index.put_all_mappings(&self.registry.mappings())?;

        info!(models = models.len(), "Index recreated with mappings");
        Ok(models)
    }

    /// Drop and re-register one model's mapping, removing its documents.
    pub fn reset_mapping(&self, model: &str) -> Result<(), ReindexError> {
        let handle = self.registry.get(model)?;
        let _lease = self.guard.acquire(model)?;

        warn!(model, "Deleting `{}` mapping and its indexed documents", model);
        self.index.delete_mapping(model)?;
        self.index.ensure_mapping(handle.schema())?;
        info!(model, "Mapping for `{}` re-registered", model);
        Ok(())
    }
}
