//! Per-model exclusion between reindex passes and mapping changes.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::error::ReindexError;

/// Tracks which models are currently being reindexed or remapped.
#[derive(Debug, Clone, Default)]
pub struct ModelGuard {
    active: Arc<Mutex<HashSet<String>>>,
}

impl ModelGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim a model, failing with [`ReindexError::ModelBusy`] if held.
    pub fn acquire(&self, model: &str) -> Result<ModelLease, ReindexError> {
        let mut active = self.active.lock().unwrap_or_else(|p| p.into_inner());
        if !active.insert(model.to_string()) {
            return Err(ReindexError::ModelBusy(model.to_string()));
        }
        debug!(model, "Acquired model lease");
        Ok(ModelLease {
            guard: self.clone(),
            model: model.to_string(),
        })
    }

    /// Claim several models at once; nothing is held on failure.
    pub fn acquire_all(&self, models: &[String]) -> Result<Vec<ModelLease>, ReindexError> {
        let mut leases = Vec::with_capacity(models.len());
        for model in models {
            leases.push(self.acquire(model)?);
        }
        Ok(leases)
    }

    pub fn is_held(&self, model: &str) -> bool {
        self.active
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .contains(model)
    }
}

/// Releases the model when dropped.
#[derive(Debug)]
pub struct ModelLease {
    guard: ModelGuard,
    model: String,
}

impl ModelLease {
    pub fn model(&self) -> &str {
        &self.model
    }
}

impl Drop for ModelLease {
    fn drop(&mut self) {
        let mut active = self.guard.active.lock().unwrap_or_else(|p| p.into_inner());
        active.remove(&self.model);
        debug!(model = %self.model, "Released model lease");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lease_excludes_until_dropped() {
        let guard = ModelGuard::new();
        let lease = guard.acquire("article").unwrap();
        assert_eq!(lease.model(), "article");
        assert!(matches!(guard.acquire("article"), Err(ReindexError::ModelBusy(_))));
        assert!(guard.acquire("tag").is_ok());

        drop(lease);
        assert!(!guard.is_held("article"));
        assert!(guard.acquire("article").is_ok());
    }

    #[test]
    fn test_acquire_all_releases_on_conflict() {
        let guard = ModelGuard::new();
        let _held = guard.acquire("tag").unwrap();
        let err = guard
            .acquire_all(&["article".to_string(), "tag".to_string()])
            .unwrap_err();
        assert!(matches!(err, ReindexError::ModelBusy(name) if name == "tag"));
        assert!(!guard.is_held("article"));
    }
}
