//! Wiring settings to stores, registry and services.

use std::sync::Arc;

use tracing::{debug, info};

use reindex_search::{IndexCatalog, SearchIndexConfig};
use reindex_storage::Storage;
use reindex_types::Settings;

use crate::error::ReindexError;
use crate::guard::ModelGuard;
use crate::lifecycle::IndexLifecycle;
use crate::orchestrator::{ReindexConfig, Reindexer};
use crate::registry::ModelRegistry;
use crate::store::{DocumentStore, IndexStore, RocksDocumentStore, TantivyIndexStore};

/// Initialized stores and the services built on them.
#[derive(Clone)]
pub struct Environment {
    settings: Settings,
    index: Arc<dyn IndexStore>,
    registry: Arc<ModelRegistry>,
    guard: ModelGuard,
}

impl Environment {
    /// Open the RocksDB document store and the Tantivy index catalog named
    /// by `settings`, registering configured models.
    ///
    /// Registration is idempotent, so bootstrapping twice against the same
    /// paths yields the same registry.
    pub fn bootstrap(settings: Settings) -> Result<Self, ReindexError> {
        let db_path = settings.expanded_db_path();
        std::fs::create_dir_all(&db_path).map_err(|e| {
            ReindexError::StoreUnavailable(format!("{}: {e}", db_path.display()))
        })?;
        let storage = Storage::open(&db_path)?;

        for descriptor in settings.model_descriptors() {
            if storage.register_model(&descriptor)? {
                debug!(model = %descriptor.name, "Registered model from configuration");
            }
        }

        let catalog = IndexCatalog::new(
            SearchIndexConfig::new(settings.expanded_index_path())
                .with_memory_mb(settings.writer_memory_mb),
        );

        info!(
            db_path = %db_path.display(),
            index_path = %catalog.path().display(),
            "Stores opened"
        );

        Self::from_parts(
            settings,
            Arc::new(RocksDocumentStore::new(Arc::new(storage))),
            Arc::new(TantivyIndexStore::new(catalog)),
        )
    }

    /// Build an environment over existing stores.
    pub fn from_parts(
        settings: Settings,
        documents: Arc<dyn DocumentStore>,
        index: Arc<dyn IndexStore>,
    ) -> Result<Self, ReindexError> {
        let registry = ModelRegistry::load(documents)?;
        info!(eligible = registry.len(), "Model registry loaded");
        Ok(Self {
            settings,
            index,
            registry: Arc::new(registry),
            guard: ModelGuard::new(),
        })
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.registry
    }

    pub fn reindexer(&self) -> Reindexer {
        Reindexer::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.index),
            self.guard.clone(),
            ReindexConfig::default()
                .with_box_size(self.settings.box_size)
                .with_pipeline_depth(self.settings.pipeline_depth),
        )
    }

    pub fn lifecycle(&self) -> IndexLifecycle {
        IndexLifecycle::new(
            Arc::clone(&self.registry),
            Arc::clone(&self.index),
            self.guard.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reindex_types::{FieldKind, ModelSettings};
    use tempfile::TempDir;

    fn settings(temp_dir: &TempDir) -> Settings {
        let mut settings = Settings {
            db_path: temp_dir.path().join("db").to_string_lossy().to_string(),
            index_path: temp_dir.path().join("index").to_string_lossy().to_string(),
            box_size: 2,
            ..Default::default()
        };
        settings.models.insert(
            "article".to_string(),
            ModelSettings {
                primary_key: "id".to_string(),
                index_enabled: true,
                fields: vec![
                    reindex_types::FieldSpec::new("id", FieldKind::I64),
                    reindex_types::FieldSpec::new("title", FieldKind::Text),
                ],
            },
        );
        settings.models.insert(
            "audit".to_string(),
            ModelSettings {
                primary_key: "id".to_string(),
                index_enabled: false,
                fields: Vec::new(),
            },
        );
        settings
    }

    #[test]
    fn test_bootstrap_registers_models() {
        let temp_dir = TempDir::new().unwrap();
        let env = Environment::bootstrap(settings(&temp_dir)).unwrap();
        assert_eq!(env.registry().eligible_models(), vec!["article"]);
        assert_eq!(env.reindexer().config().box_size, 2);
        drop(env);

        let again = Environment::bootstrap(settings(&temp_dir)).unwrap();
        assert_eq!(again.registry().eligible_models(), vec!["article"]);
    }

    #[tokio::test]
    async fn test_bootstrap_end_to_end() {
        let temp_dir = TempDir::new().unwrap();
        let settings = settings(&temp_dir);
        {
            let storage = Storage::open(&settings.expanded_db_path()).unwrap();
            let descriptor = settings.model_descriptors().remove(0);
            storage.register_model(&descriptor).unwrap();
            for id in 1..=5i64 {
                storage
                    .put_record(
                        &descriptor,
                        &reindex_types::Record::new()
                            .with("id", id)
                            .with("title", format!("article {id}")),
                    )
                    .unwrap();
            }
        }

        let env = Environment::bootstrap(settings).unwrap();
        let summary = env
            .reindexer()
            .reindex_models(&["article".to_string()])
            .await
            .unwrap();
        assert!(summary.is_success());
        assert_eq!(summary.documents(), 5);
        assert_eq!(summary.reports[0].batches, 3);
    }

    #[tokio::test]
    async fn test_integer_ids_with_undeclared_primary_key() {
        let temp_dir = TempDir::new().unwrap();
        let mut settings = settings(&temp_dir);
        settings.models.insert(
            "session".to_string(),
            ModelSettings {
                primary_key: "id".to_string(),
                index_enabled: true,
                fields: vec![reindex_types::FieldSpec::new("title", FieldKind::Text)],
            },
        );
        {
            let storage = Storage::open(&settings.expanded_db_path()).unwrap();
            let descriptor = settings
                .model_descriptors()
                .into_iter()
                .find(|d| d.name == "session")
                .unwrap();
            storage.register_model(&descriptor).unwrap();
            let records: Vec<_> = (1..=3i64)
                .map(|id| {
                    reindex_types::Record::new()
                        .with("id", id)
                        .with("title", format!("session {id}"))
                })
                .collect();
            storage.put_records(&descriptor, &records).unwrap();
        }

        let env = Environment::bootstrap(settings).unwrap();
        let report = env.reindexer().run_model("session").await.unwrap();
        assert_eq!(report.state, crate::orchestrator::RunState::Done);
        assert_eq!(report.documents, 3);
        assert_eq!(report.outcome.created, 3);
    }
}
