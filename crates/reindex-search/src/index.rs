//! Index catalog management.
//!
//! The catalog root holds one Tantivy index per model mapping:
//!
//! ```text
//! {root}/catalog.json          created-at marker; absent = no index
//! {root}/mappings/{model}.json mapping the model index was built from
//! {root}/data/{model}/         Tantivy index directory
//! ```
//!
//! Deleting a mapping removes its data directory, so every document indexed
//! under that mapping goes with it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tantivy::{Index, IndexReader, IndexWriter, ReloadPolicy};
use tracing::{debug, info, warn};

use reindex_types::{validate_model_name, Mapping};

use crate::error::SearchError;
use crate::schema::{build_model_schema, ModelSchema};

/// Default memory budget for IndexWriter (50MB)
const DEFAULT_WRITER_MEMORY_MB: usize = 50;

const CATALOG_FILE: &str = "catalog.json";
const MAPPINGS_DIR: &str = "mappings";
const DATA_DIR: &str = "data";

/// Search index configuration
#[derive(Debug, Clone)]
pub struct SearchIndexConfig {
    /// Path to the catalog root
    pub index_path: PathBuf,
    /// Memory budget for writer in MB
    pub writer_memory_mb: usize,
}

impl Default for SearchIndexConfig {
    fn default() -> Self {
        Self {
            index_path: PathBuf::from("./index"),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }
}

impl SearchIndexConfig {
    pub fn new(index_path: impl Into<PathBuf>) -> Self {
        Self {
            index_path: index_path.into(),
            writer_memory_mb: DEFAULT_WRITER_MEMORY_MB,
        }
    }

    pub fn with_memory_mb(mut self, mb: usize) -> Self {
        self.writer_memory_mb = mb;
        self
    }
}

#[derive(Debug, Serialize)]
struct CatalogMeta {
    #[serde(with = "chrono::serde::ts_milliseconds")]
    created_at: DateTime<Utc>,
}

/// The whole search index: a directory of per-model indexes.
#[derive(Debug, Clone)]
pub struct IndexCatalog {
    config: SearchIndexConfig,
}

impl IndexCatalog {
    /// Point at a catalog root. Nothing is created on disk.
    pub fn new(config: SearchIndexConfig) -> Self {
        Self { config }
    }

    /// Get the catalog root path
    pub fn path(&self) -> &Path {
        &self.config.index_path
    }

    /// Check if the catalog has been created
    pub fn exists(&self) -> bool {
        self.config.index_path.join(CATALOG_FILE).exists()
    }

    /// Create an empty catalog. An existing catalog is left untouched.
    pub fn create(&self) -> Result<(), SearchError> {
        if self.exists() {
            debug!(path = ?self.config.index_path, "Index already exists");
            return Ok(());
        }

        fs::create_dir_all(self.config.index_path.join(MAPPINGS_DIR))?;
        fs::create_dir_all(self.config.index_path.join(DATA_DIR))?;
        let meta = CatalogMeta {
            created_at: Utc::now(),
        };
        fs::write(
            self.config.index_path.join(CATALOG_FILE),
            serde_json::to_vec_pretty(&meta)?,
        )?;

        info!(path = ?self.config.index_path, "Created index");
        Ok(())
    }

    /// Delete the catalog with every mapping and document in it.
    pub fn delete(&self) -> Result<(), SearchError> {
        if !self.config.index_path.exists() {
            debug!(path = ?self.config.index_path, "No index to delete");
            return Ok(());
        }
        fs::remove_dir_all(&self.config.index_path)?;
        warn!(path = ?self.config.index_path, "Deleted index");
        Ok(())
    }

    fn ensure_exists(&self) -> Result<(), SearchError> {
        if self.exists() {
            Ok(())
        } else {
            Err(SearchError::IndexNotFound(
                self.config.index_path.display().to_string(),
            ))
        }
    }

    fn mapping_path(&self, model: &str) -> PathBuf {
        self.config
            .index_path
            .join(MAPPINGS_DIR)
            .join(format!("{}.json", model))
    }

    fn data_path(&self, model: &str) -> PathBuf {
        self.config.index_path.join(DATA_DIR).join(model)
    }

    /// The mapping currently registered for a model.
    pub fn mapping(&self, model: &str) -> Result<Option<Mapping>, SearchError> {
        validate_model_name(model)?;
        let path = self.mapping_path(model);
        if !path.exists() {
            return Ok(None);
        }
        Ok(Some(Mapping::from_bytes(&fs::read(path)?)?))
    }

    /// Register a mapping and create its empty index.
    ///
    /// Returns false when the identical mapping is already present. A
    /// different existing mapping is a conflict: delete it first.
    pub fn put_mapping(&self, mapping: &Mapping) -> Result<bool, SearchError> {
        self.ensure_exists()?;

        if let Some(existing) = self.mapping(&mapping.model)? {
            if &existing == mapping {
                debug!(model = %mapping.model, "Mapping unchanged");
                return Ok(false);
            }
            return Err(SearchError::MappingConflict(format!(
                "model '{}' already has a different mapping",
                mapping.model
            )));
        }

        let data_path = self.data_path(&mapping.model);
        if data_path.exists() {
            fs::remove_dir_all(&data_path)?;
        }
        fs::create_dir_all(&data_path)?;
        let schema = build_model_schema(mapping);
        Index::create_in_dir(&data_path, schema.schema().clone())?;

        // The mapping file is written last; its presence marks a usable index.
        fs::write(self.mapping_path(&mapping.model), mapping.to_bytes()?)?;

        info!(model = %mapping.model, fields = mapping.fields.len(), "Put mapping");
        Ok(true)
    }

    /// Remove a model's mapping and every document indexed under it.
    ///
    /// Returns false when there was no mapping.
    pub fn delete_mapping(&self, model: &str) -> Result<bool, SearchError> {
        self.ensure_exists()?;
        validate_model_name(model)?;

        let mapping_path = self.mapping_path(model);
        let data_path = self.data_path(model);
        let existed = mapping_path.exists();

        if existed {
            fs::remove_file(&mapping_path)?;
        }
        if data_path.exists() {
            fs::remove_dir_all(&data_path)?;
        }

        if existed {
            warn!(model, "Deleted mapping and its documents");
        } else {
            debug!(model, "No mapping to delete");
        }
        Ok(existed)
    }

    /// Open the index of a mapped model.
    pub fn open_model(&self, model: &str) -> Result<ModelIndex, SearchError> {
        self.ensure_exists()?;
        let mapping = self
            .mapping(model)?
            .ok_or_else(|| SearchError::MappingNotFound(model.to_string()))?;

        let index = Index::open_in_dir(self.data_path(model))?;
        let schema = ModelSchema::from_schema(index.schema(), &mapping)?;

        debug!(model, "Opened model index");
        Ok(ModelIndex {
            index,
            schema,
            mapping,
            writer_memory_mb: self.config.writer_memory_mb,
        })
    }
}

/// Wrapper for one model's Tantivy index with schema access.
pub struct ModelIndex {
    index: Index,
    schema: ModelSchema,
    mapping: Mapping,
    writer_memory_mb: usize,
}

impl ModelIndex {
    /// Get the model schema
    pub fn schema(&self) -> &ModelSchema {
        &self.schema
    }

    /// Get the mapping this index was built from
    pub fn mapping(&self) -> &Mapping {
        &self.mapping
    }

    /// Create an IndexWriter with configured memory budget
    pub fn writer(&self) -> Result<IndexWriter, SearchError> {
        let memory_budget = self.writer_memory_mb * 1024 * 1024;
        let writer = self.index.writer(memory_budget).map_err(|e| match e {
            tantivy::TantivyError::LockFailure(err, _) => SearchError::IndexLocked(err.to_string()),
            other => SearchError::Tantivy(other),
        })?;
        debug!(memory_mb = self.writer_memory_mb, "Created index writer");
        Ok(writer)
    }

    /// Create a reader pinned to the latest commit
    pub fn reader(&self) -> Result<IndexReader, SearchError> {
        let reader = self
            .index
            .reader_builder()
            .reload_policy(ReloadPolicy::Manual)
            .try_into()?;
        Ok(reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reindex_types::{FieldKind, ModelDescriptor};
    use tempfile::TempDir;

    fn catalog(temp_dir: &TempDir) -> IndexCatalog {
        IndexCatalog::new(SearchIndexConfig::new(temp_dir.path().join("index")))
    }

    fn article_mapping() -> Mapping {
        ModelDescriptor::new("article", "id")
            .with_field("id", FieldKind::I64)
            .with_field("title", FieldKind::Text)
            .mapping()
    }

    #[test]
    fn test_create_and_delete() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog(&temp_dir);
        assert!(!catalog.exists());

        catalog.create().unwrap();
        assert!(catalog.exists());

        // Creating again keeps the existing catalog
        catalog.create().unwrap();
        assert!(catalog.exists());

        catalog.delete().unwrap();
        assert!(!catalog.exists());
        // Deleting a missing catalog is fine
        catalog.delete().unwrap();
    }

    #[test]
    fn test_put_mapping_requires_index() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog(&temp_dir);
        let err = catalog.put_mapping(&article_mapping()).unwrap_err();
        assert!(matches!(err, SearchError::IndexNotFound(_)));
    }

    #[test]
    fn test_put_mapping_idempotent_and_conflicting() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog(&temp_dir);
        catalog.create().unwrap();

        assert!(catalog.put_mapping(&article_mapping()).unwrap());
        assert!(!catalog.put_mapping(&article_mapping()).unwrap());
        assert_eq!(catalog.mapping("article").unwrap(), Some(article_mapping()));

        let changed = ModelDescriptor::new("article", "id")
            .with_field("id", FieldKind::Keyword)
            .mapping();
        let err = catalog.put_mapping(&changed).unwrap_err();
        assert!(matches!(err, SearchError::MappingConflict(_)));
    }

    #[test]
    fn test_delete_mapping_then_put_replacement() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog(&temp_dir);
        catalog.create().unwrap();
        catalog.put_mapping(&article_mapping()).unwrap();

        assert!(catalog.delete_mapping("article").unwrap());
        assert!(!catalog.delete_mapping("article").unwrap());
        assert!(catalog.mapping("article").unwrap().is_none());

        let replacement = ModelDescriptor::new("article", "id")
            .with_field("id", FieldKind::Keyword)
            .mapping();
        assert!(catalog.put_mapping(&replacement).unwrap());
        let index = catalog.open_model("article").unwrap();
        assert_eq!(index.mapping(), &replacement);
    }

    #[test]
    fn test_open_model_without_mapping() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog(&temp_dir);
        catalog.create().unwrap();
        assert!(matches!(
            catalog.open_model("article"),
            Err(SearchError::MappingNotFound(_))
        ));
    }

    #[test]
    fn test_create_writer_and_reader() {
        let temp_dir = TempDir::new().unwrap();
        let catalog = catalog(&temp_dir);
        catalog.create().unwrap();
        catalog.put_mapping(&article_mapping()).unwrap();

        let index = catalog.open_model("article").unwrap();
        let _writer = index.writer().unwrap();
        let _reader = index.reader().unwrap();
    }

    #[test]
    fn test_config_with_memory() {
        let config = SearchIndexConfig::new("/tmp/test").with_memory_mb(100);
        assert_eq!(config.writer_memory_mb, 100);
        assert_eq!(
            SearchIndexConfig::default().writer_memory_mb,
            DEFAULT_WRITER_MEMORY_MB
        );
    }
}
