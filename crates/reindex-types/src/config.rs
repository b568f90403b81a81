//! Configuration loading for the reindexer.
//!
//! Layered config, later sources win:
//! 1. Built-in defaults
//! 2. Config file given on the command line (required)
//! 3. Environment variables (REINDEX_*, nested keys split on `__`)
//! 4. `key=value` overrides from the command line
//!
//! Dedicated CLI flags (`--boxsize`, `--log-level`, ...) are applied by the
//! caller after this returns.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use config::{Config, Environment, File};
use directories::{BaseDirs, ProjectDirs};
use serde::{Deserialize, Serialize};

use crate::error::TypesError;
use crate::model::{FieldSpec, ModelDescriptor};

/// Default number of records per batch.
pub const DEFAULT_BOX_SIZE: usize = 5000;

/// Tantivy refuses writer budgets below 15MB per thread.
pub const MIN_WRITER_MEMORY_MB: usize = 15;

/// A model declared in the config file.
///
/// Declared models are registered into the document store at bootstrap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelSettings {
    #[serde(default = "default_primary_key")]
    pub primary_key: String,

    /// Models are not indexed unless explicitly enabled.
    #[serde(default)]
    pub index_enabled: bool,

    #[serde(default)]
    pub fields: Vec<FieldSpec>,
}

fn default_primary_key() -> String {
    "id".to_string()
}

/// Main application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path to the RocksDB document store
    #[serde(default = "default_db_path")]
    pub db_path: String,

    /// Path to the search index catalog root
    #[serde(default = "default_index_path")]
    pub index_path: String,

    /// Records fetched and written per batch
    #[serde(default = "default_box_size")]
    pub box_size: usize,

    /// In-flight batches for the pipelined reindexer (0 = sequential)
    #[serde(default)]
    pub pipeline_depth: usize,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Memory budget for each index writer in MB
    #[serde(default = "default_writer_memory_mb")]
    pub writer_memory_mb: usize,

    /// Models declared in configuration, keyed by name
    #[serde(default)]
    pub models: BTreeMap<String, ModelSettings>,
}

fn default_db_path() -> String {
    ProjectDirs::from("", "", "search-reindex")
        .map(|p| p.data_local_dir().join("db"))
        .unwrap_or_else(|| PathBuf::from("./data"))
        .to_string_lossy()
        .to_string()
}

fn default_index_path() -> String {
    ProjectDirs::from("", "", "search-reindex")
        .map(|p| p.data_local_dir().join("index"))
        .unwrap_or_else(|| PathBuf::from("./index"))
        .to_string_lossy()
        .to_string()
}

fn default_box_size() -> usize {
    DEFAULT_BOX_SIZE
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_writer_memory_mb() -> usize {
    50
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            index_path: default_index_path(),
            box_size: default_box_size(),
            pipeline_depth: 0,
            log_level: default_log_level(),
            writer_memory_mb: default_writer_memory_mb(),
            models: BTreeMap::new(),
        }
    }
}

impl Settings {
    /// Load settings from `config_path` with layered precedence.
    ///
    /// `overrides` are `(key, value)` pairs, usually parsed with
    /// [`parse_override`]; nested keys use dots (`models.article.index_enabled`).
    pub fn load(config_path: &Path, overrides: &[(String, String)]) -> Result<Self, TypesError> {
        let mut builder = Config::builder()
            .set_default("db_path", default_db_path())?
            .set_default("index_path", default_index_path())?
            .set_default("box_size", default_box_size() as i64)?
            .set_default("pipeline_depth", 0i64)?
            .set_default("log_level", default_log_level())?
            .set_default("writer_memory_mb", default_writer_memory_mb() as i64)?
            .add_source(File::from(config_path).required(true))
            .add_source(
                Environment::with_prefix("REINDEX")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );

        for (key, value) in overrides {
            builder = builder.set_override(key.as_str(), value.as_str())?;
        }

        let settings: Settings = builder.build()?.try_deserialize()?;
        settings.validate()?;
        Ok(settings)
    }

    /// Check value ranges the rest of the system relies on.
    pub fn validate(&self) -> Result<(), TypesError> {
        if self.box_size == 0 {
            return Err(TypesError::Config("box_size must be > 0".into()));
        }
        if self.writer_memory_mb < MIN_WRITER_MEMORY_MB {
            return Err(TypesError::Config(format!(
                "writer_memory_mb must be >= {}, got {}",
                MIN_WRITER_MEMORY_MB, self.writer_memory_mb
            )));
        }
        for descriptor in self.model_descriptors() {
            descriptor
                .validate()
                .map_err(|e| TypesError::Config(e.to_string()))?;
        }
        Ok(())
    }

    /// Descriptors for the models declared in configuration.
    pub fn model_descriptors(&self) -> Vec<ModelDescriptor> {
        self.models
            .iter()
            .map(|(name, model)| ModelDescriptor {
                name: name.clone(),
                primary_key: model.primary_key.clone(),
                index_enabled: model.index_enabled,
                fields: model.fields.clone(),
            })
            .collect()
    }

    /// Document store path with `~` expanded.
    pub fn expanded_db_path(&self) -> PathBuf {
        expand_home(&self.db_path)
    }

    /// Index catalog path with `~` expanded.
    pub fn expanded_index_path(&self) -> PathBuf {
        expand_home(&self.index_path)
    }
}

/// Parse a `key=value` override.
pub fn parse_override(raw: &str) -> Result<(String, String), TypesError> {
    let (key, value) = raw.split_once('=').ok_or_else(|| {
        TypesError::InvalidInput(format!("override '{}' is not of the form key=value", raw))
    })?;
    let key = key.trim();
    if key.is_empty() {
        return Err(TypesError::InvalidInput(format!(
            "override '{}' has an empty key",
            raw
        )));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn expand_home(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest);
        }
    }
    PathBuf::from(path)
}
