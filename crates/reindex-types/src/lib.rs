//! # reindex-types
//!
//! Shared domain types for the search reindexer.
//!
//! - Models: descriptors, typed fields and the index mappings derived from them
//! - Documents: raw records, projected index documents, upsert outcomes
//! - Settings: layered configuration

pub mod config;
pub mod document;
pub mod error;
pub mod model;

pub use config::{parse_override, ModelSettings, Settings, DEFAULT_BOX_SIZE};
pub use document::{IndexDocument, Record, WriteOutcome};
pub use error::TypesError;
pub use model::{
    validate_model_name, FieldKind, FieldSpec, Mapping, ModelDescriptor, RESERVED_FIELD_NAMES,
};
