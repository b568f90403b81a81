//! Document store for the search reindexer.
//!
//! Provides RocksDB-backed storage with:
//! - A model registry column family holding typed descriptors
//! - Records keyed by model and primary key, scanned in key order
//! - Counting and offset/limit reads for batch fetching

pub mod column_families;
pub mod db;
pub mod error;
pub mod keys;

pub use db::Storage;
pub use error::StorageError;
pub use keys::{ModelKey, PrimaryKey, RecordKey};
