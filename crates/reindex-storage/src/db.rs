//! RocksDB wrapper for the document store.
//!
//! Provides:
//! - Database open/close with column family setup
//! - Model registry (descriptors with their `index_enabled` flag)
//! - Record writes keyed by primary key
//! - Counting and offset/limit scans in primary-key order

use std::path::Path;

use rocksdb::{Direction, IteratorMode, Options, WriteBatch, DB};
use tracing::{debug, info};

use reindex_types::{ModelDescriptor, Record};

use crate::column_families::{build_cf_descriptors, CF_MODELS, CF_RECORDS};
use crate::error::StorageError;
use crate::keys::{ModelKey, PrimaryKey, RecordKey};

/// Main storage interface for the document store
pub struct Storage {
    db: DB,
}

impl Storage {
    /// Open storage at the given path, creating if necessary
    pub fn open(path: &Path) -> Result<Self, StorageError> {
        info!("Opening storage at {:?}", path);

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_max_background_jobs(4);

        let db = DB::open_cf_descriptors(&db_opts, path, build_cf_descriptors())?;
        Ok(Self { db })
    }

    fn cf(&self, name: &str) -> Result<&rocksdb::ColumnFamily, StorageError> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StorageError::ColumnFamilyNotFound(name.to_string()))
    }

    // ===== Model registry =====

    /// Register or replace a model descriptor.
    ///
    /// Returns false when an identical descriptor is already registered.
    pub fn register_model(&self, descriptor: &ModelDescriptor) -> Result<bool, StorageError> {
        descriptor.validate()?;

        if let Some(existing) = self.get_model(&descriptor.name)? {
            if &existing == descriptor {
                debug!(model = %descriptor.name, "Model already registered");
                return Ok(false);
            }
            info!(model = %descriptor.name, "Replacing model descriptor");
        } else {
            info!(model = %descriptor.name, index_enabled = descriptor.index_enabled, "Registered model");
        }

        let cf = self.cf(CF_MODELS)?;
        let bytes = serde_json::to_vec(descriptor)?;
        self.db
            .put_cf(cf, ModelKey::new(&descriptor.name).to_bytes(), bytes)?;
        Ok(true)
    }

    /// Look up a model descriptor by name.
    pub fn get_model(&self, name: &str) -> Result<Option<ModelDescriptor>, StorageError> {
        let cf = self.cf(CF_MODELS)?;
        match self.db.get_cf(cf, ModelKey::new(name).to_bytes())? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// All registered models, ordered by name.
    pub fn list_models(&self) -> Result<Vec<ModelDescriptor>, StorageError> {
        let cf = self.cf(CF_MODELS)?;
        let prefix = ModelKey::prefix();
        let mut models = Vec::new();

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(prefix, Direction::Forward));
        for item in iter {
            let (key, value) = item?;
            if !key.starts_with(prefix) {
                break;
            }
            models.push(serde_json::from_slice(&value)?);
        }

        debug!(count = models.len(), "Listed registered models");
        Ok(models)
    }

    // ===== Records =====

    /// Store a record, replacing any record with the same primary key.
    pub fn put_record(
        &self,
        descriptor: &ModelDescriptor,
        record: &Record,
    ) -> Result<(), StorageError> {
        let key = RecordKey::new(
            &descriptor.name,
            PrimaryKey::from_record(record, &descriptor.primary_key)?,
        );
        let cf = self.cf(CF_RECORDS)?;
        self.db.put_cf(cf, key.to_bytes(), record.to_bytes()?)?;
        Ok(())
    }

    /// Store many records in one atomic write batch.
    pub fn put_records(
        &self,
        descriptor: &ModelDescriptor,
        records: &[Record],
    ) -> Result<usize, StorageError> {
        let cf = self.cf(CF_RECORDS)?;
        let mut batch = WriteBatch::default();
        for record in records {
            let key = RecordKey::new(
                &descriptor.name,
                PrimaryKey::from_record(record, &descriptor.primary_key)?,
            );
            batch.put_cf(cf, key.to_bytes(), record.to_bytes()?);
        }
        self.db.write(batch)?;
        debug!(model = %descriptor.name, count = records.len(), "Stored records batch");
        Ok(records.len())
    }

    /// Number of records stored for a model.
    pub fn count_records(&self, model: &str) -> Result<u64, StorageError> {
        let cf = self.cf(CF_RECORDS)?;
        let prefix = RecordKey::prefix(model);
        let mut count = 0u64;

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            let (key, _) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            count += 1;
        }
        Ok(count)
    }

    /// Read up to `limit` records of a model after skipping `offset`,
    /// in primary-key order.
    ///
    /// Every call is an independent scan; no cursor survives between calls.
    pub fn scan_records(
        &self,
        model: &str,
        offset: u64,
        limit: usize,
    ) -> Result<Vec<Record>, StorageError> {
        let cf = self.cf(CF_RECORDS)?;
        let prefix = RecordKey::prefix(model);
        let mut records = Vec::with_capacity(limit.min(1024));
        let mut skipped = 0u64;

        let iter = self
            .db
            .iterator_cf(cf, IteratorMode::From(&prefix, Direction::Forward));
        for item in iter {
            if records.len() >= limit {
                break;
            }
            let (key, value) = item?;
            if !key.starts_with(&prefix) {
                break;
            }
            if skipped < offset {
                skipped += 1;
                continue;
            }
            records.push(Record::from_bytes(&value)?);
        }

        debug!(model, offset, limit, returned = records.len(), "Scanned records");
        Ok(records)
    }

}
