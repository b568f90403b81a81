//! Column family definitions for RocksDB.
//!
//! - models: registered model descriptors (JSON, keyed by name)
//! - records: record bodies keyed by model and primary key

use rocksdb::{ColumnFamilyDescriptor, Options};

/// Column family name for model descriptors
pub const CF_MODELS: &str = "models";

/// Column family name for record bodies
pub const CF_RECORDS: &str = "records";

/// All column family names
pub const ALL_CF_NAMES: &[&str] = &[CF_MODELS, CF_RECORDS];

/// Records are read in long forward scans; compress them.
fn records_options() -> Options {
    let mut opts = Options::default();
    opts.set_compression_type(rocksdb::DBCompressionType::Zstd);
    opts
}

/// Build all column family descriptors
pub fn build_cf_descriptors() -> Vec<ColumnFamilyDescriptor> {
    vec![
        ColumnFamilyDescriptor::new(CF_MODELS, Options::default()),
        ColumnFamilyDescriptor::new(CF_RECORDS, records_options()),
    ]
}
