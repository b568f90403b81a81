//! In-memory stores with failure injection for orchestrator tests.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use reindex_types::{IndexDocument, Mapping, ModelDescriptor, Record, WriteOutcome};

use crate::error::ReindexError;
use crate::store::{DocumentStore, IndexStore};

/// Records `1..=n` with an integer `id` and a `title`.
pub fn numbered_records(n: i64) -> Vec<Record> {
    (1..=n)
        .map(|id| Record::new().with("id", id).with("title", format!("title {id}")))
        .collect()
}

#[derive(Default)]
pub struct MemoryDocumentStore {
    models: Mutex<BTreeMap<String, (ModelDescriptor, Vec<Record>)>>,
    /// Fail the query whose offset equals this value
    fail_at_offset: Mutex<Option<u64>>,
    count_unavailable: AtomicBool,
    queries: AtomicUsize,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_model(&self, descriptor: ModelDescriptor, records: Vec<Record>) {
        self.models
            .lock()
            .unwrap()
            .insert(descriptor.name.clone(), (descriptor, records));
    }

    pub fn fail_query_at_offset(&self, offset: u64) {
        *self.fail_at_offset.lock().unwrap() = Some(offset);
    }

    pub fn fail_counts(&self) {
        self.count_unavailable.store(true, Ordering::SeqCst);
    }

    pub fn query_calls(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl DocumentStore for MemoryDocumentStore {
    fn registered_types(&self) -> Result<BTreeMap<String, ModelDescriptor>, ReindexError> {
        Ok(self
            .models
            .lock()
            .unwrap()
            .iter()
            .map(|(name, (descriptor, _))| (name.clone(), descriptor.clone()))
            .collect())
    }

    fn get_document_class(&self, name: &str) -> Result<ModelDescriptor, ReindexError> {
        self.models
            .lock()
            .unwrap()
            .get(name)
            .map(|(descriptor, _)| descriptor.clone())
            .ok_or_else(|| ReindexError::UnknownModel(name.to_string()))
    }

    fn count(&self, model: &ModelDescriptor) -> Result<u64, ReindexError> {
        if self.count_unavailable.load(Ordering::SeqCst) {
            return Err(ReindexError::StoreUnavailable("count refused".into()));
        }
        Ok(self
            .models
            .lock()
            .unwrap()
            .get(&model.name)
            .map_or(0, |(_, records)| records.len() as u64))
    }

    fn query(
        &self,
        model: &ModelDescriptor,
        offset: u64,
        limit: usize,
        _sort_key: &str,
    ) -> Result<Vec<Record>, ReindexError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if *self.fail_at_offset.lock().unwrap() == Some(offset) {
            return Err(ReindexError::StoreUnavailable(format!(
                "query at offset {offset} refused"
            )));
        }
        Ok(self
            .models
            .lock()
            .unwrap()
            .get(&model.name)
            .map(|(_, records)| {
                records
                    .iter()
                    .skip(offset as usize)
                    .take(limit)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

/// Stored document: version and content.
type Stored = (u64, IndexDocument);

#[derive(Default)]
pub struct MemoryIndexStore {
    documents: Mutex<BTreeMap<String, BTreeMap<String, Stored>>>,
    mappings: Mutex<BTreeMap<String, Mapping>>,
    /// Reject the n-th upsert call (zero-based)
    reject_call: Mutex<Option<usize>>,
    upserts: AtomicUsize,
    events: Mutex<Vec<String>>,
}

impl MemoryIndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_upsert_call(&self, call: usize) {
        *self.reject_call.lock().unwrap() = Some(call);
    }

    pub fn upsert_calls(&self) -> usize {
        self.upserts.load(Ordering::SeqCst)
    }

    pub fn document_count(&self, model: &str) -> usize {
        self.documents
            .lock()
            .unwrap()
            .get(model)
            .map_or(0, BTreeMap::len)
    }

    pub fn version(&self, model: &str, id: &str) -> Option<u64> {
        self.documents
            .lock()
            .unwrap()
            .get(model)
            .and_then(|docs| docs.get(id))
            .map(|(version, _)| *version)
    }

    pub fn has_mapping(&self, model: &str) -> bool {
        self.mappings.lock().unwrap().contains_key(model)
    }

    /// Structural operations in call order.
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn event(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl IndexStore for MemoryIndexStore {
    fn delete_index(&self) -> Result<(), ReindexError> {
        self.documents.lock().unwrap().clear();
        self.mappings.lock().unwrap().clear();
        self.event("delete_index".into());
        Ok(())
    }

    fn create_index(&self) -> Result<(), ReindexError> {
        self.event("create_index".into());
        Ok(())
    }

    fn put_mapping(&self, mapping: &Mapping) -> Result<(), ReindexError> {
        {
            let mut mappings = self.mappings.lock().unwrap();
            if mappings.get(&mapping.model).is_some_and(|m| m != mapping) {
                return Err(ReindexError::WriteRejected(format!(
                    "mapping conflict for {}",
                    mapping.model
                )));
            }
            mappings.insert(mapping.model.clone(), mapping.clone());
        }
        self.event(format!("put_mapping:{}", mapping.model));
        Ok(())
    }

    fn delete_mapping(&self, model: &str) -> Result<(), ReindexError> {
        self.mappings.lock().unwrap().remove(model);
        self.documents.lock().unwrap().remove(model);
        self.event(format!("delete_mapping:{model}"));
        Ok(())
    }

    fn upsert(
        &self,
        model: &str,
        documents: &[IndexDocument],
    ) -> Result<WriteOutcome, ReindexError> {
        let call = self.upserts.fetch_add(1, Ordering::SeqCst);
        if *self.reject_call.lock().unwrap() == Some(call) {
            return Err(ReindexError::WriteRejected(format!("upsert {call} rejected")));
        }

        let mut outcome = WriteOutcome::default();
        let mut all = self.documents.lock().unwrap();
        let stored = all.entry(model.to_string()).or_default();
        for document in documents {
            match stored.get(&document.id) {
                Some((_, existing)) if existing == document => outcome.unchanged += 1,
                Some((version, _)) => {
                    let next = version + 1;
                    stored.insert(document.id.clone(), (next, document.clone()));
                    outcome.updated += 1;
                }
                None => {
                    stored.insert(document.id.clone(), (1, document.clone()));
                    outcome.created += 1;
                }
            }
        }
        Ok(outcome)
    }
}
