//! Pipelined reindexing: fetch ahead of the writer.
//!
//! A blocking fetcher task reads batches in plan order and hands them to the
//! writer through a bounded channel, so at most `pipeline_depth` fetched
//! batches wait in memory. The writer commits them strictly in order. When a
//! write fails the writer cancels the fetcher and drops the channel; batches
//! fetched but not yet written are discarded unwritten.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use reindex_types::IndexDocument;

use crate::error::ReindexError;
use crate::fetcher::DocumentFetcher;
use crate::orchestrator::{ModelReport, Prepared, Reindexer, RunState};
use crate::planner::BatchDescriptor;
use crate::writer::IndexWriter;

/// A batch fetched and waiting to be written.
struct FetchedBatch {
    descriptor: BatchDescriptor,
    documents: Vec<IndexDocument>,
}

impl Reindexer {
    /// Reindex one model with fetching overlapped with writing.
    pub async fn reindex_model_pipelined(&self, name: &str) -> Result<ModelReport, ReindexError> {
        let handle = self.registry().get(name)?.clone();
        let _lease = self.guard().acquire(name)?;
        let fetcher = DocumentFetcher::new(handle);
        let writer = IndexWriter::new(Arc::clone(self.index()), name);
        let depth = self.config().pipeline_depth.max(1);

        let prepared = {
            let this = self.clone();
            let fetcher = fetcher.clone();
            tokio::task::spawn_blocking(move || this.prepare(&fetcher))
                .await
                .map_err(|e| ReindexError::Pipeline(e.to_string()))??
        };
        let mut ctx = match prepared {
            Prepared::Empty(report) => return Ok(report),
            Prepared::Planned(ctx) => ctx,
        };

        let total = ctx.plan.len();
        let (tx, mut rx) = mpsc::channel::<FetchedBatch>(depth);
        let cancel = CancellationToken::new();

        let producer = {
            let cancel = cancel.clone();
            let descriptors = ctx.plan.descriptors.clone();
            let model = name.to_string();
            tokio::task::spawn_blocking(move || -> Result<(), ReindexError> {
                for descriptor in descriptors {
                    if cancel.is_cancelled() {
                        debug!(model = %model, "Fetcher cancelled");
                        break;
                    }
                    let documents = fetcher
                        .fetch(&descriptor)
                        .map_err(|e| e.in_batch(&model, descriptor.index + 1, total))?;
                    if tx
                        .blocking_send(FetchedBatch {
                            descriptor,
                            documents,
                        })
                        .is_err()
                    {
                        debug!(model = %model, "Writer gone, fetcher stopping");
                        break;
                    }
                }
                Ok(())
            })
        };

        let mut write_error = None;
        while let Some(batch) = rx.recv().await {
            let number = batch.descriptor.index + 1;
            ctx.plan.check_fetched(name, &batch.descriptor, batch.documents.len());
            debug!(
                model = name,
                queued = rx.len(),
                "Indexing `{}` documents (box: {}/{})",
                name,
                number,
                total
            );

            let writer = writer.clone();
            let documents = batch.documents;
            let written = tokio::task::spawn_blocking(move || {
                let outcome = writer.write(&documents);
                (documents.len(), outcome)
            })
            .await;

            match written {
                Ok((count, Ok(outcome))) => ctx.batch_written(count, &outcome, self.callback()),
                Ok((_, Err(e))) => {
                    write_error = Some(e.in_batch(name, number, total));
                    break;
                }
                Err(e) => {
                    write_error = Some(ReindexError::Pipeline(e.to_string()));
                    break;
                }
            }
        }

        if let Some(err) = write_error {
            cancel.cancel();
            drop(rx);
            if let Err(e) = producer.await {
                warn!(model = name, error = %e, "Fetcher task did not shut down cleanly");
            }
            return Err(ctx.fail(err));
        }

        match producer.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(ctx.fail(e)),
            Err(e) => return Err(ctx.fail(ReindexError::Pipeline(e.to_string()))),
        }

        let report = ctx.finish(RunState::Done);
        info!(
            model = name,
            documents = report.documents,
            elapsed_ms = report.elapsed_ms,
            depth,
            "Finished indexing `{}`",
            name
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ReindexError;
    use crate::guard::ModelGuard;
    use crate::orchestrator::{ReindexConfig, Reindexer, RunState};
    use crate::registry::ModelRegistry;
    use crate::test_support::{numbered_records, MemoryDocumentStore, MemoryIndexStore};
    use reindex_types::{FieldKind, ModelDescriptor};
    use std::sync::Arc;

    fn setup(count: i64) -> (Arc<MemoryDocumentStore>, Arc<MemoryIndexStore>) {
        let documents = MemoryDocumentStore::new();
        documents.add_model(
            ModelDescriptor::new("article", "id")
                .with_index_enabled(true)
                .with_field("id", FieldKind::I64)
                .with_field("title", FieldKind::Text),
            numbered_records(count),
        );
        (Arc::new(documents), Arc::new(MemoryIndexStore::new()))
    }

    fn reindexer(
        documents: &Arc<MemoryDocumentStore>,
        index: &Arc<MemoryIndexStore>,
        box_size: usize,
        depth: usize,
    ) -> Reindexer {
        let registry = ModelRegistry::load(documents.clone()).unwrap();
        Reindexer::new(
            Arc::new(registry),
            index.clone(),
            ModelGuard::new(),
            ReindexConfig::default()
                .with_box_size(box_size)
                .with_pipeline_depth(depth),
        )
    }

    #[tokio::test]
    async fn test_pipelined_matches_sequential() {
        let (documents, index) = setup(23);
        let report = reindexer(&documents, &index, 5, 2)
            .run_model("article")
            .await
            .unwrap();

        assert_eq!(report.state, RunState::Done);
        assert_eq!(report.batches, 5);
        assert_eq!(report.documents, 23);
        assert_eq!(index.document_count("article"), 23);
        assert_eq!(index.upsert_calls(), 5);
    }

    #[tokio::test]
    async fn test_pipelined_empty_model_skipped() {
        let (documents, index) = setup(0);
        let report = reindexer(&documents, &index, 5, 2)
            .reindex_model_pipelined("article")
            .await
            .unwrap();
        assert_eq!(report.state, RunState::EmptySkip);
        assert!(index.events().is_empty());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_write_failure_stops_later_writes() {
        let (documents, index) = setup(50);
        index.reject_upsert_call(2);

        let err = reindexer(&documents, &index, 5, 3)
            .reindex_model_pipelined("article")
            .await
            .unwrap_err();

        assert!(matches!(err, ReindexError::BatchFailed { batch: 3, .. }));
        // batches 1 and 2 committed, nothing after the failed one was written
        assert_eq!(index.upsert_calls(), 3);
        assert_eq!(index.document_count("article"), 10);
        // fetches may run ahead by the channel depth, never further
        assert!(documents.query_calls() <= 3 + 3 + 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_writes_earlier_batches() {
        let (documents, index) = setup(20);
        documents.fail_query_at_offset(10);

        let err = reindexer(&documents, &index, 5, 4)
            .reindex_model_pipelined("article")
            .await
            .unwrap_err();

        assert!(matches!(err, ReindexError::BatchFailed { batch: 3, .. }));
        assert!(matches!(err.root(), ReindexError::StoreUnavailable(_)));
        assert_eq!(index.document_count("article"), 10);
    }
}
