//! Progress reporting for reindex passes.

use tracing::info;

use reindex_types::WriteOutcome;

/// Progress of one model after a batch has been written.
#[derive(Debug, Clone, Default)]
pub struct BatchProgress {
    pub model: String,
    /// One-based number of the batch just written
    pub batch: usize,
    pub total_batches: usize,
    /// Documents written so far in this pass
    pub documents: u64,
    /// Totals so far in this pass
    pub outcome: WriteOutcome,
}

impl BatchProgress {
    pub fn new(model: impl Into<String>, total_batches: usize) -> Self {
        Self {
            model: model.into(),
            total_batches,
            ..Default::default()
        }
    }

    /// Record a written batch.
    pub fn record_batch(&mut self, documents: usize, outcome: &WriteOutcome) {
        self.batch += 1;
        self.documents += documents as u64;
        self.outcome.merge(outcome);
    }
}

/// Receives progress updates from the orchestrator.
pub trait ProgressCallback: Send + Sync {
    /// Called after each batch is written.
    fn on_progress(&self, progress: &BatchProgress);
}

/// Logs every batch at info level.
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, progress: &BatchProgress) {
        info!(
            model = %progress.model,
            created = progress.outcome.created,
            updated = progress.outcome.updated,
            unchanged = progress.outcome.unchanged,
            "Indexed `{}` documents (box: {}/{})",
            progress.model,
            progress.batch,
            progress.total_batches
        );
    }
}
