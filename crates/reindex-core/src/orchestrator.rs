//! Drives a reindex pass: count, plan, then fetch and write each batch.
//!
//! A pass over one model moves through
//! `Idle -> Counting -> (EmptySkip | Planning -> Iterating -> Done)`,
//! dropping to `Failed` on the first error. Batches already written stay
//! committed; the model is not rolled back. Passes over several models are
//! independent, so one model failing does not stop the others.

use std::sync::Arc;
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, error, info};

use reindex_types::WriteOutcome;

use crate::error::ReindexError;
use crate::fetcher::DocumentFetcher;
use crate::guard::ModelGuard;
use crate::planner::{plan, BatchPlan};
use crate::progress::{BatchProgress, LoggingProgressCallback, ProgressCallback};
use crate::registry::ModelRegistry;
use crate::store::IndexStore;
use crate::writer::IndexWriter;

/// Configuration for reindex passes.
#[derive(Debug, Clone)]
pub struct ReindexConfig {
    /// Records per batch
    pub box_size: usize,
    /// Batches fetched ahead of the writer; 0 runs sequentially
    pub pipeline_depth: usize,
}

impl Default for ReindexConfig {
    fn default() -> Self {
        Self {
            box_size: reindex_types::DEFAULT_BOX_SIZE,
            pipeline_depth: 0,
        }
    }
}

impl ReindexConfig {
    pub fn with_box_size(mut self, size: usize) -> Self {
        self.box_size = size;
        self
    }

    pub fn with_pipeline_depth(mut self, depth: usize) -> Self {
        self.pipeline_depth = depth;
        self
    }
}

/// Where a model's pass currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    Idle,
    Counting,
    /// No records; nothing planned or written
    EmptySkip,
    Planning,
    Iterating,
    Done,
    Failed,
}

/// Result of one model's pass.
#[derive(Debug, Clone, Serialize)]
pub struct ModelReport {
    pub model: String,
    pub count: u64,
    /// Batches written
    pub batches: usize,
    pub total_batches: usize,
    /// Documents written
    pub documents: u64,
    pub outcome: WriteOutcome,
    pub state: RunState,
    pub elapsed_ms: u64,
}

impl ModelReport {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            count: 0,
            batches: 0,
            total_batches: 0,
            documents: 0,
            outcome: WriteOutcome::default(),
            state: RunState::Idle,
            elapsed_ms: 0,
        }
    }
}

/// Results across every model of a run.
#[derive(Debug, Default)]
pub struct RunSummary {
    pub reports: Vec<ModelReport>,
    pub failures: Vec<(String, ReindexError)>,
}

impl RunSummary {
    pub fn record(&mut self, model: &str, result: Result<ModelReport, ReindexError>) {
        match result {
            Ok(report) => self.reports.push(report),
            Err(e) => self.failures.push((model.to_string(), e)),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn documents(&self) -> u64 {
        self.reports.iter().map(|r| r.documents).sum()
    }
}

/// Per-pass state shared by the sequential and pipelined loops.
pub(crate) struct RunContext {
    pub model: String,
    pub plan: BatchPlan,
    pub progress: BatchProgress,
    pub report: ModelReport,
    started: Instant,
}

impl RunContext {
    fn new(model: &str) -> Self {
        Self {
            model: model.to_string(),
            plan: BatchPlan {
                count: 0,
                limit: 0,
                boxes: 0,
                remainder: 0,
                descriptors: Vec::new(),
            },
            progress: BatchProgress::new(model, 0),
            report: ModelReport::new(model),
            started: Instant::now(),
        }
    }

    pub fn transition(&mut self, state: RunState) {
        debug!(model = %self.model, from = ?self.report.state, to = ?state, "State change");
        self.report.state = state;
    }

    /// Record a written batch and notify the callback.
    pub fn batch_written(
        &mut self,
        documents: usize,
        outcome: &WriteOutcome,
        callback: &dyn ProgressCallback,
    ) {
        self.progress.record_batch(documents, outcome);
        self.report.batches = self.progress.batch;
        self.report.documents = self.progress.documents;
        self.report.outcome = self.progress.outcome;
        callback.on_progress(&self.progress);
    }

    pub fn fail(mut self, err: ReindexError) -> ReindexError {
        self.transition(RunState::Failed);
        error!(
            model = %self.model,
            written = self.report.batches,
            total = self.plan.len(),
            error = %err,
            "Reindex failed"
        );
        err
    }

    pub fn finish(mut self, state: RunState) -> ModelReport {
        self.transition(state);
        self.report.elapsed_ms = self.started.elapsed().as_millis() as u64;
        self.report
    }
}

/// Outcome of counting and planning a model.
pub(crate) enum Prepared {
    Empty(ModelReport),
    Planned(RunContext),
}

/// Runs reindex passes against the index store.
#[derive(Clone)]
pub struct Reindexer {
    registry: Arc<ModelRegistry>,
    index: Arc<dyn IndexStore>,
    guard: ModelGuard,
    config: ReindexConfig,
    callback: Arc<dyn ProgressCallback>,
}

impl Reindexer {
    pub fn new(
        registry: Arc<ModelRegistry>,
        index: Arc<dyn IndexStore>,
        guard: ModelGuard,
        config: ReindexConfig,
    ) -> Self {
        Self {
            registry,
            index,
            guard,
            config,
            callback: Arc::new(LoggingProgressCallback),
        }
    }

    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.callback = callback;
        self
    }

    pub fn config(&self) -> &ReindexConfig {
        &self.config
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub(crate) fn index(&self) -> &Arc<dyn IndexStore> {
        &self.index
    }

    pub(crate) fn guard(&self) -> &ModelGuard {
        &self.guard
    }

    pub(crate) fn callback(&self) -> &dyn ProgressCallback {
        self.callback.as_ref()
    }

    /// Count and plan a model, making sure its mapping exists.
    pub(crate) fn prepare(&self, fetcher: &DocumentFetcher) -> Result<Prepared, ReindexError> {
        let mut ctx = RunContext::new(fetcher.model());

        ctx.transition(RunState::Counting);
        let count = match fetcher.count() {
            Ok(count) => count,
            Err(e) => return Err(ctx.fail(e)),
        };
        ctx.report.count = count;

        if count < 1 {
            info!(model = %ctx.model, "No `{}` records to index", ctx.model);
            return Ok(Prepared::Empty(ctx.finish(RunState::EmptySkip)));
        }

        ctx.transition(RunState::Planning);
        ctx.plan = match plan(count, self.config.box_size, fetcher.sort_key()) {
            Ok(plan) => plan,
            Err(e) => return Err(ctx.fail(e)),
        };
        ctx.progress = BatchProgress::new(&ctx.model, ctx.plan.len());
        ctx.report.total_batches = ctx.plan.len();

        if let Err(e) = self.index.ensure_mapping(fetcher.mapping()) {
            return Err(ctx.fail(e));
        }

        info!(
            model = %ctx.model,
            count,
            batches = ctx.plan.len(),
            box_size = self.config.box_size,
            "Indexing {} `{}` records",
            count,
            ctx.model
        );
        ctx.transition(RunState::Iterating);
        Ok(Prepared::Planned(ctx))
    }

    /// Reindex one model, batch after batch, stopping at the first failure.
    pub fn reindex_model(&self, name: &str) -> Result<ModelReport, ReindexError> {
        let handle = self.registry.get(name)?.clone();
        let _lease = self.guard.acquire(name)?;
        let fetcher = DocumentFetcher::new(handle);
        let writer = IndexWriter::new(Arc::clone(&self.index), name);

        let mut ctx = match self.prepare(&fetcher)? {
            Prepared::Empty(report) => return Ok(report),
            Prepared::Planned(ctx) => ctx,
        };

        let total = ctx.plan.len();
        for descriptor in ctx.plan.descriptors.clone() {
            debug!(
                model = name,
                "Indexing `{}` documents (box: {}/{})",
                name,
                descriptor.index + 1,
                total
            );

            let documents = match fetcher.fetch(&descriptor) {
                Ok(documents) => documents,
                Err(e) => return Err(ctx.fail(e.in_batch(name, descriptor.index + 1, total))),
            };
            ctx.plan.check_fetched(name, &descriptor, documents.len());

            let outcome = match writer.write(&documents) {
                Ok(outcome) => outcome,
                Err(e) => return Err(ctx.fail(e.in_batch(name, descriptor.index + 1, total))),
            };
            ctx.batch_written(documents.len(), &outcome, self.callback());
        }

        let report = ctx.finish(RunState::Done);
        info!(
            model = name,
            documents = report.documents,
            elapsed_ms = report.elapsed_ms,
            "Finished indexing `{}`",
            name
        );
        Ok(report)
    }

    /// Reindex one model using the configured mode.
    pub async fn run_model(&self, name: &str) -> Result<ModelReport, ReindexError> {
        if self.config.pipeline_depth > 0 {
            return self.reindex_model_pipelined(name).await;
        }

        let this = self.clone();
        let name = name.to_string();
        tokio::task::spawn_blocking(move || this.reindex_model(&name))
            .await
            .map_err(|e| ReindexError::Pipeline(e.to_string()))?
    }

    /// Reindex several models in order.
    ///
    /// Every name is resolved before any work starts; an unknown name fails
    /// the whole run. After that each model succeeds or fails on its own.
    pub async fn reindex_models(&self, names: &[String]) -> Result<RunSummary, ReindexError> {
        self.reindex_models_with(names, |_| Ok(())).await
    }

    /// Like [`reindex_models`](Self::reindex_models), running `before` ahead
    /// of each model's pass. A failing `before` fails that model only.
    pub async fn reindex_models_with<F>(
        &self,
        names: &[String],
        mut before: F,
    ) -> Result<RunSummary, ReindexError>
    where
        F: FnMut(&str) -> Result<(), ReindexError>,
    {
        self.registry.validate(names)?;

        let mut summary = RunSummary::default();
        for name in names {
            if let Err(e) = before(name) {
                error!(model = %name, error = %e, "Failed before reindexing");
                summary.record(name, Err(e));
                continue;
            }
            let result = self.run_model(name).await;
            summary.record(name, result);
        }
        Ok(summary)
    }
}
