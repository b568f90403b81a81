//! Command implementations for the reindexer binary.
//!
//! Handles:
//! - Settings: config file, `-o` overrides, dedicated flags
//! - Logging setup
//! - Listing, recreating and reindexing models

use anyhow::{Context, Result};
use tracing::{info, warn};

use reindex_core::{Environment, RunSummary};
use reindex_types::{parse_override, Settings};

use crate::cli::Cli;

/// What a run did.
#[derive(Debug)]
pub enum Outcome {
    /// `--list-models`: the eligible model names
    Listed(Vec<String>),
    /// Results of reindexing the requested models
    Reindexed(RunSummary),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        match self {
            Outcome::Listed(_) => true,
            Outcome::Reindexed(summary) => summary.is_success(),
        }
    }
}

/// Load settings for a command line.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let overrides = cli
        .options
        .iter()
        .map(|raw| parse_override(raw))
        .collect::<Result<Vec<_>, _>>()
        .context("Invalid --options value")?;

    let mut settings = Settings::load(&cli.config, &overrides).with_context(|| {
        format!("Failed to load configuration from {}", cli.config.display())
    })?;

    if let Some(box_size) = cli.boxsize {
        settings.box_size = box_size;
    }
    if let Some(depth) = cli.pipeline {
        settings.pipeline_depth = depth;
    }
    if let Some(level) = &cli.log_level {
        settings.log_level = level.clone();
    }

    settings.validate().context("Invalid configuration")?;
    Ok(settings)
}

/// Install the global tracing subscriber. `RUST_LOG` wins over `level`.
pub fn init_logging(level: &str) -> Result<()> {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level)),
        )
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")?;
    Ok(())
}

/// Execute a command line against the stores named by `settings`.
///
/// Unknown model names abort before anything is changed. Once reindexing
/// starts every requested model is attempted; failures are collected in the
/// returned summary.
pub async fn run(cli: &Cli, settings: Settings) -> Result<Outcome> {
    info!("Reindexer starting...");
    info!("  Document store: {}", settings.db_path);
    info!("  Search index: {}", settings.index_path);
    info!("  Box size: {}", settings.box_size);
    if settings.pipeline_depth > 0 {
        info!("  Pipeline depth: {}", settings.pipeline_depth);
    }

    let env = Environment::bootstrap(settings).context("Failed to open stores")?;

    if cli.list_models {
        let models = env.registry().eligible_models();
        for model in &models {
            println!("{model}");
        }
        return Ok(Outcome::Listed(models));
    }

    let models = if cli.recreate {
        if !cli.models.is_empty() {
            warn!("--recreate reindexes every eligible model; ignoring --models");
        }
        env.lifecycle()
            .recreate_index()
            .context("Failed to recreate index")?
    } else {
        cli.models.clone()
    };

    if models.is_empty() {
        warn!("No models to reindex; pass --models or --recreate");
        return Ok(Outcome::Reindexed(RunSummary::default()));
    }

    let lifecycle = env.lifecycle();
    let summary = env
        .reindexer()
        .reindex_models_with(&models, |model| {
            if cli.delete_mapping {
                lifecycle.reset_mapping(model)?;
            }
            Ok(())
        })
        .await?;

    for report in &summary.reports {
        info!(
            model = %report.model,
            state = ?report.state,
            documents = report.documents,
            created = report.outcome.created,
            updated = report.outcome.updated,
            unchanged = report.outcome.unchanged,
            elapsed_ms = report.elapsed_ms,
            "Model done"
        );
    }
    info!(
        succeeded = summary.reports.len(),
        failed = summary.failures.len(),
        documents = summary.documents(),
        "Reindex finished"
    );

    Ok(Outcome::Reindexed(summary))
}
