//! Search Reindexer
//!
//! Moves records of index-enabled models from the document store into the
//! search index.
//!
//! # Usage
//!
//! ```bash
//! reindex reindex.toml --list-models
//! reindex reindex.toml --models article tag [--boxsize N] [--delete-mapping]
//! reindex reindex.toml --recreate [--pipeline N]
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (positional argument)
//! 3. Environment variables (REINDEX_*)
//! 4. `-o KEY=VALUE` overrides
//! 5. CLI flags

use anyhow::{bail, Result};
use clap::Parser;

use reindex_cli::{init_logging, load_settings, run, Cli, Outcome};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let settings = load_settings(&cli)?;
    init_logging(&settings.log_level)?;

    match run(&cli, settings).await? {
        Outcome::Reindexed(summary) if !summary.is_success() => {
            for (model, err) in &summary.failures {
                eprintln!("{model}: {err}");
            }
            bail!(
                "{} of {} models failed",
                summary.failures.len(),
                summary.failures.len() + summary.reports.len()
            );
        }
        _ => {}
    }

    Ok(())
}
