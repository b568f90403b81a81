//! CLI argument parsing for the reindexer.
//!
//! Dedicated flags override every other configuration source.

use std::path::PathBuf;

use clap::Parser;

/// Search Reindexer
///
/// Copies records of index-enabled models from the document store into the
/// search index in fixed-size batches.
#[derive(Parser, Debug)]
#[command(name = "reindex")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to the config file
    pub config: PathBuf,

    /// Override config values (KEY=VALUE, nested keys use dots)
    #[arg(short, long = "options", value_name = "KEY=VALUE", num_args = 1..)]
    pub options: Vec<String>,

    /// Models to reindex
    #[arg(short, long, value_name = "NAME", num_args = 1..)]
    pub models: Vec<String>,

    /// List index-enabled models and exit
    #[arg(short, long)]
    pub list_models: bool,

    /// Recreate the index, then reindex every eligible model (ignores --models)
    #[arg(long)]
    pub recreate: bool,

    /// Delete and re-register each model's mapping before reindexing it
    #[arg(long, alias = "delete_mapping")]
    pub delete_mapping: bool,

    /// Records per batch (overrides box_size)
    #[arg(long, value_name = "N")]
    pub boxsize: Option<usize>,

    /// Batches fetched ahead of the writer; enables pipelined mode
    #[arg(long, value_name = "N")]
    pub pipeline: Option<usize>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_models_and_box_size() {
        let cli = Cli::parse_from([
            "reindex",
            "reindex.toml",
            "--models",
            "article",
            "tag",
            "--boxsize",
            "100",
        ]);
        assert_eq!(cli.config, PathBuf::from("reindex.toml"));
        assert_eq!(cli.models, vec!["article", "tag"]);
        assert_eq!(cli.boxsize, Some(100));
        assert!(!cli.recreate);
        assert!(cli.pipeline.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from([
            "reindex",
            "reindex.toml",
            "-l",
            "-o",
            "box_size=10",
            "db_path=/tmp/db",
        ]);
        assert!(cli.list_models);
        assert_eq!(cli.options, vec!["box_size=10", "db_path=/tmp/db"]);
    }

    #[test]
    fn test_cli_delete_mapping_alias() {
        let cli = Cli::parse_from(["reindex", "reindex.toml", "--delete_mapping", "-m", "article"]);
        assert!(cli.delete_mapping);

        let cli = Cli::parse_from(["reindex", "reindex.toml", "--delete-mapping", "-m", "article"]);
        assert!(cli.delete_mapping);
    }

    #[test]
    fn test_cli_recreate_and_pipeline() {
        let cli = Cli::parse_from(["reindex", "reindex.toml", "--recreate", "--pipeline", "4"]);
        assert!(cli.recreate);
        assert_eq!(cli.pipeline, Some(4));
    }

    #[test]
    fn test_cli_requires_config() {
        assert!(Cli::try_parse_from(["reindex", "--recreate"]).is_err());
    }

    #[test]
    fn test_cli_rejects_non_numeric_box_size() {
        assert!(Cli::try_parse_from(["reindex", "reindex.toml", "--boxsize", "many"]).is_err());
    }
}
