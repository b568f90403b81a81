//! Search reindexer binary library.
//!
//! Exports CLI parsing and command handlers for the `reindex` binary and its
//! integration tests.

pub mod cli;
pub mod commands;

pub use cli::Cli;
pub use commands::{init_logging, load_settings, run, Outcome};
