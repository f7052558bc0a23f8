//! CodeQuill CLI library

pub mod db;
pub mod logging;
pub mod snippet;

use anyhow::Result;
use cq_core::{StoreConfig, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};
use std::path::PathBuf;
use std::time::Duration;

// Re-export CLI types for testing
pub use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "codequill")]
#[command(about = "CodeQuill snippet store")]
#[command(version, author, long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(long, global = true, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options controlling how the store is opened
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// Database file (defaults to $CODEQUILL_HOME/codequill.db or the platform data dir)
    #[arg(long = "db", global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    /// Attempts to open the store before giving up
    #[arg(long, global = true, value_name = "N", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub retries: u32,

    /// Pause between open attempts, in milliseconds
    #[arg(long, global = true, value_name = "MS", default_value_t = DEFAULT_RETRY_DELAY.as_millis() as u64)]
    pub retry_delay_ms: u64,
}

impl StoreArgs {
    /// Build the store configuration from flags and environment.
    pub fn config(&self) -> Result<StoreConfig> {
        let config = match &self.db {
            Some(path) => StoreConfig::at_path(path.clone()),
            None => StoreConfig::from_env()?,
        };
        Ok(config
            .with_max_attempts(self.retries)
            .with_retry_delay(Duration::from_millis(self.retry_delay_ms)))
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// List snippets, most recently updated first
    List(snippet::ListArgs),
    /// Print a snippet
    Get(snippet::GetArgs),
    /// Create or update a snippet
    Save(snippet::SaveArgs),
    /// Delete a snippet
    Delete(snippet::DeleteArgs),
    /// Find snippets by filename or language
    Search(snippet::SearchArgs),
    /// Schema inspection and migration
    Db {
        #[command(subcommand)]
        subcommand: db::DbCommands,
    },
}
