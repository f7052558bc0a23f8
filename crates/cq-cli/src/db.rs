//! Schema maintenance commands

use anyhow::{Context, Result};
use clap::Subcommand;
use cq_core::{SnippetService, StoreConfig, StoreLocation};
use cq_local_db::{version::describe, Database, MigrationPath};

/// Database-related commands
#[derive(Subcommand, Debug)]
pub enum DbCommands {
    /// Show the store's schema version without changing it
    Version,
    /// Bring the store's schema up to date
    Migrate,
}

impl DbCommands {
    pub async fn run(self, config: &StoreConfig, service: &SnippetService) -> Result<()> {
        match self {
            DbCommands::Version => show_version(config),
            DbCommands::Migrate => migrate(service).await,
        }
    }
}

fn show_version(config: &StoreConfig) -> Result<()> {
    let latest = MigrationPath::builtin()?.latest().clone();

    let current = match &config.location {
        StoreLocation::File(path) if !path.exists() => {
            println!("store:   {} (not created yet)", path.display());
            None
        }
        StoreLocation::File(path) => {
            println!("store:   {}", path.display());
            Database::connect_read_only(path)
                .and_then(|db| db.schema_version())
                .with_context(|| format!("Failed to inspect {}", path.display()))?
        }
        StoreLocation::Memory => None,
    };

    println!("current: {}", describe(current.as_ref()));
    println!("latest:  {}", latest);
    Ok(())
}

async fn migrate(service: &SnippetService) -> Result<()> {
    let report = service.ready().await.context("Failed to migrate store")?;

    if report.is_noop() {
        println!("Already at version {}", report.to);
    } else {
        for step in &report.applied {
            println!("Migrated {} -> {}", describe(step.from.as_ref()), step.to);
        }
    }
    Ok(())
}
