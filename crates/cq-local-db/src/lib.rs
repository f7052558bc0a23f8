//! SQLite persistence for CodeQuill snippets.
//!
//! This crate owns the on-disk schema: it detects which schema version a
//! store is at (including stores written before version tracking existed),
//! migrates it forward, and provides row-level snippet operations.

pub mod connection;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod version;

/// Result type for database operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for database operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {message}")]
    Migration { message: String },

    #[error("Migration {from} -> {to} failed: {source}")]
    MigrationStep {
        from: String,
        to: String,
        #[source]
        source: Box<Error>,
    },

    #[error("Unknown schema version: {0}")]
    UnknownSchemaVersion(String),

    #[error("Invalid timestamp: {value}")]
    Timestamp { value: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Generic database error: {0}")]
    Generic(String),
}

impl Error {
    /// Create a new migration error.
    pub fn migration<S: Into<String>>(message: S) -> Self {
        Self::Migration {
            message: message.into(),
        }
    }

    /// Wrap the failure of a single migration step.
    pub fn migration_step<F: Into<String>, T: Into<String>>(from: F, to: T, source: Error) -> Self {
        Self::MigrationStep {
            from: from.into(),
            to: to.into(),
            source: Box::new(source),
        }
    }

    /// Create a new timestamp parsing error.
    pub fn timestamp<S: Into<String>>(value: S) -> Self {
        Self::Timestamp {
            value: value.into(),
        }
    }

    /// Create a new generic database error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// True for errors raised while bringing the schema up to date.
    pub fn is_migration(&self) -> bool {
        matches!(
            self,
            Self::Migration { .. } | Self::MigrationStep { .. } | Self::UnknownSchemaVersion(_)
        )
    }
}

/// Database connection and management.
pub use connection::Database;

/// Schema migrations and version inspection.
pub use migrations::{
    current_version, AppliedMigration, Migration, MigrationPath, MigrationReport,
};

/// Database models and operations.
pub use models::{Snippet, SnippetDraft, SnippetRecord, SnippetStore};

/// Schema version tokens.
pub use version::SchemaVersion;
