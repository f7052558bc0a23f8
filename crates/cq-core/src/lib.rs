//! Snippet store orchestration for CodeQuill.
//!
//! This crate turns the raw SQLite layer of `cq-local-db` into the store the
//! application talks to: it opens the database with bounded retry, migrates
//! it before anyone can use it, and serves snippet operations from the one
//! resulting connection.

pub mod bootstrap;
pub mod config;
pub mod error;
pub mod service;

/// Core result type used throughout CodeQuill.
pub type Result<T> = std::result::Result<T, Error>;

/// Store error taxonomy.
pub use error::Error;

/// Store configuration.
pub use config::{StoreConfig, StoreLocation, DEFAULT_MAX_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// Connection bootstrap.
pub use bootstrap::{Bootstrapper, MemoryOpener, PathOpener, StoreOpener};

/// Snippet Store API.
pub use service::SnippetService;

/// Snippet types shared with the persistence layer.
pub use cq_local_db::{SchemaVersion, Snippet, SnippetDraft};
