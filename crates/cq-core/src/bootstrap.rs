//! Connection bootstrap with bounded retry.

use crate::config::{StoreConfig, StoreLocation};
use cq_local_db::{Database, MigrationReport};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{error, info, warn};

/// Opens the underlying store. Called once per bootstrap attempt.
pub trait StoreOpener: Send + Sync {
    fn open(&self) -> cq_local_db::Result<Database>;

    /// Where the store lives, for log messages.
    fn describe(&self) -> String;
}

/// Opens a database file, creating it if needed.
#[derive(Debug, Clone)]
pub struct PathOpener {
    path: PathBuf,
}

impl PathOpener {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        Self { path: path.into() }
    }
}

impl StoreOpener for PathOpener {
    fn open(&self) -> cq_local_db::Result<Database> {
        Database::connect(&self.path)
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

/// Opens a fresh in-memory database.
#[derive(Debug, Clone, Default)]
pub struct MemoryOpener;

impl StoreOpener for MemoryOpener {
    fn open(&self) -> cq_local_db::Result<Database> {
        Database::connect_in_memory()
    }

    fn describe(&self) -> String {
        ":memory:".to_string()
    }
}

/// Produces the single migrated connection of the process.
///
/// The first call to [`Bootstrapper::connection`] opens the store (retrying
/// up to `max_attempts` times) and runs the migrations; every later call
/// returns the same handle, or the same fatal error.
pub struct Bootstrapper {
    opener: Arc<dyn StoreOpener>,
    max_attempts: u32,
    retry_delay: Duration,
    state: OnceCell<crate::Result<Ready>>,
}

#[derive(Clone)]
struct Ready {
    db: Database,
    report: MigrationReport,
}

impl Bootstrapper {
    pub fn new(config: &StoreConfig) -> Self {
        let opener: Arc<dyn StoreOpener> = match &config.location {
            StoreLocation::File(path) => Arc::new(PathOpener::new(path.clone())),
            StoreLocation::Memory => Arc::new(MemoryOpener),
        };
        Self::with_opener(opener, config)
    }

    /// Bootstrap through a custom opener; location in `config` is ignored.
    pub fn with_opener(opener: Arc<dyn StoreOpener>, config: &StoreConfig) -> Self {
        Self {
            opener,
            max_attempts: config.max_attempts.max(1),
            retry_delay: config.retry_delay,
            state: OnceCell::new(),
        }
    }

    /// The migrated database, bootstrapping it on first use.
    pub async fn connection(&self) -> crate::Result<Database> {
        self.ready().await.map(|ready| ready.db)
    }

    /// What the bootstrap migration did, bootstrapping on first use.
    pub async fn migration_report(&self) -> crate::Result<MigrationReport> {
        self.ready().await.map(|ready| ready.report)
    }

    /// True once a migrated connection is available.
    pub fn is_ready(&self) -> bool {
        matches!(self.state.get(), Some(Ok(_)))
    }

    async fn ready(&self) -> crate::Result<Ready> {
        self.state.get_or_init(|| self.bootstrap()).await.clone()
    }

    async fn bootstrap(&self) -> crate::Result<Ready> {
        let db = self.open_with_retry().await?;

        let migrating = db.clone();
        let report = tokio::task::spawn_blocking(move || migrating.migrate())
            .await
            .unwrap_or_else(|e| Err(cq_local_db::Error::migration(e.to_string())))
            .map_err(|e| {
                error!(error = %e, "database migration failed");
                crate::Error::migration_failed(e)
            })?;

        info!(
            store = %self.opener.describe(),
            version = %report.to,
            applied = report.applied.len(),
            "store ready"
        );
        Ok(Ready { db, report })
    }

    async fn open_with_retry(&self) -> crate::Result<Database> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let opener = Arc::clone(&self.opener);
            match tokio::task::spawn_blocking(move || opener.open()).await? {
                Ok(db) => return Ok(db),
                Err(e) if attempt < self.max_attempts => {
                    warn!(
                        attempt,
                        max_attempts = self.max_attempts,
                        error = %e,
                        "failed to open store {}, retrying",
                        self.opener.describe()
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => {
                    error!(
                        attempts = attempt,
                        error = %e,
                        "giving up on store {}",
                        self.opener.describe()
                    );
                    return Err(crate::Error::store_unavailable(attempt, e));
                }
            }
        }
    }
}
