//! Store configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Open attempts before the store is reported unavailable.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Pause between open attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreLocation {
    File(PathBuf),
    Memory,
}

/// Settings for opening the snippet store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub location: StoreLocation,
    pub max_attempts: u32,
    pub retry_delay: Duration,
}

impl StoreConfig {
    /// Store at the platform default path (see [`cq_local_db::Database::default_path`]).
    pub fn from_env() -> crate::Result<Self> {
        let path = cq_local_db::Database::default_path()
            .map_err(|e| crate::Error::generic(e.to_string()))?;
        Ok(Self::at_path(path))
    }

    pub fn at_path<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::Memory,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_retry_delay(mut self, retry_delay: Duration) -> Self {
        self.retry_delay = retry_delay;
        self
    }
}
