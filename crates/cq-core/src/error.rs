//! Error taxonomy of the snippet store.

use std::sync::Arc;

/// Error type for store operations.
///
/// `StoreUnavailable` and `MigrationFailed` are fatal for the session: once
/// either has been returned, every later call returns it again.
/// `QueryFailed` concerns a single operation and leaves the store usable.
#[derive(Debug, Clone, thiserror::Error)]
pub enum Error {
    #[error("Store unavailable after {attempts} attempt(s): {source}")]
    StoreUnavailable {
        attempts: u32,
        #[source]
        source: Arc<cq_local_db::Error>,
    },

    #[error("Migration failed: {0}")]
    MigrationFailed(#[source] Arc<cq_local_db::Error>),

    #[error("Query failed: {0}")]
    QueryFailed(#[source] Arc<cq_local_db::Error>),

    #[error("Generic error: {0}")]
    Generic(String),
}

impl Error {
    /// Create a store-unavailable error after `attempts` failed opens.
    pub fn store_unavailable(attempts: u32, source: cq_local_db::Error) -> Self {
        Self::StoreUnavailable {
            attempts,
            source: Arc::new(source),
        }
    }

    /// Create a migration failure.
    pub fn migration_failed(source: cq_local_db::Error) -> Self {
        Self::MigrationFailed(Arc::new(source))
    }

    /// Create a failure of a single store operation.
    pub fn query_failed(source: cq_local_db::Error) -> Self {
        Self::QueryFailed(Arc::new(source))
    }

    /// Create a new generic error.
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into())
    }

    /// True when no further store access is possible this session.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::StoreUnavailable { .. } | Self::MigrationFailed(_))
    }
}

impl From<tokio::task::JoinError> for Error {
    fn from(e: tokio::task::JoinError) -> Self {
        Self::generic(format!("Store task failed: {}", e))
    }
}
