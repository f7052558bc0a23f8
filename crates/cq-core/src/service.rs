//! Snippet Store API.

use crate::bootstrap::{Bootstrapper, StoreOpener};
use crate::config::StoreConfig;
use chrono::Utc;
use cq_local_db::{Database, MigrationReport, SchemaVersion, Snippet, SnippetDraft, SnippetStore};
use std::sync::Arc;
use tracing::debug;

/// Snippet operations over the bootstrapped store.
///
/// Every operation waits for the bootstrap to finish first. Construct one
/// per process and share it by reference.
pub struct SnippetService {
    bootstrap: Bootstrapper,
}

impl SnippetService {
    pub fn new(config: &StoreConfig) -> Self {
        Self {
            bootstrap: Bootstrapper::new(config),
        }
    }

    pub fn with_opener(opener: Arc<dyn StoreOpener>, config: &StoreConfig) -> Self {
        Self {
            bootstrap: Bootstrapper::with_opener(opener, config),
        }
    }

    /// Open and migrate the store now instead of on first use.
    pub async fn ready(&self) -> crate::Result<MigrationReport> {
        self.bootstrap.migration_report().await
    }

    /// All snippets, most recently updated first.
    pub async fn list(&self) -> crate::Result<Vec<Snippet>> {
        self.with_database(|db| {
            let conn = db.lock()?;
            SnippetStore::new(&conn).list()
        })
        .await
    }

    /// Snippets whose filename or language contains `query`.
    pub async fn search(&self, query: &str) -> crate::Result<Vec<Snippet>> {
        let query = query.to_string();
        self.with_database(move |db| {
            let conn = db.lock()?;
            SnippetStore::new(&conn).search(&query)
        })
        .await
    }

    pub async fn get(&self, id: &str) -> crate::Result<Option<Snippet>> {
        let id = id.to_string();
        self.with_database(move |db| {
            let conn = db.lock()?;
            SnippetStore::new(&conn).get(&id)
        })
        .await
    }

    /// Insert the snippet, or update it in place if its id exists.
    pub async fn save(&self, draft: SnippetDraft) -> crate::Result<()> {
        let now = Utc::now();
        debug!(id = %draft.id, "saving snippet");
        self.with_database(move |db| {
            db.transaction(|conn| SnippetStore::new(conn).save(&draft, now).map(|_| ()))
        })
        .await
    }

    /// Save a new snippet under a fresh id and return it.
    pub async fn create(
        &self,
        filename: &str,
        language: &str,
        code: &str,
    ) -> crate::Result<Snippet> {
        let draft = SnippetDraft::new(filename, language, code);
        let now = Utc::now();
        self.with_database(move |db| {
            db.transaction(|conn| {
                let store = SnippetStore::new(conn);
                store.save(&draft, now)?;
                store.get(&draft.id)?.ok_or_else(|| {
                    cq_local_db::Error::generic(format!("snippet {} vanished after insert", draft.id))
                })
            })
        })
        .await
    }

    /// Delete a snippet. Deleting an unknown id is not an error.
    pub async fn delete(&self, id: &str) -> crate::Result<()> {
        let id = id.to_string();
        self.with_database(move |db| {
            let conn = db.lock()?;
            let removed = SnippetStore::new(&conn).delete(&id)?;
            debug!(id = %id, removed, "deleted snippet");
            Ok(())
        })
        .await
    }

    /// Schema version of the store, for the app-info screen.
    pub async fn schema_version(&self) -> crate::Result<Option<SchemaVersion>> {
        self.with_database(|db| db.schema_version()).await
    }

    async fn with_database<T, F>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Database) -> cq_local_db::Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = self.bootstrap.connection().await?;
        tokio::task::spawn_blocking(move || f(&db))
            .await?
            .map_err(crate::Error::query_failed)
    }
}
