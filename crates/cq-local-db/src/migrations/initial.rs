//! Empty store to version 1.0.

use crate::schema::{CREATE_APP_INFO, CREATE_SNIPPETS};
use crate::version::SchemaVersion;
use rusqlite::Connection;

/// Creates `snippets` and `app_info` on a store that has neither.
pub struct CreateInitialSchema;

impl super::Migration for CreateInitialSchema {
    fn source_version(&self) -> Option<SchemaVersion> {
        None
    }

    fn target_version(&self) -> SchemaVersion {
        SchemaVersion::v1()
    }

    fn description(&self) -> &str {
        "create snippets and app_info tables"
    }

    fn apply(&self, conn: &Connection) -> crate::Result<()> {
        conn.execute_batch(CREATE_SNIPPETS)?;
        conn.execute_batch(CREATE_APP_INFO)?;
        Ok(())
    }
}
