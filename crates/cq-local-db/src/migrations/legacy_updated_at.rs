//! Legacy (unversioned) store to version 1.0.
//!
//! The first release stored snippets without `updated_at` and without any
//! version metadata. The table is rebuilt through a shadow copy so the new
//! column gets its `NOT NULL` constraint.

use crate::schema::{snippets, CREATE_APP_INFO, CREATE_SNIPPETS_TEMP, NOW_EXPR, TABLE_SNIPPETS};
use crate::version::SchemaVersion;
use rusqlite::Connection;
use tracing::info;

/// Rebuilds `snippets` with the 1.0 column set and adds `app_info`.
pub struct AddUpdatedAt;

impl super::Migration for AddUpdatedAt {
    fn source_version(&self) -> Option<SchemaVersion> {
        Some(SchemaVersion::legacy())
    }

    fn target_version(&self) -> SchemaVersion {
        SchemaVersion::v1()
    }

    fn description(&self) -> &str {
        "rebuild snippets with updated_at and add app_info"
    }

    fn apply(&self, conn: &Connection) -> crate::Result<()> {
        let legacy_columns = table_columns(conn, TABLE_SNIPPETS)?;
        let has = |column: &str| legacy_columns.iter().any(|c| c.eq_ignore_ascii_case(column));

        conn.execute_batch("DROP TABLE IF EXISTS snippets_temp;")?;
        conn.execute_batch(CREATE_SNIPPETS_TEMP)?;

        let copy = format!(
            "INSERT INTO snippets_temp ({}) SELECT {} FROM snippets",
            snippets::ALL.join(", "),
            select_list(&has).join(", ")
        );
        let copied = conn.execute(&copy, [])?;

        conn.execute_batch("DROP TABLE snippets;")?;
        conn.execute_batch("ALTER TABLE snippets_temp RENAME TO snippets;")?;
        conn.execute_batch(CREATE_APP_INFO)?;

        info!(rows = copied, "rebuilt snippets table with updated_at column");
        Ok(())
    }
}

/// Expressions producing each 1.0 column from a legacy row.
///
/// Missing text columns get a placeholder, missing or NULL timestamps become
/// the current time, and `updated_at` falls back to `created_at`.
fn select_list(has: &dyn Fn(&str) -> bool) -> Vec<String> {
    let text = |column: &str, fallback: &str| {
        if has(column) {
            format!("COALESCE({column}, '{fallback}')")
        } else {
            format!("'{fallback}'")
        }
    };

    let created_at = if has(snippets::CREATED_AT) {
        format!("COALESCE({}, {NOW_EXPR})", snippets::CREATED_AT)
    } else {
        NOW_EXPR.to_string()
    };

    let mut updated_sources: Vec<&str> = Vec::new();
    if has(snippets::UPDATED_AT) {
        updated_sources.push(snippets::UPDATED_AT);
    }
    if has(snippets::CREATED_AT) {
        updated_sources.push(snippets::CREATED_AT);
    }
    updated_sources.push(NOW_EXPR);
    let updated_at = if updated_sources.len() == 1 {
        NOW_EXPR.to_string()
    } else {
        format!("COALESCE({})", updated_sources.join(", "))
    };

    vec![
        snippets::ID.to_string(),
        text(snippets::FILENAME, "Untitled"),
        text(snippets::LANGUAGE, "plaintext"),
        text(snippets::CODE, ""),
        created_at,
        updated_at,
    ]
}

fn table_columns(conn: &Connection, table: &str) -> crate::Result<Vec<String>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table})"))?;
    let columns = stmt
        .query_map([], |row| row.get::<_, String>(1))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(columns)
}
