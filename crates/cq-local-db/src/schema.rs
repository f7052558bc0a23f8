//! Database schema definitions and constants.

// Table names
pub const TABLE_SNIPPETS: &str = "snippets";

/// Key of the `app_info` row that records the schema version.
pub const DB_VERSION_KEY: &str = "db_version";

/// Database file name inside the CodeQuill data directory.
pub const DB_FILE_NAME: &str = "codequill.db";

/// SQL expression producing the current time in the stored timestamp format.
pub const NOW_EXPR: &str = "strftime('%Y-%m-%dT%H:%M:%fZ','now')";

/// chrono format matching [`NOW_EXPR`].
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S%.3fZ";

// Column names for snippets table
pub mod snippets {
    pub const ID: &str = "id";
    pub const FILENAME: &str = "filename";
    pub const LANGUAGE: &str = "language";
    pub const CODE: &str = "code";
    pub const CREATED_AT: &str = "created_at";
    pub const UPDATED_AT: &str = "updated_at";

    /// Columns of the latest schema, in table order.
    pub const ALL: [&str; 6] = [ID, FILENAME, LANGUAGE, CODE, CREATED_AT, UPDATED_AT];
}

/// `snippets` table in its latest shape.
pub const CREATE_SNIPPETS: &str = r#"
CREATE TABLE IF NOT EXISTS snippets (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    language TEXT NOT NULL,
    code TEXT NOT NULL,
    created_at DATETIME DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    updated_at DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
);
"#;

/// Shadow table used while rewriting a legacy `snippets` table.
pub const CREATE_SNIPPETS_TEMP: &str = r#"
CREATE TABLE IF NOT EXISTS snippets_temp (
    id TEXT PRIMARY KEY,
    filename TEXT NOT NULL,
    language TEXT NOT NULL,
    code TEXT NOT NULL,
    created_at DATETIME DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now')),
    updated_at DATETIME NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ','now'))
);
"#;

pub const CREATE_APP_INFO: &str = r#"
CREATE TABLE IF NOT EXISTS app_info (
    key TEXT PRIMARY KEY,
    version TEXT NOT NULL
);
"#;

/// Format a timestamp the way the store writes it.
pub fn format_timestamp(ts: &chrono::DateTime<chrono::Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// Parse a stored timestamp.
///
/// Accepts the store's own `YYYY-MM-DDTHH:MM:SS.sssZ` text, RFC 3339, and the
/// `YYYY-MM-DD HH:MM:SS` text SQLite's `CURRENT_TIMESTAMP` produced in legacy
/// stores.
pub fn parse_timestamp(value: &str) -> crate::Result<chrono::DateTime<chrono::Utc>> {
    if let Ok(ts) = chrono::DateTime::parse_from_rfc3339(value) {
        return Ok(ts.with_timezone(&chrono::Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.fZ", "%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"] {
        if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(naive.and_utc());
        }
    }
    Err(crate::Error::timestamp(value))
}
