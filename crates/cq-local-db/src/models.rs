//! Database models and persistence operations.

use crate::schema::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use rusqlite::{params, OptionalExtension, Row};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A stored code snippet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snippet {
    pub id: String,
    pub filename: String,
    pub language: String,
    pub code: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Snippet content as submitted for saving. Timestamps are assigned by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnippetDraft {
    pub id: String,
    pub filename: String,
    pub language: String,
    pub code: String,
}

impl SnippetDraft {
    /// Filename given to snippets the user has not named yet.
    pub const UNTITLED: &'static str = "Untitled";

    /// Draft for a new snippet with a fresh UUID.
    pub fn new(
        filename: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self::with_id(uuid::Uuid::new_v4().to_string(), filename, language, code)
    }

    /// Empty, unnamed snippet in `language`.
    pub fn untitled(language: impl Into<String>) -> Self {
        Self::new(Self::UNTITLED, language, "")
    }

    /// Draft for an existing or caller-chosen id.
    pub fn with_id(
        id: impl Into<String>,
        filename: impl Into<String>,
        language: impl Into<String>,
        code: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            filename: filename.into(),
            language: language.into(),
            code: code.into(),
        }
    }
}

impl From<&Snippet> for SnippetDraft {
    fn from(snippet: &Snippet) -> Self {
        Self::with_id(
            snippet.id.clone(),
            snippet.filename.clone(),
            snippet.language.clone(),
            snippet.code.clone(),
        )
    }
}

/// Raw `snippets` row, timestamps as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnippetRecord {
    pub id: String,
    pub filename: String,
    pub language: String,
    pub code: String,
    pub created_at: Option<String>,
    pub updated_at: String,
}

impl SnippetRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            filename: row.get(1)?,
            language: row.get(2)?,
            code: row.get(3)?,
            created_at: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }

    /// Convert to a [`Snippet`].
    ///
    /// A missing `created_at` (possible only in rows written outside the
    /// store) is reported as the `updated_at` time.
    pub fn to_snippet(&self) -> crate::Result<Snippet> {
        let updated_at = parse_timestamp(&self.updated_at)?;
        let created_at = match &self.created_at {
            Some(value) => parse_timestamp(value)?,
            None => updated_at,
        };

        Ok(Snippet {
            id: self.id.clone(),
            filename: self.filename.clone(),
            language: self.language.clone(),
            code: self.code.clone(),
            created_at,
            updated_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, filename, language, code, created_at, updated_at FROM snippets";

/// Database operations for snippets.
pub struct SnippetStore<'a> {
    conn: &'a rusqlite::Connection,
}

impl<'a> SnippetStore<'a> {
    pub fn new(conn: &'a rusqlite::Connection) -> Self {
        Self { conn }
    }

    /// All snippets, most recently updated first.
    pub fn list(&self) -> crate::Result<Vec<Snippet>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{SELECT_COLUMNS} ORDER BY updated_at DESC, id ASC"))?;
        let records = stmt.query_map(params![], SnippetRecord::from_row)?;
        collect_readable(records)
    }

    /// Snippets whose filename or language contains `query`, ignoring ASCII case.
    pub fn search(&self, query: &str) -> crate::Result<Vec<Snippet>> {
        let query = query.trim();
        if query.is_empty() {
            return self.list();
        }

        // SQLite's lower() only folds ASCII, so the query must match that.
        let pattern = format!("%{}%", escape_like(&query.to_ascii_lowercase()));
        let mut stmt = self.conn.prepare(&format!(
            "{SELECT_COLUMNS} \
             WHERE lower(filename) LIKE ?1 ESCAPE '\\' OR lower(language) LIKE ?1 ESCAPE '\\' \
             ORDER BY updated_at DESC, id ASC"
        ))?;
        let records = stmt.query_map(params![pattern], SnippetRecord::from_row)?;
        collect_readable(records)
    }

    /// Get a snippet by ID.
    pub fn get(&self, id: &str) -> crate::Result<Option<Snippet>> {
        let record = self
            .conn
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                SnippetRecord::from_row,
            )
            .optional()?;

        record.map(|r| r.to_snippet()).transpose()
    }

    /// Insert or update a snippet.
    ///
    /// `updated_at` is set to `now` on every call; `created_at` only when the
    /// id is new. If `now` does not lie after the newest stored `updated_at`
    /// (same millisecond, or a clock step back), one millisecond past that
    /// value is written instead, so the last save always lists first.
    /// Returns the `updated_at` that was written.
    pub fn save(&self, draft: &SnippetDraft, now: DateTime<Utc>) -> crate::Result<DateTime<Utc>> {
        let mut stamp = now.trunc_subsecs(3);
        if let Some(latest) = self.latest_update()? {
            if stamp <= latest {
                stamp = latest + Duration::milliseconds(1);
            }
        }

        let now = format_timestamp(&stamp);
        self.conn.execute(
            r#"
            INSERT INTO snippets (id, filename, language, code, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(id) DO UPDATE SET
                filename = excluded.filename,
                language = excluded.language,
                code = excluded.code,
                updated_at = excluded.updated_at
            "#,
            params![draft.id, draft.filename, draft.language, draft.code, now],
        )?;
        Ok(stamp)
    }

    /// Newest stored `updated_at`, if it parses.
    fn latest_update(&self) -> crate::Result<Option<DateTime<Utc>>> {
        let latest: Option<String> = self
            .conn
            .query_row("SELECT MAX(updated_at) FROM snippets", params![], |row| row.get(0))?;
        Ok(latest.and_then(|value| parse_timestamp(&value).ok()))
    }

    /// Delete a snippet. Returns whether a row was removed.
    pub fn delete(&self, id: &str) -> crate::Result<bool> {
        let removed = self
            .conn
            .execute("DELETE FROM snippets WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Number of stored snippets.
    pub fn count(&self) -> crate::Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM snippets", params![], |row| row.get(0))?;
        Ok(count as usize)
    }
}

/// Convert rows, skipping any whose timestamps cannot be read.
fn collect_readable<I>(records: I) -> crate::Result<Vec<Snippet>>
where
    I: Iterator<Item = rusqlite::Result<SnippetRecord>>,
{
    let mut snippets = Vec::new();
    for record in records {
        let record = record?;
        match record.to_snippet() {
            Ok(snippet) => snippets.push(snippet),
            Err(e) => warn!(id = %record.id, error = %e, "skipping unreadable snippet row"),
        }
    }
    Ok(snippets)
}

fn escape_like(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Database;
    use chrono::{Duration, TimeZone};

    fn t(secs: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap() + Duration::seconds(secs)
    }

    #[test]
    fn save_inserts_then_updates_in_place() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        store
            .save(&SnippetDraft::with_id("a", "x.js", "javascript", "1+1"), t(0))
            .unwrap();
        store
            .save(&SnippetDraft::with_id("a", "y.js", "javascript", "2+2"), t(5))
            .unwrap();

        let snippet = store.get("a").unwrap().unwrap();
        assert_eq!(snippet.filename, "y.js");
        assert_eq!(snippet.code, "2+2");
        assert_eq!(snippet.created_at, t(0));
        assert_eq!(snippet.updated_at, t(5));
        assert_eq!(store.count().unwrap(), 1);
    }

    #[test]
    fn list_orders_by_updated_at_descending() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        store.save(&SnippetDraft::with_id("a", "a.rs", "rust", ""), t(0)).unwrap();
        store.save(&SnippetDraft::with_id("b", "b.rs", "rust", ""), t(1)).unwrap();
        store.save(&SnippetDraft::with_id("c", "c.rs", "rust", ""), t(2)).unwrap();
        store.save(&SnippetDraft::with_id("a", "a.rs", "rust", "fn main() {}"), t(3)).unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "c", "b"]);
    }

    #[test]
    fn search_matches_filename_or_language_case_insensitively() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        store.save(&SnippetDraft::with_id("1", "Main.RS", "rust", ""), t(0)).unwrap();
        store.save(&SnippetDraft::with_id("2", "index.html", "html", ""), t(1)).unwrap();
        store.save(&SnippetDraft::with_id("3", "notes_1.md", "Markdown", ""), t(2)).unwrap();

        let ids = |q: &str| -> Vec<String> {
            store.search(q).unwrap().into_iter().map(|s| s.id).collect()
        };
        assert_eq!(ids("main"), vec!["1"]);
        assert_eq!(ids("MARK"), vec!["3"]);
        assert_eq!(ids("_1"), vec!["3"]);
        assert_eq!(ids("%"), Vec::<String>::new());
        assert_eq!(ids("  "), vec!["3", "2", "1"]);
    }

    #[test]
    fn saves_at_the_same_instant_keep_save_order() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        let first = store.save(&SnippetDraft::with_id("b", "b.rs", "rust", ""), t(0)).unwrap();
        let second = store.save(&SnippetDraft::with_id("a", "a.rs", "rust", ""), t(0)).unwrap();
        assert_eq!(first, t(0));
        assert_eq!(second, t(0) + Duration::milliseconds(1));

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["a", "b"]);

        // Re-saving with a clock that went backwards still advances.
        let third = store.save(&SnippetDraft::with_id("b", "b.rs", "rust", "x"), t(-10)).unwrap();
        let b = store.get("b").unwrap().unwrap();
        assert_eq!(b.updated_at, third);
        assert!(b.updated_at > second);
        assert_eq!(b.created_at, t(0));
    }

    #[test]
    fn search_keeps_non_ascii_characters_as_typed() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        store.save(&SnippetDraft::with_id("1", "Éclair.md", "markdown", ""), t(0)).unwrap();
        store.save(&SnippetDraft::with_id("2", "Résumé.txt", "plaintext", ""), t(1)).unwrap();

        let ids = |q: &str| -> Vec<String> {
            store.search(q).unwrap().into_iter().map(|s| s.id).collect()
        };
        assert_eq!(ids("Éclair"), vec!["1"]);
        assert_eq!(ids("ÉCLAIR"), vec!["1"]);
        assert_eq!(ids("RéSUMé"), vec!["2"]);
    }

    #[test]
    fn unreadable_rows_are_skipped_when_listing() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        store.save(&SnippetDraft::with_id("good", "a.rs", "rust", ""), t(0)).unwrap();
        conn.execute(
            "INSERT INTO snippets (id, filename, language, code, created_at, updated_at) \
             VALUES ('bad', 'b.rs', 'rust', '', 'not a time', 'not a time')",
            params![],
        )
        .unwrap();

        let ids: Vec<_> = store.list().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["good"]);
        let ids: Vec<_> = store.search("rs").unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["good"]);
        assert!(matches!(store.get("bad"), Err(crate::Error::Timestamp { .. })));
    }

    #[test]
    fn delete_reports_whether_a_row_was_removed() {
        let db = Database::open_in_memory().unwrap();
        let conn = db.lock().unwrap();
        let store = SnippetStore::new(&conn);

        store.save(&SnippetDraft::with_id("a", "a", "text", ""), t(0)).unwrap();
        assert!(store.delete("a").unwrap());
        assert!(!store.delete("a").unwrap());
        assert!(store.get("a").unwrap().is_none());
    }

    #[test]
    fn new_drafts_get_distinct_uuids() {
        let a = SnippetDraft::new("a.rs", "rust", "");
        let b = SnippetDraft::untitled("rust");
        assert_ne!(a.id, b.id);
        assert!(uuid::Uuid::parse_str(&a.id).is_ok());
        assert_eq!(b.filename, SnippetDraft::UNTITLED);
        assert!(b.code.is_empty());
    }

    #[test]
    fn missing_created_at_reads_as_updated_at() {
        let record = SnippetRecord {
            id: "a".into(),
            filename: "a".into(),
            language: "text".into(),
            code: String::new(),
            created_at: None,
            updated_at: "2024-01-01 00:00:05".into(),
        };
        let snippet = record.to_snippet().unwrap();
        assert_eq!(snippet.created_at, t(5));
    }
}
