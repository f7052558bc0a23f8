//! Database connection management.

use crate::migrations::{self, MigrationPath, MigrationReport};
use crate::schema::DB_FILE_NAME;
use crate::version::SchemaVersion;
use rusqlite::{Connection, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to the single SQLite connection of a process.
#[derive(Debug, Clone)]
pub struct Database {
    connection: Arc<Mutex<Connection>>,
}

impl Database {
    /// Get the default database path based on CODEQUILL_HOME or platform defaults.
    ///
    /// Priority order:
    /// 1. CODEQUILL_HOME environment variable (custom)
    /// 2. Platform-specific defaults:
    ///    - Linux: `${XDG_DATA_HOME:-~/.local/share}/codequill/codequill.db`
    ///    - macOS: `~/Library/Application Support/codequill/codequill.db`
    ///    - Windows: `%LOCALAPPDATA%\codequill\codequill.db`
    pub fn default_path() -> crate::Result<PathBuf> {
        if let Ok(home) = std::env::var("CODEQUILL_HOME") {
            return Ok(PathBuf::from(home).join(DB_FILE_NAME));
        }

        #[cfg(target_os = "linux")]
        {
            let data_home = match std::env::var("XDG_DATA_HOME") {
                Ok(dir) => PathBuf::from(dir),
                Err(_) => home_dir()?.join(".local").join("share"),
            };
            Ok(data_home.join("codequill").join(DB_FILE_NAME))
        }

        #[cfg(target_os = "macos")]
        {
            Ok(home_dir()?
                .join("Library")
                .join("Application Support")
                .join("codequill")
                .join(DB_FILE_NAME))
        }

        #[cfg(target_os = "windows")]
        {
            let local_appdata = std::env::var("LOCALAPPDATA").map_err(|_| {
                crate::Error::generic("LOCALAPPDATA environment variable not set")
            })?;
            Ok(PathBuf::from(local_appdata).join("codequill").join(DB_FILE_NAME))
        }

        #[cfg(not(any(target_os = "linux", target_os = "macos", target_os = "windows")))]
        {
            Ok(home_dir()?.join(".codequill").join(DB_FILE_NAME))
        }
    }
}

#[cfg(not(target_os = "windows"))]
fn home_dir() -> crate::Result<PathBuf> {
    std::env::var("HOME")
        .map(PathBuf::from)
        .map_err(|_| crate::Error::generic("HOME environment variable not set"))
}

impl Database {
    /// Open a database file and bring its schema up to date.
    ///
    /// If the path doesn't exist, the database will be created.
    pub fn open<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let db = Self::connect(path)?;
        db.migrate()?;
        Ok(db)
    }

    /// Open an in-memory database with the latest schema, for testing.
    pub fn open_in_memory() -> crate::Result<Self> {
        let db = Self::connect_in_memory()?;
        db.migrate()?;
        Ok(db)
    }

    /// Open a database file without touching its schema.
    ///
    /// Missing parent directories are created.
    pub fn connect<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        // Enable WAL mode for better concurrency
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
            row.get::<_, String>(0)
        })?;

        Ok(Self::from_connection(conn))
    }

    /// Open an existing database file read-only, for inspection.
    ///
    /// The file is not created, migrated, or switched to WAL.
    pub fn connect_read_only<P: AsRef<Path>>(path: P) -> crate::Result<Self> {
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )?;
        Ok(Self::from_connection(conn))
    }

    /// Open an empty in-memory database without any schema.
    pub fn connect_in_memory() -> crate::Result<Self> {
        let conn = Connection::open_in_memory()?;
        Ok(Self::from_connection(conn))
    }

    /// Wrap an already open connection.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            connection: Arc::new(Mutex::new(conn)),
        }
    }

    /// Apply the built-in migrations.
    pub fn migrate(&self) -> crate::Result<MigrationReport> {
        self.migrate_with(&MigrationPath::builtin()?)
    }

    /// Apply the migrations of `path`.
    pub fn migrate_with(&self, path: &MigrationPath) -> crate::Result<MigrationReport> {
        let conn = self.lock()?;
        path.run(&conn)
    }

    /// Current schema version, `None` for an empty store.
    pub fn schema_version(&self) -> crate::Result<Option<SchemaVersion>> {
        let conn = self.lock()?;
        migrations::current_version(&conn)
    }

    /// Lock the connection for exclusive use.
    pub fn lock(&self) -> crate::Result<MutexGuard<'_, Connection>> {
        self.connection.lock().map_err(|e| {
            crate::Error::generic(format!("Failed to acquire database lock: {}", e))
        })
    }

    /// Execute a transaction with automatic rollback on error.
    pub fn transaction<F, T>(&self, f: F) -> crate::Result<T>
    where
        F: FnOnce(&Connection) -> crate::Result<T>,
    {
        let conn = self.lock()?;

        let tx = conn.unchecked_transaction()?;
        match f(&tx) {
            Ok(result) => {
                tx.commit()?;
                Ok(result)
            }
            Err(e) => {
                tx.rollback()?;
                Err(e)
            }
        }
    }
}
