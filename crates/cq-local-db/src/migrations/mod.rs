//! Database migration management.
//!
//! Each migration implements [`Migration`] and is registered in
//! [`MigrationPath::builtin`]. The path maps every source version to exactly
//! one step; running it walks from the store's current version to the latest
//! one, committing each step together with its version record.

mod initial;
mod legacy_updated_at;

pub use initial::CreateInitialSchema;
pub use legacy_updated_at::AddUpdatedAt;

use crate::schema::DB_VERSION_KEY;
use crate::version::{describe, SchemaVersion};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::{debug, info};

/// A single schema migration step.
pub trait Migration: Send + Sync {
    /// Version this migration upgrades from. `None` means an empty store.
    fn source_version(&self) -> Option<SchemaVersion>;

    /// Version recorded once the migration has been applied.
    fn target_version(&self) -> SchemaVersion;

    /// Human-readable description for logging.
    fn description(&self) -> &str;

    /// Execute the migration. Runs inside a transaction owned by the runner.
    fn apply(&self, conn: &Connection) -> crate::Result<()>;
}

/// One step recorded in a [`MigrationReport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMigration {
    pub from: Option<SchemaVersion>,
    pub to: SchemaVersion,
}

/// Outcome of [`MigrationPath::run`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// Version observed before any step ran.
    pub from: Option<SchemaVersion>,
    /// Version the store is at now.
    pub to: SchemaVersion,
    pub applied: Vec<AppliedMigration>,
}

impl MigrationReport {
    /// True when the store was already at the latest version.
    pub fn is_noop(&self) -> bool {
        self.applied.is_empty()
    }
}

/// Validated mapping from source version to migration step.
pub struct MigrationPath {
    steps: HashMap<Option<SchemaVersion>, Box<dyn Migration>>,
    latest: SchemaVersion,
}

impl std::fmt::Debug for MigrationPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut edges: Vec<_> = self
            .steps
            .iter()
            .map(|(from, step)| (describe(from.as_ref()), step.target_version().to_string()))
            .collect();
        edges.sort();
        f.debug_struct("MigrationPath")
            .field("steps", &edges)
            .field("latest", &self.latest)
            .finish()
    }
}

impl MigrationPath {
    /// Build a path from a set of migrations.
    ///
    /// Rejects duplicate source versions, cycles, and sets that do not
    /// converge on a single latest version.
    pub fn new(migrations: Vec<Box<dyn Migration>>) -> crate::Result<Self> {
        let mut steps: HashMap<Option<SchemaVersion>, Box<dyn Migration>> = HashMap::new();
        for migration in migrations {
            let from = migration.source_version();
            if steps.contains_key(&from) {
                return Err(crate::Error::migration(format!(
                    "duplicate migration from version {}",
                    describe(from.as_ref())
                )));
            }
            steps.insert(from, migration);
        }

        for start in steps.keys() {
            let mut seen = HashSet::new();
            let mut current = start.clone();
            while let Some(step) = steps.get(&current) {
                if !seen.insert(current.clone()) {
                    return Err(crate::Error::migration(format!(
                        "migration cycle through version {}",
                        describe(current.as_ref())
                    )));
                }
                current = Some(step.target_version());
            }
        }

        let terminals: BTreeSet<SchemaVersion> = steps
            .values()
            .map(|step| step.target_version())
            .filter(|target| !steps.contains_key(&Some(target.clone())))
            .collect();
        let mut terminals = terminals.into_iter();
        let latest = match (terminals.next(), terminals.next()) {
            (Some(latest), None) => latest,
            (None, _) => return Err(crate::Error::migration("no migrations registered")),
            (Some(a), Some(b)) => {
                return Err(crate::Error::migration(format!(
                    "migrations end at more than one version ({a}, {b})"
                )))
            }
        };

        Ok(Self { steps, latest })
    }

    /// The migrations shipped with CodeQuill.
    pub fn builtin() -> crate::Result<Self> {
        Self::new(vec![Box::new(CreateInitialSchema), Box::new(AddUpdatedAt)])
    }

    /// Version every successful run ends at.
    pub fn latest(&self) -> &SchemaVersion {
        &self.latest
    }

    /// Bring the store to the latest version.
    ///
    /// Each step and its version record share one transaction, so a failing
    /// step leaves both schema and version exactly as they were.
    pub fn run(&self, conn: &Connection) -> crate::Result<MigrationReport> {
        let start = current_version(conn)?;

        info!(
            current_version = %describe(start.as_ref()),
            target_version = %self.latest,
            "checking database migrations"
        );

        let mut current = start.clone();
        let mut applied = Vec::new();
        while let Some(step) = self.steps.get(&current) {
            let target = step.target_version();
            info!(
                "Running migration {} -> {}: {}",
                describe(current.as_ref()),
                target,
                step.description()
            );

            Self::apply_step(conn, &**step, &target).map_err(|e| {
                crate::Error::migration_step(describe(current.as_ref()), target.to_string(), e)
            })?;

            applied.push(AppliedMigration {
                from: current.clone(),
                to: target.clone(),
            });
            current = Some(target);
        }

        match current {
            Some(version) if version == self.latest => {
                if !applied.is_empty() {
                    info!("Database migration complete, now at version {version}");
                }
                Ok(MigrationReport {
                    from: start,
                    to: version,
                    applied,
                })
            }
            other => Err(crate::Error::UnknownSchemaVersion(describe(other.as_ref()))),
        }
    }

    fn apply_step(
        conn: &Connection,
        step: &dyn Migration,
        target: &SchemaVersion,
    ) -> crate::Result<()> {
        let tx = conn.unchecked_transaction()?;
        step.apply(&tx)?;
        set_version(&tx, target)?;
        tx.commit()?;
        Ok(())
    }
}

/// Determine the store's schema version.
///
/// Reads the `db_version` row from `app_info`. A store without that row but
/// with a readable `snippets` table predates version tracking and reports
/// [`SchemaVersion::LEGACY`]; a store with neither reports `None`.
pub fn current_version(conn: &Connection) -> crate::Result<Option<SchemaVersion>> {
    let recorded = conn
        .query_row(
            "SELECT version FROM app_info WHERE key = ?1",
            params![DB_VERSION_KEY],
            |row| row.get::<_, String>(0),
        )
        .optional();

    match recorded {
        Ok(Some(version)) => return Ok(Some(SchemaVersion::new(version))),
        Ok(None) => debug!("app_info has no db_version row"),
        Err(e) => debug!(error = %e, "app_info is not readable"),
    }

    match conn
        .query_row("SELECT id FROM snippets LIMIT 1", [], |_| Ok(()))
        .optional()
    {
        Ok(_) => {
            info!(
                "app_info table not found, but snippets table exists. Assuming version {}",
                SchemaVersion::LEGACY
            );
            Ok(Some(SchemaVersion::legacy()))
        }
        Err(e) => {
            debug!(error = %e, "snippets table is not readable, store is empty");
            Ok(None)
        }
    }
}

/// Record `version` as the store's schema version.
pub fn set_version(conn: &Connection, version: &SchemaVersion) -> crate::Result<()> {
    conn.execute(
        "INSERT OR REPLACE INTO app_info (key, version) VALUES (?1, ?2)",
        params![DB_VERSION_KEY, version.as_str()],
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Step {
        from: Option<&'static str>,
        to: &'static str,
    }

    impl Migration for Step {
        fn source_version(&self) -> Option<SchemaVersion> {
            self.from.map(SchemaVersion::new)
        }

        fn target_version(&self) -> SchemaVersion {
            SchemaVersion::new(self.to)
        }

        fn description(&self) -> &str {
            "test step"
        }

        fn apply(&self, _conn: &Connection) -> crate::Result<()> {
            Ok(())
        }
    }

    fn step(from: Option<&'static str>, to: &'static str) -> Box<dyn Migration> {
        Box::new(Step { from, to })
    }

    #[test]
    fn builtin_path_ends_at_v1() {
        let path = MigrationPath::builtin().unwrap();
        assert_eq!(path.latest(), &SchemaVersion::v1());
    }

    #[test]
    fn duplicate_source_versions_are_rejected() {
        let err = MigrationPath::new(vec![step(Some("1.0"), "2.0"), step(Some("1.0"), "3.0")])
            .unwrap_err();
        assert!(err.to_string().contains("duplicate migration from version 1.0"));
    }

    #[test]
    fn cycles_are_rejected() {
        let err = MigrationPath::new(vec![
            step(None, "1.0"),
            step(Some("1.0"), "2.0"),
            step(Some("2.0"), "1.0"),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn self_loop_is_a_cycle() {
        let err = MigrationPath::new(vec![step(Some("1.0"), "1.0")]).unwrap_err();
        assert!(err.to_string().contains("cycle"));
    }

    #[test]
    fn diverging_paths_are_rejected() {
        let err = MigrationPath::new(vec![step(None, "1.0"), step(Some("0.0"), "0.5")])
            .unwrap_err();
        assert!(err.to_string().contains("more than one version"));
    }

    #[test]
    fn empty_registry_is_rejected() {
        assert!(MigrationPath::new(Vec::new()).is_err());
    }

    #[test]
    fn converging_paths_share_a_latest_version() {
        let path = MigrationPath::new(vec![
            step(None, "2.0"),
            step(Some("0.0"), "1.0"),
            step(Some("1.0"), "2.0"),
        ])
        .unwrap();
        assert_eq!(path.latest().as_str(), "2.0");
    }

    #[test]
    fn empty_store_has_no_version() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(current_version(&conn).unwrap(), None);
    }

    #[test]
    fn snippets_without_app_info_is_legacy() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE snippets (id TEXT PRIMARY KEY);")
            .unwrap();
        assert_eq!(
            current_version(&conn).unwrap(),
            Some(SchemaVersion::legacy())
        );
    }

    #[test]
    fn app_info_without_version_row_falls_back_to_probe() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(crate::schema::CREATE_APP_INFO).unwrap();
        assert_eq!(current_version(&conn).unwrap(), None);
    }

    #[test]
    fn recorded_version_wins() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(crate::schema::CREATE_APP_INFO).unwrap();
        set_version(&conn, &SchemaVersion::new("4.2")).unwrap();
        set_version(&conn, &SchemaVersion::v1()).unwrap();
        assert_eq!(current_version(&conn).unwrap(), Some(SchemaVersion::v1()));
    }
}
