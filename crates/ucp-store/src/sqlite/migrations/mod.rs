//! Schema migrations.
//!
//! Migrations are embedded with [`include_str!`] and applied in version
//! order, each inside its own transaction. The `schema_version` table
//! records what has been applied, so running the migrator twice is a no-op.

use rusqlite::Connection;
use tracing::{debug, info};

use crate::errors::{Result, StoreError};

struct Migration {
    version: u32,
    description: &'static str,
    sql: &'static str,
}

const MIGRATIONS: &[Migration] = &[Migration {
    version: 1,
    description: "dictionary, rules, provider configs, sessions and hops",
    sql: include_str!("v001_schema.sql"),
}];

/// Apply pending migrations and return how many ran.
pub fn run_migrations(conn: &Connection) -> Result<u32> {
    ensure_version_table(conn)?;
    let current = current_version(conn)?;
    let mut applied = 0;

    for migration in MIGRATIONS {
        if migration.version <= current {
            debug!(version = migration.version, "migration already applied, skipping");
            continue;
        }
        info!(
            version = migration.version,
            description = migration.description,
            "applying migration"
        );
        apply_migration(conn, migration)?;
        applied += 1;
    }

    if applied > 0 {
        info!(applied, "migrations complete");
    }
    Ok(applied)
}

/// Highest applied version, or 0.
pub fn current_version(conn: &Connection) -> Result<u32> {
    conn.query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| row.get(0))
        .map_err(|e| StoreError::Migration {
            message: format!("failed to read schema_version: {e}"),
        })
}

/// Latest version defined in code.
pub fn latest_version() -> u32 {
    MIGRATIONS.last().map_or(0, |m| m.version)
}

fn ensure_version_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
           version     INTEGER PRIMARY KEY,
           applied_at  TEXT    NOT NULL,
           description TEXT
         );",
    )
    .map_err(|e| StoreError::Migration {
        message: format!("failed to create schema_version table: {e}"),
    })
}

fn apply_migration(conn: &Connection, migration: &Migration) -> Result<()> {
    let fail = |e: rusqlite::Error| StoreError::Migration {
        message: format!("migration v{} ({}) failed: {e}", migration.version, migration.description),
    };
    let tx = conn.unchecked_transaction().map_err(fail)?;
    tx.execute_batch(migration.sql).map_err(fail)?;
    let _ = tx
        .execute(
            "INSERT INTO schema_version (version, applied_at, description) VALUES (?1, datetime('now'), ?2)",
            rusqlite::params![migration.version, migration.description],
        )
        .map_err(fail)?;
    tx.commit().map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn conn() -> Connection {
        Connection::open_in_memory().unwrap()
    }

    #[test]
    fn fresh_database_migrates_to_latest() {
        let conn = conn();
        assert_eq!(run_migrations(&conn).unwrap(), latest_version());
        assert_eq!(current_version(&conn).unwrap(), latest_version());

        let tables: Vec<String> = conn
            .prepare("SELECT name FROM sqlite_master WHERE type = 'table' ORDER BY name")
            .unwrap()
            .query_map([], |row| row.get(0))
            .unwrap()
            .collect::<std::result::Result<_, _>>()
            .unwrap();
        for table in ["dictionary_entries", "hops", "provider_configs", "rules", "schema_version", "sessions"] {
            assert!(tables.iter().any(|t| t == table), "missing {table}");
        }
    }

    #[test]
    fn second_run_is_a_no_op() {
        let conn = conn();
        let _ = run_migrations(&conn).unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }
}
