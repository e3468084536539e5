//! `SQLite` connection pool with WAL mode and foreign keys enabled.
//!
//! The [`PragmaCustomizer`] runs on every new connection so each one gets
//! the same journal mode, foreign-key enforcement and busy timeout.

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::{Result, StoreError};

/// Alias for the connection pool type.
pub type ConnectionPool = Pool<SqliteConnectionManager>;

/// Alias for a pooled connection.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// Pool configuration.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size (default: 4).
    pub pool_size: u32,
    /// Busy timeout in milliseconds (default: 5000).
    pub busy_timeout_ms: u32,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            pool_size: 4,
            busy_timeout_ms: 5_000,
        }
    }
}

impl ConnectionConfig {
    /// Pool sized from `store.maxConnections`.
    pub fn from_settings(settings: &ucp_settings::StoreSettings) -> Self {
        Self {
            pool_size: settings.max_connections.max(1),
            ..Self::default()
        }
    }
}

#[derive(Debug)]
struct PragmaCustomizer {
    busy_timeout_ms: u32,
}

impl r2d2::CustomizeConnection<Connection, rusqlite::Error> for PragmaCustomizer {
    fn on_acquire(&self, conn: &mut Connection) -> std::result::Result<(), rusqlite::Error> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = WAL;\
             PRAGMA busy_timeout = {};\
             PRAGMA foreign_keys = ON;\
             PRAGMA synchronous = NORMAL;",
            self.busy_timeout_ms
        ))
    }
}

fn build(manager: SqliteConnectionManager, pool_size: u32, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let pool = Pool::builder()
        .max_size(pool_size)
        .connection_timeout(Duration::from_secs(5))
        .connection_customizer(Box::new(PragmaCustomizer {
            busy_timeout_ms: config.busy_timeout_ms,
        }))
        .build(manager)?;
    Ok(pool)
}

/// In-memory pool.
///
/// Every in-memory connection is its own database, so the pool holds one.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    build(SqliteConnectionManager::memory(), 1, config)
}

/// File-backed pool; parent directories are created.
pub fn new_file(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| StoreError::Migration {
            message: format!("cannot create {}: {e}", parent.display()),
        })?;
    }
    build(SqliteConnectionManager::file(path), config.pool_size, config)
}

/// Whether foreign keys are enforced on `conn`.
pub fn foreign_keys_enabled(conn: &Connection) -> Result<bool> {
    let on: i32 = conn.query_row("PRAGMA foreign_keys", [], |row| row.get(0))?;
    Ok(on == 1)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_memory_pool_has_one_connection() {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        assert_eq!(pool.max_size(), 1);
        let conn = pool.get().unwrap();
        assert!(foreign_keys_enabled(&conn).unwrap());
    }

    #[test]
    fn file_pool_uses_wal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("ucp.db");
        let pool = new_file(&path, &ConnectionConfig::default()).unwrap();
        let conn = pool.get().unwrap();
        let mode: String = conn.query_row("PRAGMA journal_mode", [], |row| row.get(0)).unwrap();
        assert_eq!(mode, "wal");
        assert!(path.exists());
    }

    #[test]
    fn pool_size_follows_settings() {
        let settings = ucp_settings::StoreSettings {
            max_connections: 2,
            ..Default::default()
        };
        assert_eq!(ConnectionConfig::from_settings(&settings).pool_size, 2);
    }
}
