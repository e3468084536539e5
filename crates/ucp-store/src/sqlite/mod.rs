//! `SQLite` backend.
//!
//! - **[`connection`]**: `r2d2` pool with WAL mode and foreign keys on
//!   every connection.
//! - **[`migrations`]**: version-tracked schema, embedded at compile time.
//! - **[`repositories`]**: stateless repository structs; each method takes
//!   `&Connection` and runs SQL.

pub mod connection;
pub mod migrations;
pub mod repositories;

pub use connection::{ConnectionConfig, ConnectionPool, PooledConnection, new_file, new_in_memory};
pub use migrations::{current_version, latest_version, run_migrations};

/// `u64` counters are stored as `INTEGER`; values past `i64::MAX` saturate.
pub(crate) fn to_db_int(v: u64) -> i64 {
    i64::try_from(v).unwrap_or(i64::MAX)
}

/// Negative integers read back as 0.
pub(crate) fn from_db_int(v: i64) -> u64 {
    u64::try_from(v).unwrap_or(0)
}

/// Parse a stored enum name.
pub(crate) fn parse_column<T: std::str::FromStr<Err = String>>(value: &str) -> crate::Result<T> {
    value.parse().map_err(crate::StoreError::InvalidData)
}
