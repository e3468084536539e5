//! Error types for the store.

use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// `SQLite` database error.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool error.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// JSON serialization/deserialization error.
    #[error("serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Schema migration failed.
    #[error("migration error: {message}")]
    Migration {
        /// Which migration failed and why.
        message: String,
    },

    /// No record with this ID.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// Collection name.
        kind: &'static str,
        /// Requested ID.
        id: String,
    },

    /// A uniqueness constraint would be violated.
    #[error("conflict: {0}")]
    Conflict(String),

    /// A stored value could not be decoded.
    #[error("invalid stored data: {0}")]
    InvalidData(String),

    /// Provider configuration failed validation.
    #[error(transparent)]
    Config(#[from] ucp_llm::ConfigError),

    /// Stored dictionary entries do not form a valid dictionary.
    #[error(transparent)]
    Dictionary(#[from] ucp_dictionary::DictionaryError),

    /// Stored rules do not form a valid rule set.
    #[error(transparent)]
    Rules(#[from] ucp_rules::RuleError),
}

impl StoreError {
    pub(crate) fn not_found(kind: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound { kind, id: id.into() }
    }
}

/// Convenience type alias for store results.
pub type Result<T> = std::result::Result<T, StoreError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
