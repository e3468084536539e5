//! Dictionary error types.

use thiserror::Error;
use ucp_core::EntryId;
use ucp_protocol::ProtocolError;

/// Errors raised when loading or editing dictionary entries.
#[derive(Debug, Error)]
pub enum DictionaryError {
    /// Another entry already uses this command name.
    #[error("duplicate command name: {0}")]
    DuplicateName(String),
    /// No entry with this ID.
    #[error("dictionary entry not found: {0}")]
    NotFound(EntryId),
    /// Command name is blank.
    #[error("command name must not be empty")]
    EmptyName,
    /// Entry declares no trigger keywords.
    #[error("entry '{0}' has no trigger keywords")]
    NoKeywords(String),
    /// A keyword or phrase is blank.
    #[error("entry '{0}' has an empty keyword or phrase")]
    EmptyPhrase(String),
    /// A mapped token's key is outside the action's parameter schema.
    #[error("entry '{command}': {token} is not a parameter of {action}")]
    ParamNotInSchema {
        /// Entry command name.
        command: String,
        /// Offending token.
        token: String,
        /// Entry action.
        action: String,
    },
    /// The generic fallback action cannot be bound to keywords.
    #[error("entry '{0}' cannot use the REQUEST action")]
    ReservedAction(String),
    /// Rollback target was never recorded.
    #[error("entry {id} has no version {version} to roll back to")]
    UnknownVersion {
        /// Entry ID.
        id: EntryId,
        /// Requested version.
        version: u32,
    },
    /// Token parsing failed.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Result type for dictionary operations.
pub type Result<T> = std::result::Result<T, DictionaryError>;
