//! Rule error types.

use thiserror::Error;
use ucp_core::RuleId;

use crate::types::RuleType;

/// Errors raised when loading or editing rules.
#[derive(Debug, Error)]
pub enum RuleError {
    /// Another active rule of the same type has this name.
    #[error("an active {rule_type} rule named '{rule_name}' already exists")]
    DuplicateName {
        /// Rule type.
        rule_type: RuleType,
        /// Conflicting name.
        rule_name: String,
    },
    /// No rule with this ID.
    #[error("rule not found: {0}")]
    NotFound(RuleId),
    /// Rule name is blank.
    #[error("rule name must not be empty")]
    EmptyName,
    /// A `matches` or `replace` pattern failed to compile.
    #[error("rule '{rule_name}' has an invalid pattern: {source}")]
    InvalidPattern {
        /// Rule name.
        rule_name: String,
        /// Regex error.
        #[source]
        source: regex::Error,
    },
    /// The action cannot be used by this rule type.
    #[error("rule '{rule_name}': action '{action}' is not allowed for {rule_type} rules")]
    IncompatibleAction {
        /// Rule name.
        rule_name: String,
        /// Rule type.
        rule_type: RuleType,
        /// Action name.
        action: &'static str,
    },
    /// Rollback target was never recorded.
    #[error("rule {id} has no version {version} to roll back to")]
    UnknownVersion {
        /// Rule ID.
        id: RuleId,
        /// Requested version.
        version: u32,
    },
}

/// Result type for rule operations.
pub type Result<T> = std::result::Result<T, RuleError>;

/// A validation or safety rule refused the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rule '{rule_name}' rejected the request: {reason}")]
pub struct RuleRejected {
    /// Name of the rejecting rule.
    pub rule_name: String,
    /// Reason configured on the rule.
    pub reason: String,
}
