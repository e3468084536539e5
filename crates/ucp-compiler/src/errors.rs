//! Compiler error types.

use thiserror::Error;
use ucp_rules::RuleRejected;

/// Reasons a prompt cannot become a packet.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CompileError {
    /// The prompt is over the configured length limit.
    #[error("prompt exceeds maximum length ({len} > {max} characters)")]
    PromptTooLong {
        /// Prompt length in characters.
        len: usize,
        /// Configured limit.
        max: usize,
    },
    /// Nothing is left to send, even after the REQUEST fallback.
    #[error("prompt has no payload after stripping")]
    EmptyPayload,
    /// A validation or safety rule refused the packet.
    #[error(transparent)]
    RuleRejected(#[from] RuleRejected),
}

/// Result type for compilation.
pub type Result<T> = std::result::Result<T, CompileError>;
