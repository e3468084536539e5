//! Runtime error types.

use std::fmt;

use serde::Serialize;
use ucp_ledger::{Hop, LedgerError, Session};
use ucp_llm::{ConfigError, ProviderError};

/// The last hop a failed operation managed to record.
///
/// Everything up to and including this hop is intact and verifiable.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditAnchor {
    /// Hash of the hop.
    pub hash: String,
    /// Its sequence number.
    pub sequence_number: u64,
}

impl AuditAnchor {
    /// Anchor at `hop`.
    pub fn of(hop: &Hop) -> Self {
        Self {
            hash: hop.hash.clone(),
            sequence_number: hop.sequence_number,
        }
    }

    /// Anchor at the session's last hop, if it has one.
    pub fn last_of(session: &Session) -> Option<Self> {
        session.last_hop().map(Self::of)
    }
}

impl fmt::Display for AuditAnchor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let short = self.hash.get(..12).unwrap_or(&self.hash);
        write!(f, "hop {} ({short})", self.sequence_number)
    }
}

/// Errors from [`Executor::execute`](crate::Executor::execute).
///
/// Provider failures are recorded as a terminal EXECUTION hop before they
/// are returned, so their anchor points at that hop.
#[derive(Debug, thiserror::Error)]
pub enum ExecutorError {
    /// The provider did not answer within the configured timeout.
    #[error("provider timed out after {timeout_ms}ms (anchor {anchor})")]
    ProviderTimeout {
        /// Configured timeout.
        timeout_ms: u64,
        /// Terminal hop.
        anchor: AuditAnchor,
    },

    /// Transport failure or non-2xx response.
    #[error("provider error: {source} (anchor {anchor})")]
    Provider {
        /// Classified provider failure.
        source: ProviderError,
        /// Terminal hop.
        anchor: AuditAnchor,
    },

    /// The provider answered with something that is not a completion.
    #[error("malformed provider response: {message} (anchor {anchor})")]
    MalformedResponse {
        /// What was wrong with it.
        message: String,
        /// Terminal hop.
        anchor: AuditAnchor,
    },

    /// The cancellation token fired while the provider call was in flight.
    #[error("execution cancelled (anchor {anchor})")]
    Cancelled {
        /// Terminal hop.
        anchor: AuditAnchor,
    },

    /// A hop or status change was refused.
    #[error("ledger error: {source}")]
    Ledger {
        /// Underlying refusal.
        source: LedgerError,
        /// Last hop recorded before the refusal.
        anchor: Option<AuditAnchor>,
    },

    /// The session is not ready for execution; nothing was recorded.
    #[error("session not ready for execution: {reason}")]
    Precondition {
        /// Which condition failed.
        reason: String,
        /// Last hop of the session as it was.
        anchor: Option<AuditAnchor>,
    },
}

impl ExecutorError {
    /// Last valid hop to audit from.
    pub fn anchor(&self) -> Option<&AuditAnchor> {
        match self {
            Self::ProviderTimeout { anchor, .. }
            | Self::Provider { anchor, .. }
            | Self::MalformedResponse { anchor, .. }
            | Self::Cancelled { anchor } => Some(anchor),
            Self::Ledger { anchor, .. } | Self::Precondition { anchor, .. } => anchor.as_ref(),
        }
    }

    /// Classify a provider failure recorded at `anchor`.
    pub(crate) fn from_provider(error: ProviderError, anchor: AuditAnchor) -> Self {
        match error {
            ProviderError::Timeout { timeout_ms } => Self::ProviderTimeout { timeout_ms, anchor },
            ProviderError::Malformed { message } => Self::MalformedResponse { message, anchor },
            ProviderError::Cancelled => Self::Cancelled { anchor },
            source => Self::Provider { source, anchor },
        }
    }
}

/// Errors from the [`Pipeline`](crate::Pipeline).
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// The provider configuration was rejected before any hop was written.
    #[error("invalid provider configuration: {0}")]
    Config(#[from] ConfigError),

    /// Compilation failed; the session (if any) was closed with no hops.
    #[error("compile error: {0}")]
    Compile(#[from] ucp_compiler::CompileError),

    /// Execution failed after the session was compiled.
    #[error(transparent)]
    Executor(#[from] ExecutorError),

    /// Session bookkeeping was refused.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Persistence failed.
    #[error("store error: {0}")]
    Store(#[from] ucp_store::StoreError),

    /// A session names a provider configuration that no longer exists.
    #[error("provider configuration not found: {0}")]
    ProviderNotFound(String),

    /// The blocking compile task panicked.
    #[error("compile task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl RuntimeError {
    /// Short class name for logs and the CLI exit summary.
    pub fn category(&self) -> &str {
        match self {
            Self::Config(_) => "config",
            Self::Compile(_) => "compile",
            Self::Executor(ExecutorError::ProviderTimeout { .. }) => "timeout",
            Self::Executor(ExecutorError::Cancelled { .. }) => "cancelled",
            Self::Executor(_) => "provider",
            Self::Ledger(_) => "ledger",
            Self::Store(_) => "store",
            Self::ProviderNotFound(_) => "not_found",
            Self::Task(_) => "task",
        }
    }
}

/// Result type for pipeline operations.
pub type Result<T> = std::result::Result<T, RuntimeError>;
