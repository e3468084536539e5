//! Provider and configuration errors.

/// Result type alias for provider operations.
pub type ProviderResult<T> = Result<T, ProviderError>;

/// Errors from a provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// Connection or transport failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// No response within the configured limit.
    #[error("provider timed out after {timeout_ms}ms")]
    Timeout {
        /// Limit that elapsed.
        timeout_ms: u64,
    },

    /// Provider answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error description.
        message: String,
        /// Provider-specific error code.
        code: Option<String>,
        /// Whether the request could be retried.
        retryable: bool,
    },

    /// 2xx response that does not have the expected shape.
    #[error("malformed response: {message}")]
    Malformed {
        /// What was wrong.
        message: String,
    },

    /// Caller cancelled the call.
    #[error("provider call cancelled")]
    Cancelled,

    /// Provider-specific error.
    #[error("{message}")]
    Other {
        /// Error description.
        message: String,
    },
}

impl ProviderError {
    /// Whether this error is retryable.
    ///
    /// Nothing retries automatically; this is reported to the caller.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => {
                e.is_timeout()
                    || e.is_connect()
                    || e.status().is_some_and(|s| {
                        s == reqwest::StatusCode::TOO_MANY_REQUESTS || s.is_server_error()
                    })
            }
            Self::Timeout { .. } => true,
            Self::Api { retryable, .. } => *retryable,
            Self::Malformed { .. } | Self::Cancelled | Self::Other { .. } => false,
        }
    }

    /// Whether the call ran out of time, either here or in the HTTP client.
    pub fn is_timeout(&self) -> bool {
        match self {
            Self::Timeout { .. } => true,
            Self::Http(e) => e.is_timeout(),
            _ => false,
        }
    }

    /// Failure class recorded in the ledger.
    pub fn category(&self) -> &str {
        match self {
            _ if self.is_timeout() => "timeout",
            Self::Http(_) => "transport",
            Self::Api { status, .. } if *status >= 500 => "server",
            Self::Api { .. } => "client",
            Self::Malformed { .. } => "malformed",
            Self::Cancelled => "cancelled",
            Self::Timeout { .. } | Self::Other { .. } => "unknown",
        }
    }
}

/// Invalid provider configuration.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConfigError {
    /// Name is blank.
    #[error("provider name must not be empty")]
    EmptyName,

    /// Model is blank.
    #[error("provider model must not be empty")]
    EmptyModel,

    /// Base URL does not parse or is not http(s).
    #[error("invalid base url '{url}': {reason}")]
    InvalidBaseUrl {
        /// URL as configured.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A numeric field that must be positive is zero.
    #[error("{field} must be greater than zero")]
    Zero {
        /// Field name.
        field: &'static str,
    },

    /// Completion cap does not fit the context window.
    #[error("max_tokens ({max_tokens}) must not exceed context_window ({context_window})")]
    MaxTokensExceedWindow {
        /// Configured completion cap.
        max_tokens: u64,
        /// Configured context window.
        context_window: u64,
    },

    /// Temperature outside `0..=2`.
    #[error("temperature must be within 0..=2, got {0}")]
    Temperature(f64),

    /// Negative price.
    #[error("{field} must not be negative")]
    NegativeCost {
        /// Field name.
        field: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(status: u16) -> ProviderError {
        ProviderError::Api {
            status,
            message: "x".into(),
            code: None,
            retryable: status == 429 || status >= 500,
        }
    }

    #[test]
    fn categories() {
        assert_eq!(ProviderError::Timeout { timeout_ms: 5 }.category(), "timeout");
        assert_eq!(api(404).category(), "client");
        assert_eq!(api(429).category(), "client");
        assert_eq!(api(503).category(), "server");
        assert_eq!(ProviderError::Malformed { message: "no choices".into() }.category(), "malformed");
        assert_eq!(ProviderError::Cancelled.category(), "cancelled");
        assert_eq!(ProviderError::Other { message: "?".into() }.category(), "unknown");
    }

    #[test]
    fn retryable() {
        assert!(ProviderError::Timeout { timeout_ms: 5 }.is_retryable());
        assert!(api(500).is_retryable());
        assert!(api(429).is_retryable());
        assert!(!api(400).is_retryable());
        assert!(!ProviderError::Cancelled.is_retryable());
    }

    #[test]
    fn display() {
        assert_eq!(api(401).to_string(), "API error (401): x");
        assert_eq!(
            ConfigError::MaxTokensExceedWindow { max_tokens: 9000, context_window: 4096 }.to_string(),
            "max_tokens (9000) must not exceed context_window (4096)"
        );
    }
}
