//! Usage records and per-session totals.

use serde::{Deserialize, Serialize};

/// Where a token count came from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenMethod {
    /// Counted by the provider and used verbatim.
    ProviderReported,
    /// Approximated with [`crate::estimate`].
    #[default]
    LocalEstimated,
}

impl TokenMethod {
    /// Wire name (`provider-reported` / `local-estimated`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ProviderReported => "provider-reported",
            Self::LocalEstimated => "local-estimated",
        }
    }
}

impl std::fmt::Display for TokenMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TokenMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "provider-reported" => Ok(Self::ProviderReported),
            "local-estimated" => Ok(Self::LocalEstimated),
            other => Err(format!("unknown token method: {other}")),
        }
    }
}

/// Prompt/completion token counts for one provider exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    /// Tokens sent.
    pub prompt_tokens: u64,
    /// Tokens received.
    pub completion_tokens: u64,
}

impl Usage {
    /// Sum of prompt and completion tokens.
    pub fn total(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Accumulated usage for a session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionTotals {
    /// Prompt tokens over all exchanges.
    pub prompt_tokens: u64,
    /// Completion tokens over all exchanges.
    pub completion_tokens: u64,
    /// `prompt_tokens + completion_tokens`.
    pub total_tokens: u64,
    /// Estimated spend in USD.
    pub cost_estimate: f64,
    /// Wall-clock time spent waiting on the provider.
    pub latency_ms: u64,
    /// Prompt tokens as a percentage of the context window.
    pub context_window_used: f64,
}

impl SessionTotals {
    /// Fold one provider exchange into the totals.
    #[allow(clippy::cast_precision_loss)] // token counts never approach 2^52
    pub fn record_exchange(&mut self, usage: Usage, cost: f64, latency_ms: u64, context_window: u64) {
        self.prompt_tokens += usage.prompt_tokens;
        self.completion_tokens += usage.completion_tokens;
        self.total_tokens = self.prompt_tokens + self.completion_tokens;
        self.cost_estimate += cost;
        self.latency_ms += latency_ms;
        self.context_window_used = if context_window == 0 {
            0.0
        } else {
            self.prompt_tokens as f64 / context_window as f64 * 100.0
        };
    }
}
