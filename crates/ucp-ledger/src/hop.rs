//! Ledger hops.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use ucp_tokens::TokenMethod;

/// Pipeline step a hop records.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HopType {
    /// Prompt compiled to a packet.
    Compile,
    /// Request about to be sent to the provider.
    ProviderRequest,
    /// Provider answered.
    ProviderResponse,
    /// Terminal outcome of the execution, success or failure.
    Execution,
}

impl HopType {
    /// Every hop type, in pipeline order.
    pub const ALL: [Self; 4] = [
        Self::Compile,
        Self::ProviderRequest,
        Self::ProviderResponse,
        Self::Execution,
    ];

    /// Name used in the hash input and on the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Compile => "COMPILE",
            Self::ProviderRequest => "PROVIDER_REQUEST",
            Self::ProviderResponse => "PROVIDER_RESPONSE",
            Self::Execution => "EXECUTION",
        }
    }
}

impl fmt::Display for HopType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HopType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| format!("unknown hop type: {s}"))
    }
}

/// Measurements recorded alongside a hop payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HopMetrics {
    /// Tokens attributed to the hop.
    pub token_count: u64,
    /// How `token_count` was obtained.
    pub token_method: TokenMethod,
    /// Time spent in the step.
    pub latency_ms: u64,
    /// Provider context window, for scoring.
    pub context_window: u64,
    /// Whether the step produced well-formed output.
    pub parse_valid: bool,
}

impl Default for HopMetrics {
    fn default() -> Self {
        Self {
            token_count: 0,
            token_method: TokenMethod::LocalEstimated,
            latency_ms: 0,
            context_window: ucp_core::constants::DEFAULT_CONTEXT_WINDOW,
            parse_valid: true,
        }
    }
}

/// One chained ledger entry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hop {
    /// Position in the session, from 1.
    pub sequence_number: u64,
    /// Step recorded.
    pub hop_type: HopType,
    /// Recorded content.
    pub payload: serde_json::Value,
    /// SHA-256 of the compact JSON payload.
    pub payload_digest: String,
    /// Tokens attributed to the hop.
    pub token_count: u64,
    /// How `token_count` was obtained.
    pub token_method: TokenMethod,
    /// Time spent in the step.
    pub latency_ms: u64,
    /// Hash of the previous hop, or the genesis hash.
    pub prev_hash: String,
    /// `SHA256(prev_hash ‖ payload_digest ‖ sequence_number ‖ hop_type)`.
    pub hash: String,
    /// Quality score, 0 to 100. Not hashed.
    pub score: u8,
    /// RFC 3339 time of recording. Not hashed.
    pub timestamp: String,
}
