//! Completion budgeting and compression statistics.

use serde::{Deserialize, Serialize};

use crate::estimator::estimate;

/// Completion token budget for a prompt of `prompt_estimate` tokens.
///
/// `min(cap, floor((context_window - prompt_estimate - reserve) * 0.8))`,
/// never below 1.
pub fn token_budget(context_window: u64, prompt_estimate: u64, reserve: u64, cap: u64) -> u64 {
    let available = context_window
        .saturating_sub(prompt_estimate)
        .saturating_sub(reserve);
    // floor(available * 0.8) in integer arithmetic
    let usable = available * 4 / 5;
    usable.min(cap).max(1)
}

/// Token savings of a compiled packet against its raw prompt.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CompressionStats {
    /// Estimated tokens of the raw prompt.
    pub original_tokens: u64,
    /// Estimated tokens of the wire-encoded packet.
    pub compiled_tokens: u64,
    /// `original - compiled`, floored at zero.
    pub saved_tokens: u64,
    /// `saved / original * 100`.
    pub savings_pct: f64,
}

impl CompressionStats {
    /// Compare a raw prompt against its compiled form.
    #[allow(clippy::cast_precision_loss)]
    pub fn measure(original: &str, compiled: &str) -> Self {
        let original_tokens = estimate(original);
        let compiled_tokens = estimate(compiled);
        let saved_tokens = original_tokens.saturating_sub(compiled_tokens);
        let savings_pct = if original_tokens == 0 {
            0.0
        } else {
            saved_tokens as f64 / original_tokens as f64 * 100.0
        };
        Self {
            original_tokens,
            compiled_tokens,
            saved_tokens,
            savings_pct,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_capped_by_configured_max() {
        assert_eq!(token_budget(4096, 100, 200, 1024), 1024);
    }

    #[test]
    fn budget_shrinks_under_context_pressure() {
        // (1000 - 500 - 200) * 0.8 = 240
        assert_eq!(token_budget(1000, 500, 200, 1024), 240);
    }

    #[test]
    fn budget_never_zero() {
        assert_eq!(token_budget(100, 5000, 200, 1024), 1);
    }

    #[test]
    fn compression_reports_savings() {
        let stats = CompressionStats::measure(
            "Please summarize the following text: AI is changing everything.",
            "[UCP:SUMMARIZE][DATA:START]AI is changing everything.[DATA:END]",
        );
        assert_eq!(stats.original_tokens, 18);
        assert!(stats.compiled_tokens < stats.original_tokens);
        assert_eq!(stats.saved_tokens, stats.original_tokens - stats.compiled_tokens);
        assert!(stats.savings_pct > 0.0);
    }

    #[test]
    fn compression_of_empty_prompt() {
        let stats = CompressionStats::measure("", "");
        assert!(stats.savings_pct.abs() < f64::EPSILON);
    }
}
