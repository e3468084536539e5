//! Per-1000-token pricing and display formatting.

use serde::{Deserialize, Serialize};

use crate::types::Usage;

/// Provider pricing in USD per 1000 tokens.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Pricing {
    /// Price of 1000 prompt tokens.
    pub input_per_1k: f64,
    /// Price of 1000 completion tokens.
    pub output_per_1k: f64,
}

/// Cost breakdown for one exchange.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Prompt-side cost.
    pub input_cost: f64,
    /// Completion-side cost.
    pub output_cost: f64,
    /// `input_cost + output_cost`.
    pub total: f64,
}

/// Price `usage` at `pricing`.
#[allow(clippy::cast_precision_loss)] // token counts never approach 2^52
pub fn calculate_cost(usage: &Usage, pricing: &Pricing) -> Cost {
    let input_cost = usage.prompt_tokens as f64 / 1000.0 * pricing.input_per_1k;
    let output_cost = usage.completion_tokens as f64 / 1000.0 * pricing.output_per_1k;
    Cost {
        input_cost,
        output_cost,
        total: input_cost + output_cost,
    }
}

/// Format a cost for display: 4 decimals under one cent, 2 otherwise.
pub fn format_cost(cost: f64) -> String {
    if cost < 0.01 {
        format!("${cost:.4}")
    } else {
        format!("${cost:.2}")
    }
}

/// Format a token count for display (`"1.5M"`, `"50K"`, `"500"`).
#[allow(clippy::cast_precision_loss)]
pub fn format_tokens(n: u64) -> String {
    if n >= 1_000_000 {
        let m = n as f64 / 1_000_000.0;
        if (m - m.round()).abs() < 0.05 {
            format!("{m:.0}M")
        } else {
            format!("{m:.1}M")
        }
    } else if n >= 1_000 {
        let k = n as f64 / 1_000.0;
        if (k - k.round()).abs() < 0.05 {
            format!("{k:.0}K")
        } else {
            format!("{k:.1}K")
        }
    } else {
        n.to_string()
    }
}
