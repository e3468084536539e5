//! # ucp-tokens
//!
//! Token estimation and cost accounting.
//!
//! 1. **Estimation**: [`estimate`] approximates sub-word tokenization cost
//!    with a deterministic heuristic; used when a provider reports no usage
//!    and to compare raw prompts against compiled packets.
//! 2. **Budgeting**: [`token_budget`] sizes completion requests against the
//!    provider's context window.
//! 3. **Cost**: [`calculate_cost`] applies per-1000-token pricing.
//! 4. **Totals**: [`SessionTotals`] accumulates a session's usage, cost,
//!    latency and context-window pressure.

#![deny(unsafe_code)]

pub mod budget;
pub mod estimator;
pub mod pricing;
pub mod types;

pub use budget::{CompressionStats, token_budget};
pub use estimator::estimate;
pub use pricing::{Cost, Pricing, calculate_cost, format_cost, format_tokens};
pub use types::{SessionTotals, TokenMethod, Usage};
