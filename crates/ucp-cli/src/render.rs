//! Text and JSON output helpers.

use std::io::Write;

use anyhow::Result;
use serde::Serialize;
use ucp_compiler::CacheStatus;
use ucp_core::text::truncate_str;
use ucp_tokens::{SessionTotals, format_cost, format_tokens};

/// Pretty JSON followed by a newline.
pub fn json<W: Write, T: Serialize + ?Sized>(out: &mut W, value: &T) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}

/// `label   value` line with the label padded to a fixed column.
pub fn field<W: Write>(out: &mut W, label: &str, value: impl std::fmt::Display) -> Result<()> {
    writeln!(out, "{label:<10} {value}")?;
    Ok(())
}

/// First 12 characters of a hash.
pub fn short_hash(hash: &str) -> &str {
    truncate_str(hash, 12)
}

/// Lowercase cache status.
pub fn cache_status(status: CacheStatus) -> &'static str {
    match status {
        CacheStatus::Hit => "hit",
        CacheStatus::Miss => "miss",
    }
}

/// One-line token and cost summary.
pub fn totals(totals: &SessionTotals) -> String {
    format!(
        "{} in / {} out / {} total, {}",
        format_tokens(totals.prompt_tokens),
        format_tokens(totals.completion_tokens),
        format_tokens(totals.total_tokens),
        format_cost(totals.cost_estimate),
    )
}

/// Prompt shortened to `max` characters for listings.
pub fn truncate(text: &str, max: usize) -> String {
    let line = text.lines().next().unwrap_or_default();
    if line.chars().count() <= max && line.len() == text.len() {
        return line.to_owned();
    }
    let cut: String = line.chars().take(max.saturating_sub(1)).collect();
    format!("{cut}…")
}
