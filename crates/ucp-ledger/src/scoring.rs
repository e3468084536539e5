//! Hop quality scores.

use serde::Serialize;

use crate::hop::HopMetrics;

/// Score with its components, each in points.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct HopScore {
    /// Final score, clamped to 0..=100.
    pub score: u8,
    /// Up to 30; loses a point per 100 tokens.
    pub token_efficiency: f64,
    /// Up to 20; a point per 500 ms.
    pub latency_penalty: f64,
    /// Up to 30; 50 points per full context window.
    pub context_pressure: f64,
    /// 20 when the step's output parsed, else 0.
    pub parse_validity: f64,
}

/// Grade a hop from its metrics.
///
/// Starts at 100 and subtracts the lost efficiency points, the latency and
/// context penalties and, for unparseable output, the validity points.
#[allow(clippy::cast_precision_loss, clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn score_hop(metrics: &HopMetrics) -> HopScore {
    let tokens = metrics.token_count as f64;
    let token_efficiency = (30.0 - tokens / 100.0).max(0.0);
    let latency_penalty = (metrics.latency_ms as f64 / 500.0).min(20.0);
    let context_pressure = if metrics.context_window == 0 {
        30.0
    } else {
        (tokens / metrics.context_window as f64 * 50.0).min(30.0)
    };
    let parse_validity = if metrics.parse_valid { 20.0 } else { 0.0 };

    let raw = 100.0 - (30.0 - token_efficiency) - latency_penalty - context_pressure - (20.0 - parse_validity);
    HopScore {
        score: raw.round().clamp(0.0, 100.0) as u8,
        token_efficiency,
        latency_penalty,
        context_pressure,
        parse_validity,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ucp_tokens::TokenMethod;

    fn metrics(token_count: u64, latency_ms: u64) -> HopMetrics {
        HopMetrics {
            token_count,
            token_method: TokenMethod::LocalEstimated,
            latency_ms,
            context_window: 4096,
            parse_valid: true,
        }
    }

    #[test]
    fn free_hop_scores_full_marks() {
        assert_eq!(score_hop(&metrics(0, 0)).score, 100);
    }

    #[test]
    fn penalties_add_up() {
        // 1000 tokens lose 10 efficiency points and 12.2 to pressure; 1000 ms loses 2.
        let s = score_hop(&metrics(1000, 1000));
        assert!((s.token_efficiency - 20.0).abs() < 1e-9);
        assert!((s.latency_penalty - 2.0).abs() < 1e-9);
        assert_eq!(s.score, 76);
    }

    #[test]
    fn penalties_are_capped_and_score_floors_at_zero() {
        let mut m = metrics(1_000_000, 1_000_000);
        m.parse_valid = false;
        let s = score_hop(&m);
        assert!((s.latency_penalty - 20.0).abs() < 1e-9);
        assert!((s.context_pressure - 30.0).abs() < 1e-9);
        assert_eq!(s.score, 0);
    }

    #[test]
    fn invalid_output_costs_twenty() {
        let mut m = metrics(0, 0);
        m.parse_valid = false;
        assert_eq!(score_hop(&m).score, 80);
    }
}
