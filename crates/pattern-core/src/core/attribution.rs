// pattern-core/src/core/attribution.rs
// ============================================================================
// Module: Pattern Core Attribution
// Description: Credit-splitting heuristics joining outcomes to injections.
// Purpose: Produce per-pattern attribution weights summing to 1.0.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

//! Three heuristics split credit for one [`crate::core::outcome::SessionOutcome`]
//! across the injections that preceded it. Each carries a fixed confidence
//! used by downstream consumers, so a caller always knows how much to trust
//! the attributed weight.

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::AttributionId;
use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::InjectionId;
use crate::core::identifiers::PatternId;
use crate::core::identifiers::SessionId;
use crate::core::time::Timestamp;

/// Which heuristic produced an [`Attribution`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributionHeuristic {
    /// `1/N` credit to each of the `N` injections.
    EqualSplit,
    /// Linear ramp `i + 1` for position `i`, normalized to sum to 1.0.
    RecencyWeighted,
    /// `1.0` to the earliest injection, `0` to the rest.
    FirstMatch,
}

impl AttributionHeuristic {
    /// Fixed confidence recorded alongside weights produced by this
    /// heuristic. Higher for heuristics with a stronger causal assumption.
    #[must_use]
    pub const fn confidence(self) -> f64 {
        match self {
            Self::FirstMatch => 0.9,
            Self::RecencyWeighted => 0.7,
            Self::EqualSplit => 0.5,
        }
    }

    /// Splits credit across `count` injections in temporal order (earliest
    /// first), returning one weight per injection summing to 1.0, or an
    /// empty vector when `count` is zero.
    #[must_use]
    pub fn split(self, count: usize) -> Vec<f64> {
        if count == 0 {
            return Vec::new();
        }
        match self {
            Self::EqualSplit => vec![1.0 / count as f64; count],
            Self::FirstMatch => {
                let mut weights = vec![0.0; count];
                weights[0] = 1.0;
                weights
            }
            Self::RecencyWeighted => {
                let total: f64 = (1..=count).map(|i| i as f64).sum();
                (1..=count).map(|i| i as f64 / total).collect()
            }
        }
    }
}

/// One pattern's share of credit for a [`crate::core::outcome::SessionOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AttributedInjection {
    /// Injection this weight applies to.
    pub injection_id: InjectionId,
    /// Pattern the injection surfaced.
    pub pattern_id: PatternId,
    /// Fractional credit in `[0, 1]`.
    pub weight: f64,
}

/// Maps one session outcome to one or more contributing injections with
/// fractional credit summing to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribution {
    /// Unique identifier of this attribution record.
    pub attribution_id: AttributionId,
    /// Session the attributed outcome belongs to.
    pub session_id: SessionId,
    /// Correlation id of the triggering outcome event.
    pub correlation_id: CorrelationId,
    /// Heuristic used to compute `shares`.
    pub heuristic: AttributionHeuristic,
    /// Confidence recorded for `heuristic` at the time of computation.
    pub heuristic_confidence: f64,
    /// Per-injection weighted shares, summing to 1.0.
    pub shares: Vec<AttributedInjection>,
    /// When this attribution was computed.
    pub computed_at: Timestamp,
}

impl Attribution {
    /// Sum of all recorded shares; should equal 1.0 within `1e-9` whenever
    /// `shares` is non-empty.
    #[must_use]
    pub fn total_weight(&self) -> f64 {
        self.shares.iter().map(|share| share.weight).sum()
    }
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test assertions may unwrap, expect, or panic on failure"
    )]
    use super::*;

    #[test]
    fn equal_split_sums_to_one() {
        let weights = AttributionHeuristic::EqualSplit.split(4);
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(weights.iter().all(|w| (*w - 0.25).abs() < 1e-9));
    }

    #[test]
    fn first_match_gives_all_credit_to_earliest() {
        let weights = AttributionHeuristic::FirstMatch.split(3);
        assert_eq!(weights, vec![1.0, 0.0, 0.0]);
    }

    #[test]
    fn recency_weighted_ramps_up_and_sums_to_one() {
        let weights = AttributionHeuristic::RecencyWeighted.split(3);
        let sum: f64 = weights.iter().sum();
        assert!((sum - 1.0).abs() < 1e-9);
        assert!(weights[0] < weights[1]);
        assert!(weights[1] < weights[2]);
    }

    #[test]
    fn split_of_zero_injections_is_empty() {
        assert!(AttributionHeuristic::EqualSplit.split(0).is_empty());
    }

    #[test]
    fn split_of_one_injection_gives_full_credit() {
        assert_eq!(AttributionHeuristic::RecencyWeighted.split(1), vec![1.0]);
        assert_eq!(AttributionHeuristic::EqualSplit.split(1), vec![1.0]);
        assert_eq!(AttributionHeuristic::FirstMatch.split(1), vec![1.0]);
    }
}
