// pattern-core/src/core/pattern.rs
// ============================================================================
// Module: Pattern Core Pattern
// Description: The central pattern entity, its rolling metrics, and invariants.
// Purpose: Model a reusable signature abstracted from prior executions.
// Dependencies: serde, crate::core::{identifiers, hashing, lifecycle, time}
// ============================================================================

//! A [`Pattern`] is the central entity of this system: a reusable signature
//! abstracted from prior agent executions, carrying metrics and lifecycle
//! state. `(signature_hash, version)` is unique; versions are strictly
//! increasing per lineage. Historical rows are immutable — mutation always
//! means either inserting a new version or updating the single mutable
//! projection fields (`lifecycle_status`, `evidence_tier`, `rolling_metrics`,
//! `last_transitioned_at`) of the current version, atomically.

use serde::Deserialize;
use serde::Serialize;

use crate::core::hashing::HashDigest;
use crate::core::identifiers::PatternId;
use crate::core::identifiers::SignatureHash;
use crate::core::lifecycle::EvidenceTier;
use crate::core::lifecycle::LifecycleStatus;
use crate::core::time::Timestamp;

/// Default size of the rolling outcome window used for promotion/demotion
/// metrics, absent an explicit configuration override.
pub const DEFAULT_ROLLING_WINDOW: usize = 20;

/// A single recorded outcome contribution in the rolling window, already
/// weighted by the attribution heuristic that produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum WeightedOutcome {
    /// A success outcome, weighted by attributed credit in `[0, 1]`.
    Success(f64),
    /// A failure outcome, weighted by attributed credit in `[0, 1]`.
    Failure(f64),
    /// An abstain outcome; does not count toward success rate.
    Abstain,
}

/// Fixed-size window of the last `N` weighted outcomes plus the counters
/// derived from it. Bounded and recomputed on every `record_outcome`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollingMetrics {
    capacity: usize,
    window: Vec<WeightedOutcome>,
    /// Number of pattern injections observed (not window-bounded).
    pub injection_count: u64,
    /// Consecutive failures since the last success, reset by any success.
    pub consecutive_failures: u32,
}

impl RollingMetrics {
    /// Builds an empty rolling window with the given bounded capacity.
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            window: Vec::new(),
            injection_count: 0,
            consecutive_failures: 0,
        }
    }

    /// Appends a weighted outcome, evicting the oldest entry once the window
    /// is at capacity, and updates the consecutive-failure counter.
    pub fn record(&mut self, outcome: WeightedOutcome) {
        match outcome {
            WeightedOutcome::Success(_) => self.consecutive_failures = 0,
            WeightedOutcome::Failure(_) => self.consecutive_failures += 1,
            WeightedOutcome::Abstain => {}
        }
        if self.window.len() >= self.capacity {
            self.window.remove(0);
        }
        self.window.push(outcome);
    }

    /// Records a pattern injection without an outcome yet.
    pub fn record_injection(&mut self) {
        self.injection_count += 1;
    }

    /// Success rate over the current window: weighted successes divided by
    /// non-abstain entries. Returns `0.0` for an empty window.
    #[must_use]
    pub fn success_rate(&self) -> f64 {
        let mut success_weight = 0.0;
        let mut total_weight = 0.0;
        for outcome in &self.window {
            match outcome {
                WeightedOutcome::Success(weight) => {
                    success_weight += weight;
                    total_weight += weight;
                }
                WeightedOutcome::Failure(weight) => total_weight += weight,
                WeightedOutcome::Abstain => {}
            }
        }
        if total_weight <= 0.0 {
            0.0
        } else {
            success_weight / total_weight
        }
    }

    /// Whether at least one success has ever been recorded in the window.
    #[must_use]
    pub fn has_positive_outcome(&self) -> bool {
        self.window
            .iter()
            .any(|outcome| matches!(outcome, WeightedOutcome::Success(weight) if *weight > 0.0))
    }

    /// Number of non-abstain entries currently held in the window.
    #[must_use]
    pub fn len(&self) -> usize {
        self.window.len()
    }

    /// Whether the window currently holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.window.is_empty()
    }
}

/// A (domain, confidence) candidate classification for a pattern.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainCandidate {
    /// Candidate domain label.
    pub domain: String,
    /// Confidence in `[0, 1]` that this domain applies.
    pub confidence: f64,
}

/// The central pattern entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pattern {
    /// Opaque unique identifier of this stored version.
    pub pattern_id: PatternId,
    /// Stable fingerprint shared across all versions of this lineage.
    pub signature_hash: SignatureHash,
    /// Raw canonical signature text.
    pub signature: String,
    /// Monotonic version number within `signature_hash`.
    pub version: u64,
    /// Current lifecycle status.
    pub lifecycle_status: LifecycleStatus,
    /// Current evidence tier; monotonically advances.
    pub evidence_tier: EvidenceTier,
    /// Confidence score in `[0, 1]`.
    pub confidence: f64,
    /// Rolling outcome window and derived counters.
    pub rolling_metrics: RollingMetrics,
    /// Domain classification candidates.
    pub domain_candidates: Vec<DomainCandidate>,
    /// Time this lineage was first observed.
    pub created_at: Timestamp,
    /// Time of the most recent lifecycle transition.
    pub last_transitioned_at: Timestamp,
    /// Canonical-hash fingerprint over the pattern's full content.
    pub content_fingerprint: HashDigest,
}

impl Pattern {
    /// Builds the first (`version = 1`, `CANDIDATE`, `UNMEASURED`) row for a
    /// newly observed signature.
    #[must_use]
    pub fn new_candidate(
        pattern_id: PatternId,
        signature_hash: SignatureHash,
        signature: impl Into<String>,
        content_fingerprint: HashDigest,
        observed_at: Timestamp,
        rolling_window: usize,
    ) -> Self {
        Self {
            pattern_id,
            signature_hash,
            signature: signature.into(),
            version: 1,
            lifecycle_status: LifecycleStatus::Candidate,
            evidence_tier: EvidenceTier::Unmeasured,
            confidence: 0.0,
            rolling_metrics: RollingMetrics::new(rolling_window),
            domain_candidates: Vec::new(),
            created_at: observed_at,
            last_transitioned_at: observed_at,
            content_fingerprint,
        }
    }
}
