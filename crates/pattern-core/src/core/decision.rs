// pattern-core/src/core/decision.rs
// ============================================================================
// Module: Pattern Core Decision
// Description: Decision records and Layer-1/Layer-2 mismatch detection.
// Purpose: Auditable selection rationale, replay, and anti-gaming signal.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

//! Every selection emits a [`DecisionRecord`] capturing both Layer-1
//! provenance (the numeric scoring that actually drove the choice) and
//! Layer-2 rationale (a natural-language explanation). The
//! [`MismatchDetector`] flags when the two disagree.

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::DecisionId;
use crate::core::identifiers::PatternId;
use crate::core::time::Timestamp;

/// What kind of selection this decision record describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionType {
    /// Selecting which underlying model to route a request to.
    ModelSelection,
    /// Selecting which route to dispatch a request through.
    RouteSelection,
    /// Selecting which pattern to inject into a session.
    PatternSelection,
}

/// One candidate considered during a selection, with its full score
/// breakdown by named feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Identifier of the candidate pattern, if this decision selects among
    /// patterns.
    pub candidate_id: PatternId,
    /// Final aggregate score for this candidate.
    pub total_score: f64,
    /// Named feature contributions summing (approximately) to `total_score`.
    pub feature_contributions: Vec<(String, f64)>,
}

/// How a tie between equally scored candidates was broken.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TieBreaker {
    /// No tie occurred; the top score was unique.
    None,
    /// Ties broken by candidate identifier, lexicographically.
    Lexicographic,
    /// Ties broken by earliest creation time.
    Oldest,
}

/// Layer-1 structured provenance: the numeric scoring that produced the
/// choice, independent of any narrative explanation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    /// All candidates considered, in evaluation order.
    pub candidates: Vec<CandidateScore>,
    /// How a tie among top-scoring candidates, if any, was broken.
    pub tie_breaker: TieBreaker,
}

/// Emitted on every model/route/pattern selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionRecord {
    /// Unique identifier of this decision record.
    pub decision_id: DecisionId,
    /// What kind of selection this record describes.
    pub decision_type: DecisionType,
    /// Layer-1 structured scoring provenance.
    pub provenance: Provenance,
    /// Identifier of the candidate that was ultimately chosen.
    pub chosen_id: PatternId,
    /// Layer-2 natural-language explanation supplied by the decider.
    pub agent_rationale: String,
    /// When this decision was recorded.
    pub recorded_at: Timestamp,
}

impl DecisionRecord {
    /// Returns the candidate's provenance entry, if present among
    /// `provenance.candidates`.
    #[must_use]
    pub fn candidate(&self, id: &PatternId) -> Option<&CandidateScore> {
        self.provenance
            .candidates
            .iter()
            .find(|candidate| &candidate.candidate_id == id)
    }

    /// Re-derives the tie-broken winner from `provenance` alone, ignoring
    /// `chosen_id` and `agent_rationale`. Used by [`replay`] to verify a
    /// decision is still reproducible from its recorded score vector.
    #[must_use]
    pub fn recompute_winner(&self) -> Option<&PatternId> {
        let max_score = self
            .provenance
            .candidates
            .iter()
            .map(|candidate| candidate.total_score)
            .fold(f64::NEG_INFINITY, f64::max);
        let mut winners: Vec<&CandidateScore> = self
            .provenance
            .candidates
            .iter()
            .filter(|candidate| (candidate.total_score - max_score).abs() < 1e-9)
            .collect();
        if winners.is_empty() {
            return None;
        }
        if winners.len() > 1 {
            match self.provenance.tie_breaker {
                TieBreaker::Lexicographic => {
                    winners.sort_by(|a, b| a.candidate_id.as_str().cmp(b.candidate_id.as_str()));
                }
                TieBreaker::Oldest | TieBreaker::None => {}
            }
        }
        winners.first().map(|candidate| &candidate.candidate_id)
    }
}

/// Outcome of replaying a decision record: did the recorded `chosen_id`
/// match what the recorded score vector deterministically implies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplayOutcome {
    /// The recorded choice matches the recomputed tie-broken winner.
    Consistent,
    /// The recorded choice does not match the recomputed winner.
    Inconsistent,
    /// The record carries no candidates to recompute a winner from.
    NoCandidates,
}

/// Reconstructs a decision deterministically from its record and verifies
/// the chosen candidate is still the tie-broken winner of the recorded
/// score vector. Used for auditing.
#[must_use]
pub fn replay(record: &DecisionRecord) -> ReplayOutcome {
    match record.recompute_winner() {
        None => ReplayOutcome::NoCandidates,
        Some(winner) if *winner == record.chosen_id => ReplayOutcome::Consistent,
        Some(_) => ReplayOutcome::Inconsistent,
    }
}

/// Severity of a detected Layer-1/Layer-2 mismatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MismatchSeverity {
    /// Informational; no action required.
    Info,
    /// Worth a human look; not acted on automatically.
    Warn,
    /// May trigger automatic blacklisting of the offending pattern.
    Blocker,
}

/// A detected inconsistency between a decision's narrative and its numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchSignal {
    /// Decision record the mismatch was found in.
    pub decision_id: DecisionId,
    /// Severity of the detected mismatch.
    pub severity: MismatchSeverity,
    /// Human-readable description of the conflict.
    pub reason: String,
}

/// A narrative claim pattern the mismatch detector checks against
/// provenance. Kept deliberately small: this is not NLP, it is a direct
/// check of specific claim shapes a decider's rationale might make.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RationaleClaim {
    /// The rationale claims the chosen candidate had the lowest cost
    /// feature contribution among all candidates.
    LowerCost,
    /// The rationale claims the chosen candidate had the highest score.
    HighestScore,
}

/// Consumes decision records and flags conflicts where the Layer-2
/// rationale's claim is not consistent with the Layer-1 provenance.
#[derive(Debug, Clone, Copy, Default)]
pub struct MismatchDetector;

impl MismatchDetector {
    /// Checks a single named claim against a decision's provenance.
    #[must_use]
    pub fn check_claim(
        &self,
        record: &DecisionRecord,
        claim: RationaleClaim,
    ) -> Option<MismatchSignal> {
        match claim {
            RationaleClaim::HighestScore => self.check_highest_score(record),
            RationaleClaim::LowerCost => self.check_lower_cost(record),
        }
    }

    fn check_highest_score(&self, record: &DecisionRecord) -> Option<MismatchSignal> {
        let chosen = record.candidate(&record.chosen_id)?;
        let higher_exists = record
            .provenance
            .candidates
            .iter()
            .any(|candidate| candidate.total_score > chosen.total_score + 1e-9);
        if higher_exists {
            Some(MismatchSignal {
                decision_id: record.decision_id.clone(),
                severity: MismatchSeverity::Blocker,
                reason: "rationale claims highest score but a higher-scoring candidate exists"
                    .to_string(),
            })
        } else {
            None
        }
    }

    fn check_lower_cost(&self, record: &DecisionRecord) -> Option<MismatchSignal> {
        let chosen = record.candidate(&record.chosen_id)?;
        let chosen_cost = feature(chosen, "cost")?;
        let cheaper_exists = record.provenance.candidates.iter().any(|candidate| {
            candidate.candidate_id != record.chosen_id
                && feature(candidate, "cost").is_some_and(|cost| cost < chosen_cost - 1e-9)
        });
        if cheaper_exists {
            Some(MismatchSignal {
                decision_id: record.decision_id.clone(),
                severity: MismatchSeverity::Warn,
                reason: "rationale claims lower cost but a cheaper candidate exists".to_string(),
            })
        } else {
            None
        }
    }
}

fn feature(candidate: &CandidateScore, name: &str) -> Option<f64> {
    candidate
        .feature_contributions
        .iter()
        .find(|(key, _)| key == name)
        .map(|(_, value)| *value)
}
