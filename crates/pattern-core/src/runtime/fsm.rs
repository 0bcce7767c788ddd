// pattern-core/src/runtime/fsm.rs
// ============================================================================
// Module: Pattern Core FSM
// Description: Pattern lifecycle finite state machine with evidence-tier gates.
// Purpose: The authoritative source of legal transitions and their guards.
// Dependencies: crate::core
// ============================================================================

//! States: `CANDIDATE → PROVISIONAL → VALIDATED → DEPRECATED`;
//! `BLACKLISTED` is an absorbing state reachable from any non-terminal
//! state. This module only decides whether a transition is *legal*; it does
//! not touch storage — [`crate::interfaces::PatternStore::apply_transition`]
//! is the transactional boundary that calls into it.

use crate::core::EvidenceTier;
use crate::core::LifecycleStatus;
use crate::core::RollingMetrics;

/// Tunable promotion/demotion thresholds. Every field is required at
/// construction; there is no `Default` impl, matching the fail-closed
/// configuration philosophy (no silently-applied thresholds).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecycleThresholds {
    /// Minimum injection count required for auto-promotion (`C_min`).
    pub injection_count_min: u64,
    /// Minimum success rate required for auto-promotion (`R_min`).
    pub success_rate_min: f64,
    /// Maximum consecutive failures tolerated for auto-promotion (`F_max`).
    pub consecutive_failures_max: u32,
    /// Success-rate floor that triggers auto-demotion (`R_demote`).
    pub demotion_success_rate: f64,
    /// Consecutive-failure ceiling that triggers auto-demotion (`F_max_demote`).
    pub demotion_consecutive_failures: u32,
}

/// Why an attempted transition was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardFailure {
    /// `from_status` did not match the pattern's actual current status.
    StatusMismatch,
    /// No FSM edge connects `from_status` to the requested `to_status`.
    IllegalEdge,
    /// The edge exists but its evidence-tier or metric guard did not hold.
    GateNotSatisfied,
}

/// Whether an anti-gaming alert is active for a pattern, and at what
/// severity. Only a [`crate::core::MismatchSeverity::Blocker`] alert forces
/// a transition to `BLACKLISTED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AntiGamingState {
    /// Whether any anti-gaming alert is currently active.
    pub alert_active: bool,
}

/// Evaluates whether `from → to` is a legal transition given the pattern's
/// current evidence tier, rolling metrics, and anti-gaming state.
///
/// # Errors
///
/// Returns [`GuardFailure`] describing why the transition is illegal.
pub fn evaluate_transition(
    from: LifecycleStatus,
    to: LifecycleStatus,
    evidence_tier: EvidenceTier,
    metrics: &RollingMetrics,
    anti_gaming: AntiGamingState,
    thresholds: &LifecycleThresholds,
) -> Result<(), GuardFailure> {
    if from.is_terminal() {
        return Err(GuardFailure::IllegalEdge);
    }
    if to == LifecycleStatus::Blacklisted {
        return evaluate_blacklist(anti_gaming);
    }
    match (from, to) {
        (LifecycleStatus::Candidate, LifecycleStatus::Provisional) => {
            evaluate_candidate_to_provisional(evidence_tier, metrics)
        }
        (LifecycleStatus::Provisional, LifecycleStatus::Validated) => {
            evaluate_provisional_to_validated(evidence_tier, metrics, anti_gaming, thresholds)
        }
        (LifecycleStatus::Validated, LifecycleStatus::Deprecated) => {
            evaluate_validated_to_deprecated(metrics, thresholds)
        }
        _ => Err(GuardFailure::IllegalEdge),
    }
}

fn evaluate_blacklist(anti_gaming: AntiGamingState) -> Result<(), GuardFailure> {
    // Manual operator action is authorized by the caller before reaching
    // this function; a BLOCKER anti-gaming alert is the only automatic path.
    if anti_gaming.alert_active {
        Ok(())
    } else {
        Err(GuardFailure::GateNotSatisfied)
    }
}

fn evaluate_candidate_to_provisional(
    evidence_tier: EvidenceTier,
    metrics: &RollingMetrics,
) -> Result<(), GuardFailure> {
    if evidence_tier < EvidenceTier::Observed {
        return Err(GuardFailure::GateNotSatisfied);
    }
    if !metrics.has_positive_outcome() {
        return Err(GuardFailure::GateNotSatisfied);
    }
    Ok(())
}

fn evaluate_provisional_to_validated(
    evidence_tier: EvidenceTier,
    metrics: &RollingMetrics,
    anti_gaming: AntiGamingState,
    thresholds: &LifecycleThresholds,
) -> Result<(), GuardFailure> {
    if evidence_tier < EvidenceTier::Measured {
        return Err(GuardFailure::GateNotSatisfied);
    }
    if metrics.injection_count < thresholds.injection_count_min {
        return Err(GuardFailure::GateNotSatisfied);
    }
    if metrics.success_rate() < thresholds.success_rate_min {
        return Err(GuardFailure::GateNotSatisfied);
    }
    if metrics.consecutive_failures > thresholds.consecutive_failures_max {
        return Err(GuardFailure::GateNotSatisfied);
    }
    if anti_gaming.alert_active {
        return Err(GuardFailure::GateNotSatisfied);
    }
    Ok(())
}

fn evaluate_validated_to_deprecated(
    metrics: &RollingMetrics,
    thresholds: &LifecycleThresholds,
) -> Result<(), GuardFailure> {
    let below_success_floor = metrics.success_rate() < thresholds.demotion_success_rate;
    let over_failure_ceiling =
        metrics.consecutive_failures > thresholds.demotion_consecutive_failures;
    if below_success_floor || over_failure_ceiling {
        Ok(())
    } else {
        Err(GuardFailure::GateNotSatisfied)
    }
}
