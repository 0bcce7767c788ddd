// pattern-core/src/core/lifecycle.rs
// ============================================================================
// Module: Pattern Core Lifecycle
// Description: Lifecycle status and evidence tier enums with ordering.
// Purpose: Provide the vocabulary the FSM transitions over.
// Dependencies: serde
// ============================================================================

//! `LifecycleStatus` and `EvidenceTier` are kept as plain ordered enums so
//! the FSM (`crate::runtime::fsm`) can express guards as comparisons rather
//! than ad hoc match arms scattered across the codebase.

use serde::Deserialize;
use serde::Serialize;

/// A pattern's position in the promotion/demotion state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleStatus {
    /// Freshly observed, not yet promoted.
    Candidate,
    /// Has at least one positive outcome at `Observed` evidence tier.
    Provisional,
    /// Auto-promoted past the full set of promotion gates.
    Validated,
    /// Auto-demoted after sustained poor performance.
    Deprecated,
    /// Terminal, absorbing state; reachable from any non-terminal state.
    Blacklisted,
}

impl LifecycleStatus {
    /// Whether this status is terminal (no further transitions are legal).
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Blacklisted)
    }
}

/// Monotone quality label on the observations backing a pattern. Ordered:
/// a pattern's evidence tier may only advance, never regress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EvidenceTier {
    /// No outcomes recorded yet.
    Unmeasured,
    /// At least one outcome observed, without structured signals.
    Observed,
    /// Outcomes backed by automated test results or a successful run id.
    Measured,
    /// Independently verified beyond automated measurement.
    Verified,
}

impl EvidenceTier {
    /// Returns the higher of `self` and `other`, enforcing the
    /// never-lowered invariant when advancing a pattern's tier.
    #[must_use]
    pub fn advance_to(self, other: Self) -> Self {
        self.max(other)
    }
}
