// pattern-core/src/core/outcome.rs
// ============================================================================
// Module: Pattern Core Outcome
// Description: Terminal session outcomes observed from external agents.
// Purpose: Input to the feedback and attribution loop.
// Dependencies: serde, crate::core::identifiers
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::SessionId;

/// Terminal result of an external agent session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    /// The session's task was completed successfully.
    Success,
    /// The session's task failed.
    Failure,
    /// The session declined to act (neither success nor failure).
    Abstain,
}

/// Structured evidence accompanying a session outcome: automated test
/// results, static-analysis findings, human acceptance, and so on.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EvidenceSignals {
    /// Present when automated test results were attached to this outcome.
    pub test_results: Option<Value>,
    /// Present when static-analysis findings were attached.
    pub static_analysis: Option<Value>,
    /// Present when a human reviewer explicitly accepted the result.
    pub human_acceptance: Option<bool>,
}

impl EvidenceSignals {
    /// No structured signals at all.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }
}

/// A terminal event observed from an external agent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionOutcome {
    /// Session this outcome belongs to.
    pub session_id: SessionId,
    /// Success, failure, or abstain.
    pub outcome: Outcome,
    /// Correlation id of the triggering envelope.
    pub correlation_id: CorrelationId,
    /// Optional identifier of the execution run that produced this outcome.
    pub run_id: Option<String>,
    /// Whether `run_id`, if present, denotes a run that itself succeeded.
    pub run_succeeded: Option<bool>,
    /// Structured evidence backing this outcome.
    pub evidence_signals: EvidenceSignals,
}
