// pattern-core/src/core/injection.rs
// ============================================================================
// Module: Pattern Core Injection
// Description: Record of a pattern surfaced into an agent's context.
// Purpose: Ground the feedback loop's fetch-by-session join.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::InjectionId;
use crate::core::identifiers::PatternId;
use crate::core::identifiers::SessionId;
use crate::core::time::Timestamp;

/// What kind of context the pattern was surfaced into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContextType {
    /// Injected as a system-prompt suggestion.
    SystemPrompt,
    /// Injected as an inline code-completion hint.
    InlineHint,
    /// Injected as a retrieved reference example.
    ReferenceExample,
}

/// Experiment arm a session was assigned to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Cohort {
    /// Did not receive the pattern injection.
    Control,
    /// Received the pattern injection.
    Treatment,
}

/// Record of a pattern being surfaced into an agent's context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternInjection {
    /// Unique identifier of this injection.
    pub injection_id: InjectionId,
    /// Pattern that was surfaced.
    pub pattern_id: PatternId,
    /// Session the pattern was surfaced into.
    pub session_id: SessionId,
    /// Correlation id of the envelope that caused this injection.
    pub correlation_id: CorrelationId,
    /// Kind of context the pattern was surfaced into.
    pub context_type: ContextType,
    /// Experiment arm this session belongs to.
    pub cohort: Cohort,
    /// When the injection occurred.
    pub injected_at: Timestamp,
}
