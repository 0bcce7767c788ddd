// pattern-core/src/telemetry.rs
// ============================================================================
// Module: Pattern Core Telemetry
// Description: Dependency-light metrics trait for dispatch/store/feedback.
// Purpose: Let hosts wire metrics to any backend without a tracing/log dep.
// Dependencies: none (std only)
// ============================================================================

//! This workspace carries no `tracing` or `log` dependency. Instead,
//! dispatch, store, and feedback-loop code call through an injected
//! `&dyn PatternMetrics`, matching the dependency-light metrics idiom used
//! elsewhere in this stack rather than printing or logging directly.

/// Which subsystem produced a [`PatternMetricEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternMethod {
    /// The dispatch engine routed an envelope to a handler.
    Dispatch,
    /// The pattern store applied (or rejected) a lifecycle transition.
    Transition,
    /// The feedback loop recorded an attribution.
    Attribution,
}

impl PatternMethod {
    /// Stable string form, suitable as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Dispatch => "dispatch",
            Self::Transition => "transition",
            Self::Attribution => "attribution",
        }
    }
}

/// Outcome classification of a [`PatternMetricEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PatternOutcome {
    /// The operation succeeded.
    Success,
    /// The operation failed but is retryable.
    RetryableFailure,
    /// The operation failed terminally.
    NonRetryableFailure,
}

impl PatternOutcome {
    /// Stable string form, suitable as a metrics label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::RetryableFailure => "retryable_failure",
            Self::NonRetryableFailure => "non_retryable_failure",
        }
    }
}

/// A single metrics observation: which subsystem, what happened, how long
/// it took.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMetricEvent {
    /// Subsystem that produced this event.
    pub method: PatternMethod,
    /// Outcome classification.
    pub outcome: PatternOutcome,
    /// Wall-clock duration of the operation, in milliseconds.
    pub latency_ms: f64,
}

/// Sink for [`PatternMetricEvent`]s. Implementations forward to whatever
/// metrics backend a host chooses; the core never depends on one directly.
pub trait PatternMetrics: Send + Sync {
    /// Records a single completed operation.
    fn record(&self, event: PatternMetricEvent);
}

/// A [`PatternMetrics`] implementation that discards every event. Used as
/// the default when a host does not wire a real backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopMetrics;

impl PatternMetrics for NoopMetrics {
    fn record(&self, _event: PatternMetricEvent) {}
}
