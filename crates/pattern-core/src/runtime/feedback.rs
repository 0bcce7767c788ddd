// pattern-core/src/runtime/feedback.rs
// ============================================================================
// Module: Pattern Core Feedback Loop
// Description: Joins session outcomes to prior injections; updates metrics.
// Purpose: Implement the feedback & attribution loop end to end.
// Dependencies: crate::{core, interfaces}
// ============================================================================

//! Fetches the injections for a session, computes the evidence tier the
//! outcome's signals support, splits credit across injections with a
//! configured heuristic, and updates each contributing pattern's rolling
//! metrics in turn. Per-pattern failures are isolated: one pattern's error
//! does not block the others.

use std::collections::HashMap;
use std::collections::HashSet;
use std::time::Instant;

use crate::core::Attribution;
use crate::core::AttributedInjection;
use crate::core::AttributionHeuristic;
use crate::core::AttributionId;
use crate::core::EvidenceTier;
use crate::core::Outcome;
use crate::core::PatternId;
use crate::core::PatternInjection;
use crate::core::SessionId;
use crate::core::SessionOutcome;
use crate::core::Timestamp;
use crate::interfaces::PatternStore;
use crate::interfaces::PatternStoreError;
use crate::telemetry::PatternMetricEvent;
use crate::telemetry::PatternMethod;
use crate::telemetry::PatternMetrics;
use crate::telemetry::PatternOutcome;

/// Status of one feedback-loop run over a single [`SessionOutcome`].
#[derive(Debug, Clone, PartialEq)]
pub enum FeedbackStatus {
    /// No injections were found for this session; nothing to attribute.
    NoInjectionsFound,
    /// This session was already recorded; idempotent short-circuit.
    AlreadyRecorded,
    /// Every contributing pattern's metric update succeeded.
    Success(Attribution),
    /// Some pattern updates succeeded and some failed.
    PartialSuccess {
        /// The attribution record computed regardless of per-pattern errors.
        attribution: Attribution,
        /// Per-pattern errors keyed by the pattern that failed to update.
        errors: HashMap<PatternId, String>,
    },
}

/// Derives the evidence tier an outcome's signals support. Presence of
/// automated test results, or a `run_id` that itself succeeded, yields at
/// least `MEASURED`; otherwise any recorded outcome yields `OBSERVED`. The
/// result is only ever combined via [`EvidenceTier::advance_to`] by the
/// caller, never applied as a downgrade.
#[must_use]
pub fn evidence_tier_from_signals(outcome: &SessionOutcome) -> EvidenceTier {
    if outcome.evidence_signals.test_results.is_some() {
        return EvidenceTier::Measured;
    }
    if outcome.run_id.is_some() && outcome.run_succeeded == Some(true) {
        return EvidenceTier::Measured;
    }
    EvidenceTier::Observed
}

/// Tracks which `session_id`s have already been recorded, supporting the
/// `ALREADY_RECORDED` idempotent short-circuit independent of the store.
#[derive(Debug, Default)]
pub struct RecordedSessions {
    seen: HashSet<String>,
}

impl RecordedSessions {
    /// Builds an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `session_id` recorded, returning whether it was already
    /// present.
    pub fn mark(&mut self, session_id: &SessionId) -> bool {
        !self.seen.insert(session_id.as_str().to_string())
    }
}

/// Runs the feedback & attribution loop for one outcome against the
/// injections fetched for its session.
#[allow(clippy::too_many_arguments, reason = "mirrors the feedback-loop contract directly")]
pub fn process_outcome(
    store: &dyn PatternStore,
    recorded: &mut RecordedSessions,
    injections: &[PatternInjection],
    outcome: &SessionOutcome,
    heuristic: AttributionHeuristic,
    attribution_id: AttributionId,
    computed_at: Timestamp,
    metrics: &dyn PatternMetrics,
) -> FeedbackStatus {
    if injections.is_empty() {
        return FeedbackStatus::NoInjectionsFound;
    }
    if recorded.mark(&outcome.session_id) {
        return FeedbackStatus::AlreadyRecorded;
    }

    let weights = heuristic.split(injections.len());
    let shares: Vec<AttributedInjection> = injections
        .iter()
        .zip(weights.iter())
        .map(|(injection, weight)| AttributedInjection {
            injection_id: injection.injection_id.clone(),
            pattern_id: injection.pattern_id.clone(),
            weight: *weight,
        })
        .collect();

    let attribution = Attribution {
        attribution_id,
        session_id: outcome.session_id.clone(),
        correlation_id: outcome.correlation_id.clone(),
        heuristic,
        heuristic_confidence: heuristic.confidence(),
        shares,
        computed_at,
    };

    let started_at = Instant::now();
    let mut errors = HashMap::new();
    let mut any_retryable = false;
    for share in &attribution.shares {
        if let Err(err) = store.record_outcome(&share.pattern_id, outcome.outcome, share.weight) {
            if matches!(err, PatternStoreError::TransientIo(_)) {
                any_retryable = true;
            }
            errors.insert(share.pattern_id.clone(), describe_store_error(&err));
        }
    }

    metrics.record(PatternMetricEvent {
        method: PatternMethod::Attribution,
        outcome: if errors.is_empty() {
            PatternOutcome::Success
        } else if any_retryable {
            PatternOutcome::RetryableFailure
        } else {
            PatternOutcome::NonRetryableFailure
        },
        latency_ms: started_at.elapsed().as_secs_f64() * 1000.0,
    });

    if errors.is_empty() {
        FeedbackStatus::Success(attribution)
    } else {
        FeedbackStatus::PartialSuccess { attribution, errors }
    }
}

fn describe_store_error(err: &PatternStoreError) -> String {
    err.to_string()
}

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test assertions may unwrap, expect, or panic on failure"
    )]
    use std::sync::Mutex;

    use super::*;
    use crate::core::Cohort;
    use crate::core::ContextType;
    use crate::core::CorrelationId;
    use crate::core::EvidenceSignals;
    use crate::core::InjectionId;
    use crate::core::SignatureHash;
    use crate::runtime::store_mem::InMemoryPatternStore;
    use crate::telemetry::NoopMetrics;

    #[derive(Default)]
    struct RecordingMetrics {
        events: Mutex<Vec<PatternMetricEvent>>,
    }

    impl PatternMetrics for RecordingMetrics {
        fn record(&self, event: PatternMetricEvent) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    fn injection(pattern_id: &str, session_id: &str) -> PatternInjection {
        PatternInjection {
            injection_id: InjectionId::from(format!("inj-{pattern_id}")),
            pattern_id: PatternId::from(pattern_id),
            session_id: SessionId::from(session_id),
            correlation_id: CorrelationId::from("corr-1"),
            context_type: ContextType::SystemPrompt,
            cohort: Cohort::Treatment,
            injected_at: Timestamp::Logical(1),
        }
    }

    fn outcome(session_id: &str, result: Outcome) -> SessionOutcome {
        SessionOutcome {
            session_id: SessionId::from(session_id),
            outcome: result,
            correlation_id: CorrelationId::from("corr-1"),
            run_id: None,
            run_succeeded: None,
            evidence_signals: EvidenceSignals::empty(),
        }
    }

    #[test]
    fn no_injections_found_short_circuits() {
        let store = InMemoryPatternStore::new();
        let mut recorded = RecordedSessions::new();
        let result = process_outcome(
            &store,
            &mut recorded,
            &[],
            &outcome("s1", Outcome::Success),
            AttributionHeuristic::EqualSplit,
            AttributionId::from("a1"),
            Timestamp::Logical(1),
            &NoopMetrics,
        );
        assert_eq!(result, FeedbackStatus::NoInjectionsFound);
    }

    #[test]
    fn already_recorded_session_short_circuits_on_second_call() {
        let store = InMemoryPatternStore::new();
        let mut recorded = RecordedSessions::new();
        let hash = SignatureHash::from("h1");
        store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("upsert succeeds");
        let injections = vec![injection("p-1", "s1")];
        let first = process_outcome(
            &store,
            &mut recorded,
            &injections,
            &outcome("s1", Outcome::Success),
            AttributionHeuristic::EqualSplit,
            AttributionId::from("a1"),
            Timestamp::Logical(1),
            &NoopMetrics,
        );
        assert!(matches!(first, FeedbackStatus::PartialSuccess { .. } | FeedbackStatus::Success(_)));

        let second = process_outcome(
            &store,
            &mut recorded,
            &injections,
            &outcome("s1", Outcome::Success),
            AttributionHeuristic::EqualSplit,
            AttributionId::from("a2"),
            Timestamp::Logical(2),
            &NoopMetrics,
        );
        assert_eq!(second, FeedbackStatus::AlreadyRecorded);
    }

    #[test]
    fn attribution_mass_sums_to_one_for_multiple_injections() {
        let store = InMemoryPatternStore::new();
        let mut recorded = RecordedSessions::new();
        store
            .upsert_pattern("p1", &SignatureHash::from("h1"), Timestamp::Logical(1))
            .expect("upsert");
        store
            .upsert_pattern("p2", &SignatureHash::from("h2"), Timestamp::Logical(1))
            .expect("upsert");
        let injections = vec![injection("p-1", "s1"), injection("p-2", "s1")];
        let metrics = RecordingMetrics::default();
        let result = process_outcome(
            &store,
            &mut recorded,
            &injections,
            &outcome("s1", Outcome::Success),
            AttributionHeuristic::RecencyWeighted,
            AttributionId::from("a1"),
            Timestamp::Logical(2),
            &metrics,
        );
        let attribution = match result {
            FeedbackStatus::Success(attribution) => attribution,
            FeedbackStatus::PartialSuccess { attribution, .. } => attribution,
            other => panic!("unexpected feedback status: {other:?}"),
        };
        assert!((attribution.total_weight() - 1.0).abs() < 1e-9);

        let events = metrics.events.lock().expect("events lock");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].method, PatternMethod::Attribution);
        assert_eq!(events[0].outcome, PatternOutcome::Success);
    }

    #[test]
    fn evidence_tier_is_measured_when_test_results_present() {
        let mut outcome = outcome("s1", Outcome::Success);
        outcome.evidence_signals.test_results = Some(serde_json::json!({"passed": true}));
        assert_eq!(evidence_tier_from_signals(&outcome), EvidenceTier::Measured);
    }

    #[test]
    fn evidence_tier_is_observed_without_structured_signals() {
        let outcome = outcome("s1", Outcome::Success);
        assert_eq!(evidence_tier_from_signals(&outcome), EvidenceTier::Observed);
    }

    #[test]
    fn evidence_tier_is_measured_when_run_id_succeeded() {
        let mut outcome = outcome("s1", Outcome::Success);
        outcome.run_id = Some("run-1".to_string());
        outcome.run_succeeded = Some(true);
        assert_eq!(evidence_tier_from_signals(&outcome), EvidenceTier::Measured);
    }
}
