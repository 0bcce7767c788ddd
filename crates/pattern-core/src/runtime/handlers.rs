// pattern-core/src/runtime/handlers.rs
// ============================================================================
// Module: Pattern Core Handlers
// Description: EffectNode/OrchestratorNode implementations wiring the FSM,
//              the decision mismatch detector, and the store/dispatcher
//              seams together.
// Purpose: Give the node archetypes declared in `runtime::nodes` a working
//          composition, not just isolated unit doubles.
// Dependencies: crate::{core, interfaces, runtime::fsm, runtime::nodes}
// ============================================================================

//! Three handlers correspond to the contracts a host wires its routing table
//! to: recording an observation and checking its eligibility for promotion
//! ([`PatternUpsertEffect`] composed with [`LifecycleTransitionEffect`] by
//! [`IngestAndPromoteOrchestrator`]), and checking a decision record's
//! rationale against its provenance ([`DecisionRecordEffect`]).

use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::core::CorrelationId;
use crate::core::DecisionRecord;
use crate::core::EventEnvelope;
use crate::core::EventId;
use crate::core::EvidenceTier;
use crate::core::IdempotencyKey;
use crate::core::LifecycleStatus;
use crate::core::MismatchDetector;
use crate::core::MismatchSignal;
use crate::core::PatternId;
use crate::core::RationaleClaim;
use crate::core::SignatureHash;
use crate::core::Timestamp;
use crate::core::envelope::TopicDescriptor;
use crate::core::envelope::TopicKind;
use crate::interfaces::Dispatcher;
use crate::interfaces::DispatchError;
use crate::interfaces::PatternStore;
use crate::interfaces::PatternStoreError;
use crate::interfaces::TransitionResult;
use crate::runtime::fsm;
use crate::runtime::fsm::AntiGamingState;
use crate::runtime::fsm::GuardFailure;
use crate::runtime::fsm::LifecycleThresholds;
use crate::runtime::nodes::ComputeNode;
use crate::runtime::nodes::EffectNode;
use crate::runtime::nodes::OrchestratorNode;
use crate::telemetry::NoopMetrics;
use crate::telemetry::PatternMetricEvent;
use crate::telemetry::PatternMethod;
use crate::telemetry::PatternMetrics;
use crate::telemetry::PatternOutcome;

/// Error taxonomy for handlers that may fail in either the store or the
/// dispatcher seam.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// The store rejected the operation.
    #[error("store failure: {0}")]
    Store(#[from] PatternStoreError),
    /// Publishing a derived event failed.
    #[error("dispatch failure: {0}")]
    Dispatch(#[from] DispatchError),
}

impl ComputeNode for MismatchDetector {
    type Input = (DecisionRecord, RationaleClaim);
    type Output = Option<MismatchSignal>;

    fn compute(&self, input: Self::Input) -> Self::Output {
        let (record, claim) = input;
        self.check_claim(&record, claim)
    }
}

/// Inputs for [`DecisionRecordEffect`].
pub struct DecisionRecordInput {
    /// The decision record to check.
    pub record: DecisionRecord,
    /// Which narrative claim to check against the record's provenance.
    pub claim: RationaleClaim,
    /// Correlation id to carry onto any emitted mismatch event.
    pub correlation_id: CorrelationId,
    /// Identifier of the emitted mismatch event, if one is emitted.
    pub event_id: EventId,
    /// Deployment environment segment used to render the mismatch topic.
    pub topic_env: String,
    /// Emission timestamp for the mismatch event, if emitted.
    pub emitted_at: Timestamp,
}

/// Checks a decision record's rationale against its provenance and, on a
/// mismatch, publishes a `decision.mismatch-detected` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecisionRecordEffect {
    detector: MismatchDetector,
}

impl EffectNode for DecisionRecordEffect {
    type Input = DecisionRecordInput;
    type Output = Option<MismatchSignal>;
    type Error = DispatchError;

    fn run(
        &self,
        input: Self::Input,
        _store: &dyn PatternStore,
        dispatcher: &dyn Dispatcher,
    ) -> Result<Self::Output, Self::Error> {
        let signal = self.detector.compute((input.record, input.claim));
        if let Some(signal) = &signal {
            let topic = TopicDescriptor {
                env: input.topic_env,
                kind: TopicKind::Event,
                domain: "decision".to_string(),
                name: "mismatch-detected".to_string(),
                schema_version: 1,
            }
            .render();
            let payload = serde_json::to_value(signal).unwrap_or(serde_json::Value::Null);
            let envelope = EventEnvelope::new(
                input.event_id,
                topic,
                "decision-mismatch-detected",
                input.correlation_id,
                input.emitted_at,
                1,
                payload,
            );
            dispatcher.dispatch(&envelope)?;
        }
        Ok(signal)
    }
}

/// Inputs for [`PatternUpsertEffect`].
pub struct PatternUpsertInput {
    /// Raw canonical signature text.
    pub signature: String,
    /// Stable fingerprint shared across all versions of this lineage.
    pub signature_hash: SignatureHash,
    /// Time this observation arrived.
    pub observed_at: Timestamp,
    /// Correlation id to carry onto the emitted `pattern.stored` event.
    pub correlation_id: CorrelationId,
    /// Identifier of the emitted `pattern.stored` event.
    pub event_id: EventId,
    /// Deployment environment segment used to render the event topic.
    pub topic_env: String,
}

/// Upserts a pattern lineage and publishes a `pattern.stored` event. Records
/// a `Transition` metric around the store mutation.
#[derive(Clone)]
pub struct PatternUpsertEffect {
    metrics: Arc<dyn PatternMetrics>,
}

impl Default for PatternUpsertEffect {
    fn default() -> Self {
        Self::new(Arc::new(NoopMetrics))
    }
}

impl PatternUpsertEffect {
    /// Builds the effect, recording store-mutation metrics through `metrics`.
    #[must_use]
    pub fn new(metrics: Arc<dyn PatternMetrics>) -> Self {
        Self { metrics }
    }
}

impl EffectNode for PatternUpsertEffect {
    type Input = PatternUpsertInput;
    type Output = PatternId;
    type Error = HandlerError;

    fn run(
        &self,
        input: Self::Input,
        store: &dyn PatternStore,
        dispatcher: &dyn Dispatcher,
    ) -> Result<Self::Output, Self::Error> {
        let started_at = Instant::now();
        let upserted = store.upsert_pattern(&input.signature, &input.signature_hash, input.observed_at);
        self.metrics.record(PatternMetricEvent {
            method: PatternMethod::Transition,
            outcome: match &upserted {
                Ok(_) => PatternOutcome::Success,
                Err(PatternStoreError::TransientIo(_)) => PatternOutcome::RetryableFailure,
                Err(_) => PatternOutcome::NonRetryableFailure,
            },
            latency_ms: started_at.elapsed().as_secs_f64() * 1000.0,
        });
        let pattern_id = upserted?;
        let topic = TopicDescriptor {
            env: input.topic_env,
            kind: TopicKind::Event,
            domain: "pattern".to_string(),
            name: "stored".to_string(),
            schema_version: 1,
        }
        .render();
        let payload = serde_json::json!({
            "pattern_id": pattern_id.as_str(),
            "signature_hash": input.signature_hash.as_str(),
        });
        let envelope = EventEnvelope::new(
            input.event_id,
            topic,
            "pattern-stored",
            input.correlation_id,
            input.observed_at,
            1,
            payload,
        );
        dispatcher.dispatch(&envelope)?;
        Ok(pattern_id)
    }
}

/// Inputs for [`LifecycleTransitionEffect`].
pub struct LifecycleTransitionInput {
    /// Pattern to transition.
    pub pattern_id: PatternId,
    /// Target lifecycle status.
    pub to_status: LifecycleStatus,
    /// Evidence tier backing this attempt; advances the pattern's stored
    /// tier on success, never regresses it.
    pub evidence_tier: EvidenceTier,
    /// Current anti-gaming alert state for this pattern.
    pub anti_gaming: AntiGamingState,
    /// Promotion/demotion thresholds to evaluate the guard against.
    pub thresholds: LifecycleThresholds,
    /// Idempotency key scoping this attempt to at-most-once application.
    pub idempotency_key: IdempotencyKey,
    /// Time this transition is being applied.
    pub applied_at: Timestamp,
    /// Correlation id to carry onto the emitted transition event.
    pub correlation_id: CorrelationId,
    /// Identifier of the emitted transition event, if one is applied.
    pub event_id: EventId,
    /// Deployment environment segment used to render the event topic.
    pub topic_env: String,
}

/// Result of one [`LifecycleTransitionEffect`] attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleTransitionOutcome {
    /// The transition was applied and an event published.
    Applied,
    /// A prior attempt with this idempotency key already applied it.
    AlreadyApplied,
    /// The pattern's current status no longer matched the expected one.
    Stale,
    /// The guard did not hold; `GuardFailure` explains why.
    NotReady(GuardFailure),
}

/// Checks the FSM guard for `pattern_id → to_status` and, if it holds, asks
/// the store to apply the transition and publishes the corresponding event.
/// Records a `Transition` metric around the store mutation.
#[derive(Clone)]
pub struct LifecycleTransitionEffect {
    metrics: Arc<dyn PatternMetrics>,
}

impl Default for LifecycleTransitionEffect {
    fn default() -> Self {
        Self::new(Arc::new(NoopMetrics))
    }
}

impl LifecycleTransitionEffect {
    /// Builds the effect, recording store-mutation metrics through `metrics`.
    #[must_use]
    pub fn new(metrics: Arc<dyn PatternMetrics>) -> Self {
        Self { metrics }
    }

    fn event_name(to_status: LifecycleStatus) -> &'static str {
        match to_status {
            LifecycleStatus::Validated => "promoted",
            LifecycleStatus::Deprecated | LifecycleStatus::Blacklisted => "demoted",
            LifecycleStatus::Candidate | LifecycleStatus::Provisional => "lifecycle-transitioned",
        }
    }
}

impl EffectNode for LifecycleTransitionEffect {
    type Input = LifecycleTransitionInput;
    type Output = LifecycleTransitionOutcome;
    type Error = HandlerError;

    fn run(
        &self,
        input: Self::Input,
        store: &dyn PatternStore,
        dispatcher: &dyn Dispatcher,
    ) -> Result<Self::Output, Self::Error> {
        let Some(pattern) = store.get_pattern(&input.pattern_id)? else {
            return Err(HandlerError::Store(PatternStoreError::UnknownSignature(
                input.pattern_id.as_str().to_string(),
            )));
        };
        let from_status = pattern.lifecycle_status;

        if let Err(guard_failure) = fsm::evaluate_transition(
            from_status,
            input.to_status,
            input.evidence_tier,
            &pattern.rolling_metrics,
            input.anti_gaming,
            &input.thresholds,
        ) {
            return Ok(LifecycleTransitionOutcome::NotReady(guard_failure));
        }

        let gate_snapshot = crate::core::GateSnapshot {
            evidence_tier: input.evidence_tier,
            injection_count: pattern.rolling_metrics.injection_count,
            success_rate: pattern.rolling_metrics.success_rate(),
            consecutive_failures: pattern.rolling_metrics.consecutive_failures,
        };

        let started_at = Instant::now();
        let applied = store.apply_transition(
            &input.pattern_id,
            from_status,
            input.to_status,
            input.evidence_tier,
            gate_snapshot,
            &input.idempotency_key,
            input.applied_at,
        );
        self.metrics.record(PatternMetricEvent {
            method: PatternMethod::Transition,
            outcome: match &applied {
                Ok(TransitionResult::Applied | TransitionResult::AlreadyApplied) => PatternOutcome::Success,
                Ok(TransitionResult::StaleStatus | TransitionResult::GateFailed) => {
                    PatternOutcome::NonRetryableFailure
                }
                Err(PatternStoreError::TransientIo(_)) => PatternOutcome::RetryableFailure,
                Err(_) => PatternOutcome::NonRetryableFailure,
            },
            latency_ms: started_at.elapsed().as_secs_f64() * 1000.0,
        });

        match applied? {
            TransitionResult::AlreadyApplied => Ok(LifecycleTransitionOutcome::AlreadyApplied),
            TransitionResult::StaleStatus => Ok(LifecycleTransitionOutcome::Stale),
            TransitionResult::GateFailed => {
                Ok(LifecycleTransitionOutcome::NotReady(GuardFailure::GateNotSatisfied))
            }
            TransitionResult::Applied => {
                let event_name = Self::event_name(input.to_status);
                let topic = TopicDescriptor {
                    env: input.topic_env,
                    kind: TopicKind::Event,
                    domain: "pattern".to_string(),
                    name: event_name.to_string(),
                    schema_version: 1,
                }
                .render();
                let payload = serde_json::json!({
                    "pattern_id": input.pattern_id.as_str(),
                    "from_status": from_status,
                    "to_status": input.to_status,
                });
                let envelope = EventEnvelope::new(
                    input.event_id,
                    topic,
                    event_name,
                    input.correlation_id,
                    input.applied_at,
                    1,
                    payload,
                );
                dispatcher.dispatch(&envelope)?;
                Ok(LifecycleTransitionOutcome::Applied)
            }
        }
    }
}

/// Inputs for [`IngestAndPromoteOrchestrator`].
pub struct IngestAndPromoteInput {
    /// Arguments for the upsert stage.
    pub upsert: PatternUpsertInput,
    /// Status to attempt promoting to immediately after the upsert.
    pub to_status: LifecycleStatus,
    /// Evidence tier backing the transition attempt.
    pub evidence_tier: EvidenceTier,
    /// Current anti-gaming alert state for this pattern.
    pub anti_gaming: AntiGamingState,
    /// Promotion/demotion thresholds to evaluate the guard against.
    pub thresholds: LifecycleThresholds,
    /// Idempotency key scoping the transition attempt.
    pub idempotency_key: IdempotencyKey,
    /// Identifier of the emitted transition event, if one is applied.
    pub transition_event_id: EventId,
}

/// Result of [`IngestAndPromoteOrchestrator::orchestrate`].
pub struct IngestAndPromoteOutput {
    /// Identifier of the upserted (or pre-existing) pattern lineage.
    pub pattern_id: PatternId,
    /// Result of the immediately-following transition attempt.
    pub transition: LifecycleTransitionOutcome,
}

/// Coordinates [`PatternUpsertEffect`] and [`LifecycleTransitionEffect`]:
/// upserts an observation, then immediately checks whether it is eligible
/// for promotion. Holds no store or dispatcher access of its own; every
/// side effect happens through one of the two delegate nodes.
pub struct IngestAndPromoteOrchestrator<'a> {
    store: &'a dyn PatternStore,
    dispatcher: &'a dyn Dispatcher,
    upsert: PatternUpsertEffect,
    transition: LifecycleTransitionEffect,
}

impl<'a> IngestAndPromoteOrchestrator<'a> {
    /// Builds an orchestrator over the given store and dispatcher seams,
    /// with no metrics sink wired (see [`Self::with_metrics`]).
    #[must_use]
    pub fn new(store: &'a dyn PatternStore, dispatcher: &'a dyn Dispatcher) -> Self {
        Self::with_metrics(store, dispatcher, Arc::new(NoopMetrics))
    }

    /// Builds an orchestrator whose delegate effects record store-mutation
    /// metrics through `metrics`.
    #[must_use]
    pub fn with_metrics(
        store: &'a dyn PatternStore,
        dispatcher: &'a dyn Dispatcher,
        metrics: Arc<dyn PatternMetrics>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            upsert: PatternUpsertEffect::new(metrics.clone()),
            transition: LifecycleTransitionEffect::new(metrics),
        }
    }
}

impl OrchestratorNode for IngestAndPromoteOrchestrator<'_> {
    type Input = IngestAndPromoteInput;
    type Output = Result<IngestAndPromoteOutput, HandlerError>;

    fn orchestrate(&self, input: Self::Input) -> Self::Output {
        let correlation_id = input.upsert.correlation_id.clone();
        let topic_env = input.upsert.topic_env.clone();
        let applied_at = input.upsert.observed_at;

        let pattern_id = self.upsert.run(input.upsert, self.store, self.dispatcher)?;

        let transition = self.transition.run(
            LifecycleTransitionInput {
                pattern_id: pattern_id.clone(),
                to_status: input.to_status,
                evidence_tier: input.evidence_tier,
                anti_gaming: input.anti_gaming,
                thresholds: input.thresholds,
                idempotency_key: input.idempotency_key,
                applied_at,
                correlation_id,
                event_id: input.transition_event_id,
                topic_env,
            },
            self.store,
            self.dispatcher,
        )?;

        Ok(IngestAndPromoteOutput { pattern_id, transition })
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
    use std::sync::Mutex;

    use super::*;
    use crate::core::CandidateScore;
    use crate::core::DecisionId;
    use crate::core::DecisionType;
    use crate::core::Outcome;
    use crate::core::Provenance;
    use crate::core::TieBreaker;
    use crate::runtime::nodes::DiscardingDispatcher;
    use crate::runtime::store_mem::InMemoryPatternStore;

    #[derive(Default)]
    struct RecordingDispatcher {
        envelopes: Mutex<Vec<EventEnvelope>>,
    }

    impl Dispatcher for RecordingDispatcher {
        fn dispatch(&self, envelope: &EventEnvelope) -> Result<(), DispatchError> {
            self.envelopes
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .push(envelope.clone());
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingMetrics {
        events: Mutex<Vec<PatternMetricEvent>>,
    }

    impl PatternMetrics for RecordingMetrics {
        fn record(&self, event: PatternMetricEvent) {
            self.events.lock().expect("events lock").push(event);
        }
    }

    fn thresholds() -> LifecycleThresholds {
        LifecycleThresholds {
            injection_count_min: 5,
            success_rate_min: 0.60,
            consecutive_failures_max: 3,
            demotion_success_rate: 0.40,
            demotion_consecutive_failures: 5,
        }
    }

    #[test]
    fn pattern_upsert_effect_publishes_a_stored_event() {
        let store = InMemoryPatternStore::new();
        let dispatcher = RecordingDispatcher::default();
        let effect = PatternUpsertEffect::default();
        let pattern_id = effect
            .run(
                PatternUpsertInput {
                    signature: "sig".to_string(),
                    signature_hash: SignatureHash::from("h1"),
                    observed_at: Timestamp::Logical(1),
                    correlation_id: CorrelationId::from("corr-1"),
                    event_id: EventId::from("e1"),
                    topic_env: "prod".to_string(),
                },
                &store,
                &dispatcher,
            )
            .expect("effect succeeds");
        assert!(store.get_pattern(&pattern_id).expect("query").is_some());
        let envelopes = dispatcher.envelopes.lock().expect("lock");
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].event_type, "pattern-stored");
    }

    #[test]
    fn lifecycle_transition_effect_reports_not_ready_before_the_gate_holds() {
        let store = InMemoryPatternStore::new();
        let dispatcher = DiscardingDispatcher;
        let pattern_id = store
            .upsert_pattern("sig", &SignatureHash::from("h1"), Timestamp::Logical(1))
            .expect("upsert");
        let effect = LifecycleTransitionEffect::default();
        let outcome = effect
            .run(
                LifecycleTransitionInput {
                    pattern_id,
                    to_status: LifecycleStatus::Provisional,
                    evidence_tier: EvidenceTier::Unmeasured,
                    anti_gaming: AntiGamingState { alert_active: false },
                    thresholds: thresholds(),
                    idempotency_key: IdempotencyKey::from("k1"),
                    applied_at: Timestamp::Logical(2),
                    correlation_id: CorrelationId::from("corr-1"),
                    event_id: EventId::from("e1"),
                    topic_env: "prod".to_string(),
                },
                &store,
                &dispatcher,
            )
            .expect("effect succeeds");
        assert!(matches!(outcome, LifecycleTransitionOutcome::NotReady(_)));
    }

    #[test]
    fn ingest_and_promote_orchestrator_promotes_an_eligible_pattern() {
        let store = InMemoryPatternStore::new();
        let dispatcher = RecordingDispatcher::default();
        let pattern_id = store
            .upsert_pattern("sig", &SignatureHash::from("h1"), Timestamp::Logical(1))
            .expect("seed upsert");
        store
            .record_outcome(&pattern_id, Outcome::Success, 1.0)
            .expect("seed outcome");

        let metrics = Arc::new(RecordingMetrics::default());
        let orchestrator =
            IngestAndPromoteOrchestrator::with_metrics(&store, &dispatcher, metrics.clone());
        let result = orchestrator
            .orchestrate(IngestAndPromoteInput {
                upsert: PatternUpsertInput {
                    signature: "sig".to_string(),
                    signature_hash: SignatureHash::from("h1"),
                    observed_at: Timestamp::Logical(2),
                    correlation_id: CorrelationId::from("corr-1"),
                    event_id: EventId::from("e1"),
                    topic_env: "prod".to_string(),
                },
                to_status: LifecycleStatus::Provisional,
                evidence_tier: EvidenceTier::Observed,
                anti_gaming: AntiGamingState { alert_active: false },
                thresholds: thresholds(),
                idempotency_key: IdempotencyKey::from("k1"),
                transition_event_id: EventId::from("e2"),
            })
            .expect("orchestration succeeds");

        assert_eq!(result.pattern_id, pattern_id);
        assert_eq!(result.transition, LifecycleTransitionOutcome::Applied);
        let envelopes = dispatcher.envelopes.lock().expect("lock");
        assert_eq!(envelopes.len(), 2);
        assert_eq!(envelopes[1].event_type, "lifecycle-transitioned");

        let events = metrics.events.lock().expect("events lock");
        assert_eq!(events.len(), 2);
        assert!(events.iter().all(|event| event.method == PatternMethod::Transition));
        assert!(events.iter().all(|event| event.outcome == PatternOutcome::Success));
    }

    #[test]
    fn decision_record_effect_publishes_a_mismatch_event_when_detected() {
        let store = InMemoryPatternStore::new();
        let dispatcher = RecordingDispatcher::default();
        let effect = DecisionRecordEffect::default();
        let record = DecisionRecord {
            decision_id: DecisionId::from("d1"),
            decision_type: DecisionType::PatternSelection,
            provenance: Provenance {
                candidates: vec![
                    CandidateScore {
                        candidate_id: PatternId::from("x"),
                        total_score: 0.2,
                        feature_contributions: vec![],
                    },
                    CandidateScore {
                        candidate_id: PatternId::from("y"),
                        total_score: 0.9,
                        feature_contributions: vec![],
                    },
                ],
                tie_breaker: TieBreaker::None,
            },
            chosen_id: PatternId::from("x"),
            agent_rationale: "chose x for highest score".to_string(),
            recorded_at: Timestamp::Logical(1),
        };
        let signal = effect
            .run(
                DecisionRecordInput {
                    record,
                    claim: RationaleClaim::HighestScore,
                    correlation_id: CorrelationId::from("corr-1"),
                    event_id: EventId::from("e1"),
                    topic_env: "prod".to_string(),
                    emitted_at: Timestamp::Logical(1),
                },
                &store,
                &dispatcher,
            )
            .expect("effect succeeds");
        assert!(signal.is_some());
        let envelopes = dispatcher.envelopes.lock().expect("lock");
        assert_eq!(envelopes.len(), 1);
        assert_eq!(envelopes[0].event_type, "decision-mismatch-detected");
    }

    #[test]
    fn decision_record_effect_is_silent_when_no_mismatch() {
        let store = InMemoryPatternStore::new();
        let dispatcher = RecordingDispatcher::default();
        let effect = DecisionRecordEffect::default();
        let record = DecisionRecord {
            decision_id: DecisionId::from("d1"),
            decision_type: DecisionType::PatternSelection,
            provenance: Provenance {
                candidates: vec![CandidateScore {
                    candidate_id: PatternId::from("x"),
                    total_score: 0.9,
                    feature_contributions: vec![],
                }],
                tie_breaker: TieBreaker::None,
            },
            chosen_id: PatternId::from("x"),
            agent_rationale: "chose x for highest score".to_string(),
            recorded_at: Timestamp::Logical(1),
        };
        let signal = effect
            .run(
                DecisionRecordInput {
                    record,
                    claim: RationaleClaim::HighestScore,
                    correlation_id: CorrelationId::from("corr-1"),
                    event_id: EventId::from("e1"),
                    topic_env: "prod".to_string(),
                    emitted_at: Timestamp::Logical(1),
                },
                &store,
                &dispatcher,
            )
            .expect("effect succeeds");
        assert!(signal.is_none());
        assert!(dispatcher.envelopes.lock().expect("lock").is_empty());
    }
}
