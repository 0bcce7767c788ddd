// pattern-core/src/runtime/dispatch.rs
// ============================================================================
// Module: Pattern Core Dispatch Engine
// Description: Topic-to-handler routing, idempotency gate, ack/nack/DLQ.
// Purpose: The runtime backbone consuming envelopes and routing them exactly once.
// Dependencies: std::sync, crate::{core, interfaces}
// ============================================================================

//! The dispatch engine consumes envelopes from subscribed topics and routes
//! each to exactly one handler. It owns the idempotency gate keyed on
//! `(topic, event_id)` and converts [`HandlerResult`] into ack, nack (with
//! backoff), or DLQ routing.

use std::collections::HashMap;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Instant;

use crate::core::EventEnvelope;
use crate::core::Topic;
use crate::interfaces::HandlerResult;
use crate::telemetry::PatternMetricEvent;
use crate::telemetry::PatternMethod;
use crate::telemetry::PatternMetrics;
use crate::telemetry::PatternOutcome;

/// A typed handler registered against exactly one topic.
pub trait Handler: Send + Sync {
    /// Processes one envelope and reports the outcome.
    fn handle(&self, envelope: &EventEnvelope) -> HandlerResult;
}

/// Final disposition the dispatch engine gives one envelope delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The handler applied successfully (or the effect was already applied).
    Ack,
    /// A retryable failure; redelivery should be attempted with backoff.
    Nack {
        /// Reason recorded for this retry.
        reason: String,
        /// Computed backoff delay before the next attempt.
        backoff: BackoffDelay,
    },
    /// A non-retryable failure or an unroutable/undecodable envelope;
    /// routed to the dead-letter topic.
    Dlq {
        /// Topic the envelope is routed to.
        topic: Topic,
        /// Structured failure reason.
        reason: String,
    },
}

/// Exponential backoff with jitter, per the at-least-once delivery contract.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffDelay {
    /// Computed delay in milliseconds before the next redelivery attempt.
    pub delay_ms: u64,
    /// Number of attempts made so far, including this one.
    pub attempt: u32,
}

/// Computes an exponential-backoff-with-jitter delay for a given attempt
/// number (1-indexed) and a deterministic jitter seed in `[0, 1)`, so the
/// computation stays pure and testable without a real RNG.
#[must_use]
pub fn compute_backoff(attempt: u32, base_ms: u64, max_ms: u64, jitter_unit: f64) -> BackoffDelay {
    let jitter_unit = jitter_unit.clamp(0.0, 1.0);
    let exponential = base_ms.saturating_mul(1u64 << attempt.min(16));
    let capped = exponential.min(max_ms);
    #[allow(
        clippy::cast_possible_truncation,
        reason = "capped delay fits comfortably in u64 range before this multiply"
    )]
    let jittered = (capped as f64 * jitter_unit) as u64;
    BackoffDelay {
        delay_ms: jittered.max(1),
        attempt,
    }
}

/// Routing table mapping topics to handlers, scanned from typed contracts at
/// startup and frozen thereafter.
#[derive(Default)]
pub struct RoutingTable {
    routes: HashMap<Topic, Box<dyn Handler>>,
}

impl RoutingTable {
    /// Builds an empty routing table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for a topic. Returns the previous handler, if
    /// any, so callers can detect contract drift (duplicate subscriptions).
    pub fn register(&mut self, topic: Topic, handler: Box<dyn Handler>) -> Option<Box<dyn Handler>> {
        self.routes.insert(topic, handler)
    }

    fn get(&self, topic: &Topic) -> Option<&dyn Handler> {
        self.routes.get(topic).map(std::convert::AsRef::as_ref)
    }
}

/// Idempotency gate keyed on `(topic, event_id)`. Duplicate deliveries of a
/// key already marked terminal short-circuit to ack without invoking the
/// handler again. A retryable failure must never mark this key: redelivery
/// has to reach the handler again, or the nack→backoff→redelivery contract
/// never actually redelivers.
#[derive(Default)]
struct IdempotencyGate {
    seen: Mutex<HashSet<(String, String)>>,
}

impl IdempotencyGate {
    fn is_marked(&self, topic: &Topic, event_id: &str) -> bool {
        let seen = self.seen.lock().unwrap_or_else(|poison| {
            self.seen.clear_poison();
            poison.into_inner()
        });
        seen.contains(&(topic.as_str().to_string(), event_id.to_string()))
    }

    fn mark(&self, topic: &Topic, event_id: &str) {
        let mut seen = self.seen.lock().unwrap_or_else(|poison| {
            self.seen.clear_poison();
            poison.into_inner()
        });
        seen.insert((topic.as_str().to_string(), event_id.to_string()));
    }
}

/// Configuration for backoff computation, required at construction rather
/// than defaulted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DispatchConfig {
    /// Base delay in milliseconds for the first retry.
    pub backoff_base_ms: u64,
    /// Maximum delay in milliseconds a retry may wait.
    pub backoff_max_ms: u64,
    /// Dead-letter topic retryable failures route to once retries exhaust.
    pub dlq_topic: Topic,
}

/// The dispatch engine: routes envelopes to registered handlers, enforcing
/// idempotency and producing ack/nack/DLQ dispositions.
pub struct DispatchEngine {
    routes: RoutingTable,
    idempotency: IdempotencyGate,
    config: DispatchConfig,
}

impl DispatchEngine {
    /// Builds a dispatch engine over a frozen routing table.
    #[must_use]
    pub fn new(routes: RoutingTable, config: DispatchConfig) -> Self {
        Self {
            routes,
            idempotency: IdempotencyGate::default(),
            config,
        }
    }

    /// Routes one envelope to its handler, honoring the idempotency gate.
    /// `attempt` is 1 on first delivery and increments on each redelivery.
    /// Only a terminal disposition (ack or DLQ) marks the idempotency key; a
    /// retryable failure leaves it unmarked so redelivery reaches the
    /// handler again.
    pub fn dispatch(
        &self,
        envelope: &EventEnvelope,
        attempt: u32,
        jitter_unit: f64,
        metrics: &dyn PatternMetrics,
    ) -> DispatchOutcome {
        let started_at = Instant::now();

        if self.idempotency.is_marked(&envelope.topic, envelope.event_id.as_str()) {
            return DispatchOutcome::Ack;
        }

        let outcome = match self.routes.get(&envelope.topic) {
            None => DispatchOutcome::Dlq {
                topic: self.config.dlq_topic.clone(),
                reason: format!("no route registered for topic: {}", envelope.topic),
            },
            Some(handler) => match handler.handle(envelope) {
                HandlerResult::Applied | HandlerResult::AlreadyApplied => DispatchOutcome::Ack,
                HandlerResult::RetryableFailure(reason) => DispatchOutcome::Nack {
                    backoff: compute_backoff(
                        attempt,
                        self.config.backoff_base_ms,
                        self.config.backoff_max_ms,
                        jitter_unit,
                    ),
                    reason,
                },
                HandlerResult::NonRetryableFailure(_code, reason) => DispatchOutcome::Dlq {
                    topic: self.config.dlq_topic.clone(),
                    reason,
                },
            },
        };

        if !matches!(outcome, DispatchOutcome::Nack { .. }) {
            self.idempotency.mark(&envelope.topic, envelope.event_id.as_str());
        }

        metrics.record(PatternMetricEvent {
            method: PatternMethod::Dispatch,
            outcome: match outcome {
                DispatchOutcome::Ack => PatternOutcome::Success,
                DispatchOutcome::Nack { .. } => PatternOutcome::RetryableFailure,
                DispatchOutcome::Dlq { .. } => PatternOutcome::NonRetryableFailure,
            },
            latency_ms: started_at.elapsed().as_secs_f64() * 1000.0,
        });

        outcome
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
    use crate::core::CorrelationId;
    use crate::core::EventId;
    use crate::core::Timestamp;
    use crate::telemetry::NoopMetrics;

    struct AlwaysApplied;
    impl Handler for AlwaysApplied {
        fn handle(&self, _envelope: &EventEnvelope) -> HandlerResult {
            HandlerResult::Applied
        }
    }

    struct AlwaysRetryable;
    impl Handler for AlwaysRetryable {
        fn handle(&self, _envelope: &EventEnvelope) -> HandlerResult {
            HandlerResult::RetryableFailure("store unavailable".to_string())
        }
    }

    /// Fails on the first call and succeeds on every call after, so tests
    /// can exercise redelivery reaching the handler a second time.
    struct FailsOnceThenSucceeds {
        calls: Mutex<u32>,
    }

    impl Default for FailsOnceThenSucceeds {
        fn default() -> Self {
            Self { calls: Mutex::new(0) }
        }
    }

    impl Handler for FailsOnceThenSucceeds {
        fn handle(&self, _envelope: &EventEnvelope) -> HandlerResult {
            let mut calls = self.calls.lock().expect("calls lock");
            *calls += 1;
            if *calls == 1 {
                HandlerResult::RetryableFailure("store unavailable".to_string())
            } else {
                HandlerResult::Applied
            }
        }
    }

    struct AlwaysNonRetryable;
    impl Handler for AlwaysNonRetryable {
        fn handle(&self, _envelope: &EventEnvelope) -> HandlerResult {
            HandlerResult::NonRetryableFailure("GATE_FAILED".to_string(), "guard false".to_string())
        }
    }

    fn envelope(topic: &str, event_id: &str) -> EventEnvelope {
        EventEnvelope::new(
            EventId::from(event_id),
            Topic::from(topic),
            "test-event",
            CorrelationId::from("corr-1"),
            Timestamp::Logical(1),
            1,
            serde_json::Value::Null,
        )
    }

    fn config() -> DispatchConfig {
        DispatchConfig {
            backoff_base_ms: 100,
            backoff_max_ms: 10_000,
            dlq_topic: Topic::from("prod.onex.dlq.pattern.v1"),
        }
    }

    #[test]
    fn routes_to_registered_handler_and_acks_on_success() {
        let mut routes = RoutingTable::new();
        let topic = Topic::from("prod.onex.cmd.pattern.store.v1");
        routes.register(topic.clone(), Box::new(AlwaysApplied));
        let engine = DispatchEngine::new(routes, config());
        let outcome = engine.dispatch(&envelope(topic.as_str(), "e1"), 1, 0.5, &NoopMetrics);
        assert_eq!(outcome, DispatchOutcome::Ack);
    }

    #[test]
    fn unrouted_topic_goes_to_dlq() {
        let engine = DispatchEngine::new(RoutingTable::new(), config());
        let outcome = engine.dispatch(&envelope("prod.onex.cmd.unknown.v1", "e1"), 1, 0.5, &NoopMetrics);
        assert!(matches!(outcome, DispatchOutcome::Dlq { .. }));
    }

    #[test]
    fn duplicate_event_id_short_circuits_to_ack_without_reinvoking_handler() {
        let mut routes = RoutingTable::new();
        let topic = Topic::from("prod.onex.cmd.pattern.store.v1");
        routes.register(topic.clone(), Box::new(AlwaysNonRetryable));
        let engine = DispatchEngine::new(routes, config());
        let env = envelope(topic.as_str(), "e1");
        // First delivery would normally go to DLQ, but the idempotency gate
        // only fires on the *second* delivery of the same (topic, event_id).
        let first = engine.dispatch(&env, 1, 0.5, &NoopMetrics);
        assert!(matches!(first, DispatchOutcome::Dlq { .. }));
        let second = engine.dispatch(&env, 1, 0.5, &NoopMetrics);
        assert_eq!(second, DispatchOutcome::Ack);
    }

    #[test]
    fn retryable_failure_produces_nack_with_backoff() {
        let mut routes = RoutingTable::new();
        let topic = Topic::from("prod.onex.cmd.pattern.store.v1");
        routes.register(topic.clone(), Box::new(AlwaysRetryable));
        let engine = DispatchEngine::new(routes, config());
        let outcome = engine.dispatch(&envelope(topic.as_str(), "e2"), 1, 0.5, &NoopMetrics);
        match outcome {
            DispatchOutcome::Nack { backoff, .. } => assert_eq!(backoff.attempt, 1),
            other => panic!("unexpected outcome: {other:?}"),
        }
    }

    #[test]
    fn retryable_failure_leaves_the_idempotency_key_unmarked_so_redelivery_reinvokes_the_handler() {
        let mut routes = RoutingTable::new();
        let topic = Topic::from("prod.onex.cmd.pattern.store.v1");
        routes.register(topic.clone(), Box::new(FailsOnceThenSucceeds::default()));
        let engine = DispatchEngine::new(routes, config());
        let env = envelope(topic.as_str(), "e3");

        let first = engine.dispatch(&env, 1, 0.5, &NoopMetrics);
        assert!(matches!(first, DispatchOutcome::Nack { .. }));

        let redelivery = engine.dispatch(&env, 2, 0.5, &NoopMetrics);
        assert_eq!(redelivery, DispatchOutcome::Ack);
    }

    #[test]
    fn backoff_grows_exponentially_and_is_capped() {
        let first = compute_backoff(1, 100, 10_000, 1.0);
        let second = compute_backoff(2, 100, 10_000, 1.0);
        assert!(second.delay_ms > first.delay_ms);
        let capped = compute_backoff(20, 100, 10_000, 1.0);
        assert!(capped.delay_ms <= 10_000);
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

    #[test]
    fn dispatch_records_a_metric_event_per_delivery() {
        let mut routes = RoutingTable::new();
        let topic = Topic::from("prod.onex.cmd.pattern.store.v1");
        routes.register(topic.clone(), Box::new(AlwaysApplied));
        let engine = DispatchEngine::new(routes, config());
        let metrics = RecordingMetrics::default();

        let outcome = engine.dispatch(&envelope(topic.as_str(), "e4"), 1, 0.5, &metrics);
        assert_eq!(outcome, DispatchOutcome::Ack);

        let events = metrics.events.lock().expect("events lock");
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].method, PatternMethod::Dispatch);
        assert_eq!(events[0].outcome, PatternOutcome::Success);
    }
}
