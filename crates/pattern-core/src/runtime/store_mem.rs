// pattern-core/src/runtime/store_mem.rs
// ============================================================================
// Module: Pattern Core In-Memory Store
// Description: Arc<Mutex<..>>-backed PatternStore for tests and small hosts.
// Purpose: A dependency-free reference implementation of the store interface.
// Dependencies: std::sync, crate::{core, interfaces, runtime::fsm}
// ============================================================================

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::Mutex;

use crate::core::EventEnvelope;
use crate::core::EvidenceTier;
use crate::core::GateSnapshot;
use crate::core::IdempotencyKey;
use crate::core::LifecycleAuditLog;
use crate::core::LifecycleAuditRecord;
use crate::core::LifecycleStatus;
use crate::core::Outcome;
use crate::core::Pattern;
use crate::core::PatternId;
use crate::core::SignatureHash;
use crate::core::Timestamp;
use crate::core::WeightedOutcome;
use crate::interfaces::PatternQuery;
use crate::interfaces::PatternStore;
use crate::interfaces::PatternStoreError;
use crate::interfaces::TransitionResult;
use crate::runtime::fsm;

#[derive(Debug, Clone, Default)]
struct LineageState {
    /// All versions of this lineage, newest last; only the last is mutable.
    versions: Vec<Pattern>,
    /// Append-only lifecycle audit log for this lineage, keyed for idempotency.
    audit: LifecycleAuditLog,
}

/// In-memory [`PatternStore`] backed by a mutex-guarded map keyed on
/// `signature_hash`. Suitable for tests and single-process hosts; durable
/// hosts use `pattern-store-sqlite` instead.
#[derive(Debug, Default)]
pub struct InMemoryPatternStore {
    lineages: Mutex<BTreeMap<String, LineageState>>,
    next_pattern_seq: Mutex<u64>,
}

impl InMemoryPatternStore {
    /// Builds an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn next_pattern_id(&self) -> PatternId {
        let mut seq = self.next_pattern_seq.lock().unwrap_or_else(|poison| {
            self.next_pattern_seq.clear_poison();
            poison.into_inner()
        });
        *seq += 1;
        PatternId::new(format!("p-{seq}"))
    }
}

impl PatternStore for InMemoryPatternStore {
    fn upsert_pattern(
        &self,
        signature: &str,
        signature_hash: &SignatureHash,
        observed_at: Timestamp,
    ) -> Result<PatternId, PatternStoreError> {
        let mut lineages = self.lineages.lock().map_err(|_| {
            PatternStoreError::TransientIo("in-memory store mutex poisoned".to_string())
        })?;
        if let Some(existing) = lineages.get(signature_hash.as_str()) {
            if let Some(latest) = existing.versions.last() {
                return Ok(latest.pattern_id.clone());
            }
        }
        let digest = crate::core::hashing::hash_canonical_json(
            crate::core::DEFAULT_HASH_ALGORITHM,
            signature,
        )
        .map_err(|err| PatternStoreError::Invariant(err.to_string()))?;
        let pattern_id = self.next_pattern_id();
        let pattern = Pattern::new_candidate(
            pattern_id.clone(),
            signature_hash.clone(),
            signature,
            digest,
            observed_at,
            crate::core::DEFAULT_ROLLING_WINDOW,
        );
        lineages
            .entry(signature_hash.as_str().to_string())
            .or_default()
            .versions
            .push(pattern);
        Ok(pattern_id)
    }

    fn start_new_version(
        &self,
        signature_hash: &SignatureHash,
        signature: &str,
        observed_at: Timestamp,
    ) -> Result<PatternId, PatternStoreError> {
        let mut lineages = self.lineages.lock().map_err(|_| {
            PatternStoreError::TransientIo("in-memory store mutex poisoned".to_string())
        })?;
        let lineage = lineages.get_mut(signature_hash.as_str()).ok_or_else(|| {
            PatternStoreError::UnknownSignature(signature_hash.as_str().to_string())
        })?;
        let previous = lineage
            .versions
            .last()
            .ok_or_else(|| PatternStoreError::UnknownSignature(signature_hash.as_str().to_string()))?;
        let next_version = previous.version + 1;
        let digest = crate::core::hashing::hash_canonical_json(
            crate::core::DEFAULT_HASH_ALGORITHM,
            signature,
        )
        .map_err(|err| PatternStoreError::Invariant(err.to_string()))?;
        let pattern_id = self.next_pattern_id();
        let mut next = Pattern::new_candidate(
            pattern_id.clone(),
            signature_hash.clone(),
            signature,
            digest,
            observed_at,
            crate::core::DEFAULT_ROLLING_WINDOW,
        );
        next.version = next_version;
        lineage.versions.push(next);
        Ok(pattern_id)
    }

    #[allow(clippy::too_many_arguments, reason = "mirrors the store interface contract directly")]
    fn apply_transition(
        &self,
        pattern_id: &PatternId,
        from_status: LifecycleStatus,
        to_status: LifecycleStatus,
        evidence_tier: EvidenceTier,
        gate_snapshot: GateSnapshot,
        idempotency_key: &IdempotencyKey,
        applied_at: Timestamp,
    ) -> Result<TransitionResult, PatternStoreError> {
        let mut lineages = self.lineages.lock().map_err(|_| {
            PatternStoreError::TransientIo("in-memory store mutex poisoned".to_string())
        })?;
        let lineage = lineages
            .values_mut()
            .find(|lineage| {
                lineage
                    .versions
                    .last()
                    .is_some_and(|pattern| &pattern.pattern_id == pattern_id)
            })
            .ok_or_else(|| PatternStoreError::UnknownSignature(pattern_id.as_str().to_string()))?;

        if lineage.audit.contains_key(idempotency_key) {
            return Ok(TransitionResult::AlreadyApplied);
        }

        let pattern = lineage
            .versions
            .last_mut()
            .ok_or_else(|| PatternStoreError::UnknownSignature(pattern_id.as_str().to_string()))?;

        if pattern.lifecycle_status != from_status {
            return Ok(TransitionResult::StaleStatus);
        }

        let thresholds = fsm::LifecycleThresholds {
            injection_count_min: 5,
            success_rate_min: 0.60,
            consecutive_failures_max: 3,
            demotion_success_rate: 0.40,
            demotion_consecutive_failures: 5,
        };
        let guard = fsm::evaluate_transition(
            from_status,
            to_status,
            evidence_tier,
            &pattern.rolling_metrics,
            fsm::AntiGamingState { alert_active: false },
            &thresholds,
        );
        if guard.is_err() {
            return Ok(TransitionResult::GateFailed);
        }

        pattern.lifecycle_status = to_status;
        pattern.evidence_tier = pattern.evidence_tier.advance_to(evidence_tier);
        pattern.last_transitioned_at = applied_at;

        lineage.audit.push(LifecycleAuditRecord {
            pattern_id: pattern_id.clone(),
            idempotency_key: idempotency_key.clone(),
            from_status,
            to_status,
            gate_snapshot,
            applied_at,
        });

        Ok(TransitionResult::Applied)
    }

    fn record_outcome(
        &self,
        pattern_id: &PatternId,
        outcome: Outcome,
        weight: f64,
    ) -> Result<(), PatternStoreError> {
        let mut lineages = self.lineages.lock().map_err(|_| {
            PatternStoreError::TransientIo("in-memory store mutex poisoned".to_string())
        })?;
        let pattern = lineages
            .values_mut()
            .find_map(|lineage| {
                lineage
                    .versions
                    .last_mut()
                    .filter(|pattern| &pattern.pattern_id == pattern_id)
            })
            .ok_or_else(|| PatternStoreError::UnknownSignature(pattern_id.as_str().to_string()))?;

        let weighted = match outcome {
            Outcome::Success => WeightedOutcome::Success(weight),
            Outcome::Failure => WeightedOutcome::Failure(weight),
            Outcome::Abstain => WeightedOutcome::Abstain,
        };
        pattern.rolling_metrics.record(weighted);
        pattern.rolling_metrics.record_injection();
        Ok(())
    }

    fn query_patterns(&self, filters: &PatternQuery) -> Result<Vec<Pattern>, PatternStoreError> {
        let lineages = self.lineages.lock().map_err(|_| {
            PatternStoreError::TransientIo("in-memory store mutex poisoned".to_string())
        })?;
        let mut results: Vec<Pattern> = lineages
            .values()
            .filter_map(|lineage| lineage.versions.last())
            .filter(|pattern| {
                filters
                    .signature_hash
                    .as_ref()
                    .is_none_or(|hash| &pattern.signature_hash == hash)
            })
            .filter(|pattern| {
                filters
                    .lifecycle_status
                    .is_none_or(|status| pattern.lifecycle_status == status)
            })
            .filter(|pattern| {
                filters.domain.as_ref().is_none_or(|domain| {
                    pattern
                        .domain_candidates
                        .iter()
                        .any(|candidate| &candidate.domain == domain)
                })
            })
            .cloned()
            .collect();
        if filters.limit > 0 {
            results.truncate(filters.limit);
        }
        Ok(results)
    }

    fn get_pattern(&self, pattern_id: &PatternId) -> Result<Option<Pattern>, PatternStoreError> {
        let lineages = self.lineages.lock().map_err(|_| {
            PatternStoreError::TransientIo("in-memory store mutex poisoned".to_string())
        })?;
        Ok(lineages
            .values()
            .filter_map(|lineage| lineage.versions.last())
            .find(|pattern| &pattern.pattern_id == pattern_id)
            .cloned())
    }
}

/// Shared handle to any [`PatternStore`] implementation, analogous to a
/// thread-safe trait-object wrapper handed out to multiple dispatch workers.
#[derive(Clone)]
pub struct SharedPatternStore {
    inner: Arc<dyn PatternStore + Send + Sync>,
}

impl SharedPatternStore {
    /// Wraps an existing store implementation.
    #[must_use]
    pub fn from_store(store: Arc<dyn PatternStore + Send + Sync>) -> Self {
        Self { inner: store }
    }

    /// Convenience constructor wrapping a fresh [`InMemoryPatternStore`].
    #[must_use]
    pub fn new_in_memory() -> Self {
        Self::from_store(Arc::new(InMemoryPatternStore::new()))
    }
}

impl PatternStore for SharedPatternStore {
    fn upsert_pattern(
        &self,
        signature: &str,
        signature_hash: &SignatureHash,
        observed_at: Timestamp,
    ) -> Result<PatternId, PatternStoreError> {
        self.inner.upsert_pattern(signature, signature_hash, observed_at)
    }

    fn start_new_version(
        &self,
        signature_hash: &SignatureHash,
        signature: &str,
        observed_at: Timestamp,
    ) -> Result<PatternId, PatternStoreError> {
        self.inner
            .start_new_version(signature_hash, signature, observed_at)
    }

    fn apply_transition(
        &self,
        pattern_id: &PatternId,
        from_status: LifecycleStatus,
        to_status: LifecycleStatus,
        evidence_tier: EvidenceTier,
        gate_snapshot: GateSnapshot,
        idempotency_key: &IdempotencyKey,
        applied_at: Timestamp,
    ) -> Result<TransitionResult, PatternStoreError> {
        self.inner.apply_transition(
            pattern_id,
            from_status,
            to_status,
            evidence_tier,
            gate_snapshot,
            idempotency_key,
            applied_at,
        )
    }

    fn record_outcome(
        &self,
        pattern_id: &PatternId,
        outcome: Outcome,
        weight: f64,
    ) -> Result<(), PatternStoreError> {
        self.inner.record_outcome(pattern_id, outcome, weight)
    }

    fn query_patterns(&self, filters: &PatternQuery) -> Result<Vec<Pattern>, PatternStoreError> {
        self.inner.query_patterns(filters)
    }

    fn get_pattern(&self, pattern_id: &PatternId) -> Result<Option<Pattern>, PatternStoreError> {
        self.inner.get_pattern(pattern_id)
    }
}

/// Marker helper confirming that dispatch-produced events carry the inbound
/// correlation id; used by handler tests wiring stores together with
/// [`EventEnvelope::derive`].
#[must_use]
pub fn correlation_id_of(envelope: &EventEnvelope) -> &crate::core::CorrelationId {
    &envelope.correlation_id
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

    #[test]
    fn s1_first_upsert_creates_candidate_version_one() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("h1");
        let pattern_id = store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("upsert succeeds");
        let pattern = store
            .get_pattern(&pattern_id)
            .expect("query succeeds")
            .expect("pattern exists");
        assert_eq!(pattern.version, 1);
        assert_eq!(pattern.lifecycle_status, LifecycleStatus::Candidate);
        assert_eq!(pattern.evidence_tier, EvidenceTier::Unmeasured);
    }

    #[test]
    fn upsert_is_idempotent_on_known_signature_hash() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("h1");
        let first = store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("first upsert");
        let second = store
            .upsert_pattern("p1", &hash, Timestamp::Logical(2))
            .expect("second upsert");
        assert_eq!(first, second);
    }

    #[test]
    fn start_new_version_fails_on_unknown_signature() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("unknown");
        let result = store.start_new_version(&hash, "p1", Timestamp::Logical(1));
        assert!(matches!(result, Err(PatternStoreError::UnknownSignature(_))));
    }

    #[test]
    fn start_new_version_increments_version_strictly() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("h1");
        store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("initial version");
        let second_id = store
            .start_new_version(&hash, "p1-revised", Timestamp::Logical(2))
            .expect("second version");
        let second = store
            .get_pattern(&second_id)
            .expect("query succeeds")
            .expect("pattern exists");
        assert_eq!(second.version, 2);
    }

    #[test]
    fn s4_idempotent_redelivery_of_transition_is_a_no_op() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("h1");
        let pattern_id = store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("upsert");
        store
            .record_outcome(&pattern_id, Outcome::Success, 1.0)
            .expect("record outcome");

        let key = IdempotencyKey::from("k1");
        let snapshot = GateSnapshot {
            evidence_tier: EvidenceTier::Observed,
            injection_count: 1,
            success_rate: 1.0,
            consecutive_failures: 0,
        };
        let first = store
            .apply_transition(
                &pattern_id,
                LifecycleStatus::Candidate,
                LifecycleStatus::Provisional,
                EvidenceTier::Observed,
                snapshot.clone(),
                &key,
                Timestamp::Logical(2),
            )
            .expect("transition succeeds");
        assert_eq!(first, TransitionResult::Applied);

        let replay = store
            .apply_transition(
                &pattern_id,
                LifecycleStatus::Candidate,
                LifecycleStatus::Provisional,
                EvidenceTier::Observed,
                snapshot,
                &key,
                Timestamp::Logical(3),
            )
            .expect("replay succeeds");
        assert_eq!(replay, TransitionResult::AlreadyApplied);
    }

    #[test]
    fn s5_stale_status_is_reported_distinctly_from_gate_failure() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("h1");
        let pattern_id = store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("upsert");
        let snapshot = GateSnapshot {
            evidence_tier: EvidenceTier::Observed,
            injection_count: 0,
            success_rate: 0.0,
            consecutive_failures: 0,
        };
        let result = store
            .apply_transition(
                &pattern_id,
                LifecycleStatus::Provisional,
                LifecycleStatus::Validated,
                EvidenceTier::Observed,
                snapshot,
                &IdempotencyKey::from("k2"),
                Timestamp::Logical(2),
            )
            .expect("call succeeds");
        assert_eq!(result, TransitionResult::StaleStatus);
    }

    #[test]
    fn gate_failed_when_guard_does_not_hold() {
        let store = InMemoryPatternStore::new();
        let hash = SignatureHash::from("h1");
        let pattern_id = store
            .upsert_pattern("p1", &hash, Timestamp::Logical(1))
            .expect("upsert");
        let snapshot = GateSnapshot {
            evidence_tier: EvidenceTier::Unmeasured,
            injection_count: 0,
            success_rate: 0.0,
            consecutive_failures: 0,
        };
        let result = store
            .apply_transition(
                &pattern_id,
                LifecycleStatus::Candidate,
                LifecycleStatus::Provisional,
                EvidenceTier::Unmeasured,
                snapshot,
                &IdempotencyKey::from("k3"),
                Timestamp::Logical(2),
            )
            .expect("call succeeds");
        assert_eq!(result, TransitionResult::GateFailed);
    }
}
