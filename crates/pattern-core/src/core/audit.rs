// pattern-core/src/core/audit.rs
// ============================================================================
// Module: Pattern Core Audit
// Description: Append-only lifecycle transition audit records and snapshots.
// Purpose: Give every applied transition an immutable, replayable trail.
// Dependencies: serde, crate::core::{identifiers, lifecycle, pattern, time}
// ============================================================================

//! A lifecycle transition never mutates history: it appends an audit record
//! and updates the single mutable projection row in the same transaction.
//! [`GateSnapshot`] freezes the metrics and tier the guard evaluated at
//! decision time, so later reads of the audit log reproduce exactly what the
//! transition saw.

use serde::Deserialize;
use serde::Serialize;

use crate::core::identifiers::IdempotencyKey;
use crate::core::identifiers::PatternId;
use crate::core::lifecycle::EvidenceTier;
use crate::core::lifecycle::LifecycleStatus;
use crate::core::time::Timestamp;

/// The metrics and tier a transition guard evaluated at decision time,
/// frozen into the audit record regardless of how the pattern's live state
/// changes afterward.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GateSnapshot {
    /// Evidence tier observed at decision time.
    pub evidence_tier: EvidenceTier,
    /// Injection count observed at decision time.
    pub injection_count: u64,
    /// Success rate observed at decision time.
    pub success_rate: f64,
    /// Consecutive failures observed at decision time.
    pub consecutive_failures: u32,
}

/// One applied (or rejected) lifecycle transition attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LifecycleAuditRecord {
    /// Pattern this transition targeted.
    pub pattern_id: PatternId,
    /// Idempotency key scoping this transition to at-most-once application.
    pub idempotency_key: IdempotencyKey,
    /// Status the pattern was in when the transition was requested.
    pub from_status: LifecycleStatus,
    /// Status the pattern moved to (equal to `from_status` if rejected).
    pub to_status: LifecycleStatus,
    /// Metrics and tier snapshot the guard evaluated against.
    pub gate_snapshot: GateSnapshot,
    /// When this transition was applied.
    pub applied_at: Timestamp,
}

/// Append-only log of every transition attempt for one pattern lineage.
/// Historical entries are immutable; only `push` is exposed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LifecycleAuditLog {
    entries: Vec<LifecycleAuditRecord>,
}

impl LifecycleAuditLog {
    /// Appends a new audit record. Never mutates or removes prior entries.
    pub fn push(&mut self, record: LifecycleAuditRecord) {
        self.entries.push(record);
    }

    /// Returns whether an entry with this idempotency key was already
    /// recorded, supporting the `ALREADY_APPLIED` replay short-circuit.
    #[must_use]
    pub fn contains_key(&self, key: &IdempotencyKey) -> bool {
        self.entries
            .iter()
            .any(|entry| &entry.idempotency_key == key)
    }

    /// All recorded entries, oldest first.
    #[must_use]
    pub fn entries(&self) -> &[LifecycleAuditRecord] {
        &self.entries
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

    fn record(key: &str) -> LifecycleAuditRecord {
        LifecycleAuditRecord {
            pattern_id: PatternId::from("p1"),
            idempotency_key: IdempotencyKey::from(key),
            from_status: LifecycleStatus::Candidate,
            to_status: LifecycleStatus::Provisional,
            gate_snapshot: GateSnapshot {
                evidence_tier: EvidenceTier::Observed,
                injection_count: 1,
                success_rate: 1.0,
                consecutive_failures: 0,
            },
            applied_at: Timestamp::Logical(1),
        }
    }

    #[test]
    fn append_only_log_tracks_idempotency_keys() {
        let mut log = LifecycleAuditLog::default();
        assert!(!log.contains_key(&IdempotencyKey::from("k1")));
        log.push(record("k1"));
        assert!(log.contains_key(&IdempotencyKey::from("k1")));
        assert_eq!(log.entries().len(), 1);
    }
}
