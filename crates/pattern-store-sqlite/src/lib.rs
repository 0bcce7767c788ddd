// pattern-store-sqlite/src/lib.rs
// ============================================================================
// Crate: pattern-store-sqlite
// Description: Durable PatternStore backed by SQLite WAL.
// Purpose: Persist pattern lineages, transitions, injections, attributions,
//          and decision records with deterministic serialization.
// Dependencies: pattern-core, rusqlite, serde, serde_json, thiserror
// ============================================================================

//! ## Overview
//!
//! This crate implements a durable [`PatternStore`] using `SQLite`. Each
//! lineage (`signature_hash`) owns a row in `patterns` tracking its current
//! version and status for optimistic concurrency; each version is an
//! immutable, canonically-hashed JSON snapshot in `pattern_versions`.
//! Lifecycle transitions are idempotent via a unique index on
//! `pattern_lifecycle_audit.idempotency_key`. Injections, attributions, and
//! decision records are persisted alongside for the rest of the external
//! interface surface, even though [`PatternStore`] itself does not name them.

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::Mutex;

use pattern_core::Attribution;
use pattern_core::CorrelationId;
use pattern_core::DecisionRecord;
use pattern_core::EvidenceTier;
use pattern_core::GateSnapshot;
use pattern_core::IdempotencyKey;
use pattern_core::LifecycleStatus;
use pattern_core::Outcome;
use pattern_core::Pattern;
use pattern_core::PatternId;
use pattern_core::PatternInjection;
use pattern_core::PatternQuery;
use pattern_core::PatternStore;
use pattern_core::PatternStoreError;
use pattern_core::SignatureHash;
use pattern_core::Timestamp;
use pattern_core::TransitionResult;
use pattern_core::core::WeightedOutcome;
use pattern_core::core::hashing::DEFAULT_HASH_ALGORITHM;
use pattern_core::core::hashing::HashAlgorithm;
use pattern_core::core::hashing::canonical_json_bytes;
use pattern_core::core::hashing::hash_bytes;
use pattern_core::runtime::fsm;
use rusqlite::Connection;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::params;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

const SCHEMA_VERSION: i64 = 1;
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
const MAX_TOTAL_PATH_LENGTH: usize = 4096;

const LIFECYCLE_THRESHOLDS: fsm::LifecycleThresholds = fsm::LifecycleThresholds {
    injection_count_min: 5,
    success_rate_min: 0.60,
    consecutive_failures_max: 3,
    demotion_success_rate: 0.40,
    demotion_consecutive_failures: 5,
};

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteStoreMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteStoreMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// Configuration for the `SQLite` pattern store.
#[derive(Debug, Clone, Deserialize)]
pub struct SqliteStoreConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
}

/// Serde default for [`SqliteStoreConfig::busy_timeout_ms`].
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// `SQLite` store errors.
#[derive(Debug, Error)]
pub enum SqliteStoreError {
    /// Store I/O error.
    #[error("sqlite store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("sqlite store db error: {0}")]
    Db(String),
    /// Store corruption or hash mismatch.
    #[error("sqlite store corruption: {0}")]
    Corrupt(String),
    /// Store schema version mismatch.
    #[error("sqlite store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data.
    #[error("sqlite store invalid data: {0}")]
    Invalid(String),
}

impl From<SqliteStoreError> for PatternStoreError {
    fn from(error: SqliteStoreError) -> Self {
        match error {
            SqliteStoreError::Io(message) | SqliteStoreError::Db(message) => {
                Self::TransientIo(message)
            }
            SqliteStoreError::Corrupt(message) => Self::Invariant(message),
            SqliteStoreError::VersionMismatch(message) => Self::Invariant(message),
            SqliteStoreError::Invalid(message) => Self::Validation(message),
        }
    }
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite`-backed pattern store with WAL support.
#[derive(Clone)]
pub struct SqlitePatternStore {
    /// Shared `SQLite` connection guarded by a mutex.
    connection: Arc<Mutex<Connection>>,
}

impl SqlitePatternStore {
    /// Opens a `SQLite`-backed pattern store.
    ///
    /// # Errors
    ///
    /// Returns [`SqliteStoreError`] when the database cannot be opened or
    /// initialized.
    pub fn new(config: SqliteStoreConfig) -> Result<Self, SqliteStoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self { connection: Arc::new(Mutex::new(connection)) })
    }

    /// Locks the shared connection, mapping a poisoned mutex to a transient
    /// store error rather than panicking.
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, PatternStoreError> {
        self.connection
            .lock()
            .map_err(|_| PatternStoreError::TransientIo("sqlite store mutex poisoned".to_string()))
    }

    /// Persists a new pattern injection row.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    pub fn record_injection(&self, injection: &PatternInjection) -> Result<(), PatternStoreError> {
        let guard = self.lock()?;
        let injected_at_json = serde_json::to_string(&injection.injected_at)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        let context_type_json = serde_json::to_string(&injection.context_type)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        let cohort_json = serde_json::to_string(&injection.cohort)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO pattern_injections (
                    injection_id, pattern_id, session_id, correlation_id,
                    context_type, cohort, injected_at_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    injection.injection_id.as_str(),
                    injection.pattern_id.as_str(),
                    injection.session_id.as_str(),
                    injection.correlation_id.as_str(),
                    context_type_json,
                    cohort_json,
                    injected_at_json,
                ],
            )
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        Ok(())
    }

    /// Fetches every injection recorded for `session_id`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    pub fn injections_for_session(
        &self,
        session_id: &str,
    ) -> Result<Vec<PatternInjection>, PatternStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT injection_id, pattern_id, session_id, correlation_id, context_type, \
                 cohort, injected_at_json FROM pattern_injections WHERE session_id = ?1 ORDER BY \
                 rowid ASC",
            )
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        let rows = statement
            .query_map(params![session_id], |row| {
                let injection_id: String = row.get(0)?;
                let pattern_id: String = row.get(1)?;
                let session_id: String = row.get(2)?;
                let correlation_id: String = row.get(3)?;
                let context_type: String = row.get(4)?;
                let cohort: String = row.get(5)?;
                let injected_at_json: String = row.get(6)?;
                Ok((
                    injection_id,
                    pattern_id,
                    session_id,
                    correlation_id,
                    context_type,
                    cohort,
                    injected_at_json,
                ))
            })
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        let mut injections = Vec::new();
        for row in rows {
            let (injection_id, pattern_id, session_id, correlation_id, context_type, cohort, injected_at_json) =
                row.map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
            let injected_at: Timestamp = serde_json::from_str(&injected_at_json)
                .map_err(|err| PatternStoreError::Invariant(err.to_string()))?;
            injections.push(PatternInjection {
                injection_id: pattern_core::InjectionId::new(injection_id),
                pattern_id: PatternId::new(pattern_id),
                session_id: pattern_core::SessionId::new(session_id),
                correlation_id: CorrelationId::new(correlation_id),
                context_type: serde_json::from_str(&context_type)
                    .map_err(|err| PatternStoreError::Invariant(err.to_string()))?,
                cohort: serde_json::from_str(&cohort)
                    .map_err(|err| PatternStoreError::Invariant(err.to_string()))?,
                injected_at,
            });
        }
        Ok(injections)
    }

    /// Persists a computed attribution.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    pub fn record_attribution(&self, attribution: &Attribution) -> Result<(), PatternStoreError> {
        let guard = self.lock()?;
        let shares_json = serde_json::to_string(&attribution.shares)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        let computed_at_json = serde_json::to_string(&attribution.computed_at)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        let heuristic_json = serde_json::to_string(&attribution.heuristic)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO attributions (
                    attribution_id, session_id, correlation_id, heuristic,
                    heuristic_confidence, shares_json, computed_at_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    attribution.attribution_id.as_str(),
                    attribution.session_id.as_str(),
                    attribution.correlation_id.as_str(),
                    heuristic_json,
                    attribution.heuristic_confidence,
                    shares_json,
                    computed_at_json,
                ],
            )
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        Ok(())
    }

    /// Persists a decision record.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    pub fn record_decision(&self, record: &DecisionRecord) -> Result<(), PatternStoreError> {
        let guard = self.lock()?;
        let provenance_json = serde_json::to_string(&record.provenance)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        let recorded_at_json = serde_json::to_string(&record.recorded_at)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        let decision_type_json = serde_json::to_string(&record.decision_type)
            .map_err(|err| PatternStoreError::Validation(err.to_string()))?;
        guard
            .execute(
                "INSERT INTO decision_records (
                    decision_id, decision_type, provenance_json, chosen_id,
                    agent_rationale, recorded_at_json
                 ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    record.decision_id.as_str(),
                    decision_type_json,
                    provenance_json,
                    record.chosen_id.as_str(),
                    record.agent_rationale,
                    recorded_at_json,
                ],
            )
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        Ok(())
    }
}

/// Canonically serializes `pattern` and hashes the result, returning the
/// bytes to store alongside the digest that guards them.
fn serialize_pattern(pattern: &Pattern) -> Result<(Vec<u8>, String, HashAlgorithm), SqliteStoreError> {
    let bytes = canonical_json_bytes(pattern)
        .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
    let digest = hash_bytes(DEFAULT_HASH_ALGORITHM, &bytes);
    Ok((bytes, digest.value, digest.algorithm))
}

/// Verifies `bytes` hashes to `stored_hash` before deserializing, surfacing
/// any corruption as [`SqliteStoreError::Corrupt`] instead of a parse error.
fn deserialize_pattern(bytes: &[u8], stored_hash: &str) -> Result<Pattern, SqliteStoreError> {
    let expected = hash_bytes(DEFAULT_HASH_ALGORITHM, bytes);
    if expected.value != stored_hash {
        return Err(SqliteStoreError::Corrupt("pattern hash mismatch".to_string()));
    }
    serde_json::from_slice(bytes).map_err(|err| SqliteStoreError::Invalid(err.to_string()))
}

/// Maps a lifecycle status to the fixed text label stored in `patterns` and
/// `pattern_lifecycle_audit`.
fn lifecycle_status_label(status: LifecycleStatus) -> &'static str {
    match status {
        LifecycleStatus::Candidate => "CANDIDATE",
        LifecycleStatus::Provisional => "PROVISIONAL",
        LifecycleStatus::Validated => "VALIDATED",
        LifecycleStatus::Deprecated => "DEPRECATED",
        LifecycleStatus::Blacklisted => "BLACKLISTED",
    }
}

impl PatternStore for SqlitePatternStore {
    fn upsert_pattern(
        &self,
        signature: &str,
        signature_hash: &SignatureHash,
        observed_at: Timestamp,
    ) -> Result<PatternId, PatternStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let existing: Option<String> = tx
            .query_row(
                "SELECT current_pattern_id FROM patterns WHERE signature_hash = ?1",
                params![signature_hash.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        if let Some(pattern_id) = existing {
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            return Ok(PatternId::new(pattern_id));
        }

        let pattern_id = next_pattern_id(&tx)?;
        let digest = pattern_core::core::hashing::hash_canonical_json(DEFAULT_HASH_ALGORITHM, signature)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let pattern = Pattern::new_candidate(
            pattern_id.clone(),
            signature_hash.clone(),
            signature,
            digest,
            observed_at,
            pattern_core::core::DEFAULT_ROLLING_WINDOW,
        );
        insert_version(&tx, signature_hash, &pattern)?;
        let version = i64::try_from(pattern.version)
            .map_err(|_| SqliteStoreError::Corrupt("pattern version overflow".to_string()))?;
        tx.execute(
            "INSERT INTO patterns (signature_hash, current_pattern_id, current_version, \
             current_status) VALUES (?1, ?2, ?3, ?4)",
            params![
                signature_hash.as_str(),
                pattern_id.as_str(),
                version,
                lifecycle_status_label(pattern.lifecycle_status),
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(pattern_id)
    }

    fn start_new_version(
        &self,
        signature_hash: &SignatureHash,
        signature: &str,
        observed_at: Timestamp,
    ) -> Result<PatternId, PatternStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let current_version: Option<i64> = tx
            .query_row(
                "SELECT current_version FROM patterns WHERE signature_hash = ?1",
                params![signature_hash.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some(current_version) = current_version else {
            return Err(PatternStoreError::UnknownSignature(signature_hash.as_str().to_string()));
        };

        let pattern_id = next_pattern_id(&tx)?;
        let digest = pattern_core::core::hashing::hash_canonical_json(DEFAULT_HASH_ALGORITHM, signature)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let mut pattern = Pattern::new_candidate(
            pattern_id.clone(),
            signature_hash.clone(),
            signature,
            digest,
            observed_at,
            pattern_core::core::DEFAULT_ROLLING_WINDOW,
        );
        pattern.version = current_version
            .checked_add(1)
            .ok_or_else(|| SqliteStoreError::Corrupt("pattern version overflow".to_string()))?
            .try_into()
            .map_err(|_| SqliteStoreError::Corrupt("pattern version overflow".to_string()))?;
        insert_version(&tx, signature_hash, &pattern)?;
        let version = i64::try_from(pattern.version)
            .map_err(|_| SqliteStoreError::Corrupt("pattern version overflow".to_string()))?;
        tx.execute(
            "UPDATE patterns SET current_pattern_id = ?1, current_version = ?2, current_status = \
             ?3 WHERE signature_hash = ?4",
            params![
                pattern_id.as_str(),
                version,
                lifecycle_status_label(pattern.lifecycle_status),
                signature_hash.as_str(),
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
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
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;

        let already_applied: Option<i64> = tx
            .query_row(
                "SELECT 1 FROM pattern_lifecycle_audit WHERE idempotency_key = ?1",
                params![idempotency_key.as_str()],
                |row| row.get(0),
            )
            .optional()
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        if already_applied.is_some() {
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            return Ok(TransitionResult::AlreadyApplied);
        }

        let Some((signature_hash, version)) = find_lineage_for_pattern(&tx, pattern_id)? else {
            return Err(PatternStoreError::UnknownSignature(pattern_id.as_str().to_string()));
        };
        let (bytes, stored_hash) = load_version_bytes(&tx, &signature_hash, version)?;
        let mut pattern =
            deserialize_pattern(&bytes, &stored_hash).map_err(PatternStoreError::from)?;

        if pattern.lifecycle_status != from_status {
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            return Ok(TransitionResult::StaleStatus);
        }

        let guard_result = fsm::evaluate_transition(
            from_status,
            to_status,
            evidence_tier,
            &pattern.rolling_metrics,
            fsm::AntiGamingState { alert_active: false },
            &LIFECYCLE_THRESHOLDS,
        );
        if guard_result.is_err() {
            tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            return Ok(TransitionResult::GateFailed);
        }

        pattern.lifecycle_status = to_status;
        pattern.evidence_tier = pattern.evidence_tier.advance_to(evidence_tier);
        pattern.last_transitioned_at = applied_at;
        update_version(&tx, &signature_hash, version, &pattern)?;
        tx.execute(
            "UPDATE patterns SET current_status = ?1 WHERE signature_hash = ?2",
            params![lifecycle_status_label(to_status), signature_hash.as_str()],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;

        let gate_snapshot_json = serde_json::to_string(&gate_snapshot)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        let applied_at_json = serde_json::to_string(&applied_at)
            .map_err(|err| SqliteStoreError::Invalid(err.to_string()))?;
        tx.execute(
            "INSERT INTO pattern_lifecycle_audit (
                pattern_id, idempotency_key, from_status, to_status,
                gate_snapshot_json, applied_at_json
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                pattern_id.as_str(),
                idempotency_key.as_str(),
                lifecycle_status_label(from_status),
                lifecycle_status_label(to_status),
                gate_snapshot_json,
                applied_at_json,
            ],
        )
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;

        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(TransitionResult::Applied)
    }

    fn record_outcome(
        &self,
        pattern_id: &PatternId,
        outcome: Outcome,
        weight: f64,
    ) -> Result<(), PatternStoreError> {
        let mut guard = self.lock()?;
        let tx = guard.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        let Some((signature_hash, version)) = find_lineage_for_pattern(&tx, pattern_id)? else {
            return Err(PatternStoreError::UnknownSignature(pattern_id.as_str().to_string()));
        };
        let (bytes, stored_hash) = load_version_bytes(&tx, &signature_hash, version)?;
        let mut pattern =
            deserialize_pattern(&bytes, &stored_hash).map_err(PatternStoreError::from)?;

        let weighted = match outcome {
            Outcome::Success => WeightedOutcome::Success(weight),
            Outcome::Failure => WeightedOutcome::Failure(weight),
            Outcome::Abstain => WeightedOutcome::Abstain,
        };
        pattern.rolling_metrics.record(weighted);
        pattern.rolling_metrics.record_injection();
        update_version(&tx, &signature_hash, version, &pattern)?;
        tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        Ok(())
    }

    fn query_patterns(&self, filters: &PatternQuery) -> Result<Vec<Pattern>, PatternStoreError> {
        let guard = self.lock()?;
        let mut statement = guard
            .prepare(
                "SELECT pv.pattern_json, pv.pattern_hash FROM patterns p JOIN pattern_versions pv \
                 ON pv.signature_hash = p.signature_hash AND pv.version = p.current_version",
            )
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        let rows = statement
            .query_map(params![], |row| {
                let bytes: Vec<u8> = row.get(0)?;
                let hash: String = row.get(1)?;
                Ok((bytes, hash))
            })
            .map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
        let mut results = Vec::new();
        for row in rows {
            let (bytes, hash) = row.map_err(|err| PatternStoreError::TransientIo(err.to_string()))?;
            let pattern = deserialize_pattern(&bytes, &hash).map_err(PatternStoreError::from)?;
            if filters
                .signature_hash
                .as_ref()
                .is_some_and(|wanted| &pattern.signature_hash != wanted)
            {
                continue;
            }
            if filters
                .lifecycle_status
                .is_some_and(|wanted| pattern.lifecycle_status != wanted)
            {
                continue;
            }
            if let Some(domain) = &filters.domain {
                if !pattern.domain_candidates.iter().any(|candidate| &candidate.domain == domain) {
                    continue;
                }
            }
            results.push(pattern);
            if filters.limit > 0 && results.len() >= filters.limit {
                break;
            }
        }
        Ok(results)
    }

    fn get_pattern(&self, pattern_id: &PatternId) -> Result<Option<Pattern>, PatternStoreError> {
        let guard = self.lock()?;
        let Some((signature_hash, version)) = find_lineage_for_pattern(&guard, pattern_id)? else {
            return Ok(None);
        };
        let (bytes, stored_hash) = load_version_bytes(&guard, &signature_hash, version)?;
        let pattern = deserialize_pattern(&bytes, &stored_hash).map_err(PatternStoreError::from)?;
        Ok(Some(pattern))
    }
}

/// Allocates the next monotonic pattern id from `pattern_id_seq`.
fn next_pattern_id(tx: &rusqlite::Connection) -> Result<PatternId, SqliteStoreError> {
    tx.execute("UPDATE pattern_id_seq SET value = value + 1", params![])
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let seq: i64 = tx
        .query_row("SELECT value FROM pattern_id_seq", params![], |row| row.get(0))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(PatternId::new(format!("p-{seq}")))
}

/// Inserts a new immutable `pattern_versions` row for `pattern` at its
/// current version.
fn insert_version(
    tx: &rusqlite::Connection,
    signature_hash: &SignatureHash,
    pattern: &Pattern,
) -> Result<(), SqliteStoreError> {
    let (bytes, hash, algorithm) = serialize_pattern(pattern)?;
    let version = i64::try_from(pattern.version)
        .map_err(|_| SqliteStoreError::Corrupt("pattern version overflow".to_string()))?;
    tx.execute(
        "INSERT INTO pattern_versions (
            signature_hash, version, pattern_id, pattern_json, pattern_hash, hash_algorithm
         ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            signature_hash.as_str(),
            version,
            pattern.pattern_id.as_str(),
            bytes,
            hash,
            hash_algorithm_label(algorithm),
        ],
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Overwrites an existing `pattern_versions` row in place, used when a
/// version's mutable fields (lifecycle status, rolling metrics) change
/// without minting a new version number.
fn update_version(
    tx: &rusqlite::Connection,
    signature_hash: &SignatureHash,
    version: i64,
    pattern: &Pattern,
) -> Result<(), SqliteStoreError> {
    let (bytes, hash, algorithm) = serialize_pattern(pattern)?;
    tx.execute(
        "UPDATE pattern_versions SET pattern_json = ?1, pattern_hash = ?2, hash_algorithm = ?3 \
         WHERE signature_hash = ?4 AND version = ?5",
        params![bytes, hash, hash_algorithm_label(algorithm), signature_hash.as_str(), version],
    )
    .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Loads the raw pattern bytes and stored hash for one `pattern_versions` row.
fn load_version_bytes(
    tx: &rusqlite::Connection,
    signature_hash: &SignatureHash,
    version: i64,
) -> Result<(Vec<u8>, String), PatternStoreError> {
    tx.query_row(
        "SELECT pattern_json, pattern_hash FROM pattern_versions WHERE signature_hash = ?1 AND \
         version = ?2",
        params![signature_hash.as_str(), version],
        |row| {
            let bytes: Vec<u8> = row.get(0)?;
            let hash: String = row.get(1)?;
            Ok((bytes, hash))
        },
    )
    .map_err(|err| PatternStoreError::TransientIo(err.to_string()))
}

/// Resolves a pattern id to the lineage and version it currently heads, or
/// `None` if no lineage currently points at it.
fn find_lineage_for_pattern(
    tx: &rusqlite::Connection,
    pattern_id: &PatternId,
) -> Result<Option<(SignatureHash, i64)>, PatternStoreError> {
    tx.query_row(
        "SELECT signature_hash, current_version FROM patterns WHERE current_pattern_id = ?1",
        params![pattern_id.as_str()],
        |row| {
            let signature_hash: String = row.get(0)?;
            let version: i64 = row.get(1)?;
            Ok((SignatureHash::new(signature_hash), version))
        },
    )
    .optional()
    .map_err(|err| PatternStoreError::TransientIo(err.to_string()))
}

/// Maps a hash algorithm to the fixed text label stored alongside its digest.
fn hash_algorithm_label(algorithm: HashAlgorithm) -> &'static str {
    match algorithm {
        HashAlgorithm::Sha256 => "sha256",
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Creates the store file's parent directory if it does not already exist.
fn ensure_parent_dir(path: &Path) -> Result<(), SqliteStoreError> {
    let Some(parent) = path.parent() else {
        return Err(SqliteStoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| SqliteStoreError::Io(err.to_string()))
}

/// Rejects store paths that are overlong or that already exist as a
/// directory rather than a file.
fn validate_store_path(path: &Path) -> Result<(), SqliteStoreError> {
    let path_string = path.display().to_string();
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(SqliteStoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(SqliteStoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(SqliteStoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens the `SQLite` file in read-write-create mode and applies pragmas.
fn open_connection(config: &SqliteStoreConfig) -> Result<Connection, SqliteStoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Enables foreign keys, sets the configured journal mode, and applies the
/// configured busy timeout.
fn apply_pragmas(connection: &Connection, config: &SqliteStoreConfig) -> Result<(), SqliteStoreError> {
    connection
        .execute_batch("PRAGMA foreign_keys = ON;")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    connection
        .busy_timeout(std::time::Duration::from_millis(config.busy_timeout_ms))
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}

/// Creates the schema on first open, or validates the stored schema version
/// matches [`SCHEMA_VERSION`] on subsequent opens.
fn initialize_schema(connection: &mut Connection) -> Result<(), SqliteStoreError> {
    let tx = connection.transaction().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()
        .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])
                .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
            tx.execute_batch(
                "CREATE TABLE IF NOT EXISTS pattern_id_seq (value INTEGER NOT NULL);
                 INSERT INTO pattern_id_seq (value) VALUES (0);
                 CREATE TABLE IF NOT EXISTS patterns (
                    signature_hash TEXT PRIMARY KEY,
                    current_pattern_id TEXT NOT NULL UNIQUE,
                    current_version INTEGER NOT NULL,
                    current_status TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS pattern_versions (
                    signature_hash TEXT NOT NULL,
                    version INTEGER NOT NULL,
                    pattern_id TEXT NOT NULL,
                    pattern_json BLOB NOT NULL,
                    pattern_hash TEXT NOT NULL,
                    hash_algorithm TEXT NOT NULL,
                    PRIMARY KEY (signature_hash, version),
                    FOREIGN KEY (signature_hash) REFERENCES patterns(signature_hash) ON DELETE \
                     CASCADE
                 );
                 CREATE TABLE IF NOT EXISTS pattern_lifecycle_audit (
                    pattern_id TEXT NOT NULL,
                    idempotency_key TEXT NOT NULL UNIQUE,
                    from_status TEXT NOT NULL,
                    to_status TEXT NOT NULL,
                    gate_snapshot_json TEXT NOT NULL,
                    applied_at_json TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS pattern_injections (
                    injection_id TEXT PRIMARY KEY,
                    pattern_id TEXT NOT NULL,
                    session_id TEXT NOT NULL,
                    correlation_id TEXT NOT NULL,
                    context_type TEXT NOT NULL,
                    cohort TEXT NOT NULL,
                    injected_at_json TEXT NOT NULL
                 );
                 CREATE INDEX IF NOT EXISTS idx_pattern_injections_session
                    ON pattern_injections (session_id);
                 CREATE TABLE IF NOT EXISTS attributions (
                    attribution_id TEXT PRIMARY KEY,
                    session_id TEXT NOT NULL,
                    correlation_id TEXT NOT NULL,
                    heuristic TEXT NOT NULL,
                    heuristic_confidence REAL NOT NULL,
                    shares_json TEXT NOT NULL,
                    computed_at_json TEXT NOT NULL
                 );
                 CREATE TABLE IF NOT EXISTS decision_records (
                    decision_id TEXT PRIMARY KEY,
                    decision_type TEXT NOT NULL,
                    provenance_json TEXT NOT NULL,
                    chosen_id TEXT NOT NULL,
                    agent_rationale TEXT,
                    recorded_at_json TEXT NOT NULL
                 );",
            )
            .map_err(|err| SqliteStoreError::Db(err.to_string()))?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(SqliteStoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit().map_err(|err| SqliteStoreError::Db(err.to_string()))?;
    Ok(())
}
