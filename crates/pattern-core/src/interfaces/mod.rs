// pattern-core/src/interfaces/mod.rs
// ============================================================================
// Module: Pattern Core Interfaces
// Description: Store, dispatcher, and metrics traits plus their error taxonomies.
// Purpose: Define the seams hosts implement to wire the core to real infra.
// Dependencies: thiserror, crate::core
// ============================================================================

//! This module collects the trait boundaries the rest of the workspace
//! implements: a durable [`PatternStore`], a [`Dispatcher`] that publishes
//! envelopes onto a message bus, and a dependency-light [`PatternMetrics`]
//! telemetry sink. Each comes with a `thiserror`-derived error enum matching
//! the kinds named in the error-handling design.

use thiserror::Error;

use crate::core::EventEnvelope;
use crate::core::EvidenceTier;
use crate::core::GateSnapshot;
use crate::core::IdempotencyKey;
use crate::core::LifecycleStatus;
use crate::core::Outcome;
use crate::core::Pattern;
use crate::core::PatternId;
use crate::core::SignatureHash;

// ============================================================================
// SECTION: Pattern Store
// ============================================================================

/// Filters accepted by [`PatternStore::query_patterns`].
#[derive(Debug, Clone, Default)]
pub struct PatternQuery {
    /// Restrict to a single lineage.
    pub signature_hash: Option<SignatureHash>,
    /// Restrict to a single lifecycle status.
    pub lifecycle_status: Option<LifecycleStatus>,
    /// Restrict to a single classified domain.
    pub domain: Option<String>,
    /// Maximum rows to return.
    pub limit: usize,
}

/// Result of [`PatternStore::apply_transition`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionResult {
    /// The transition was applied and the projection row updated.
    Applied,
    /// An audit record with this idempotency key already exists; no-op.
    AlreadyApplied,
    /// `from_status` did not match the pattern's current status.
    StaleStatus,
    /// The transition's guard evaluated to false.
    GateFailed,
}

/// Error taxonomy for [`PatternStore`] operations, matching the kinds named
/// in the error-handling design.
#[derive(Debug, Error)]
pub enum PatternStoreError {
    /// Payload failed schema or invariant validation; non-retryable.
    #[error("validation failed: {0}")]
    Validation(String),
    /// The requested `signature_hash` has no known pattern.
    #[error("unknown signature hash: {0}")]
    UnknownSignature(String),
    /// Store or connection hiccup; retryable with backoff.
    #[error("transient store error: {0}")]
    TransientIo(String),
    /// An invariant the store itself is responsible for was violated.
    #[error("store invariant violated: {0}")]
    Invariant(String),
}

/// Durable home of all pattern state. Serves queries and atomically applies
/// lifecycle transitions.
pub trait PatternStore {
    /// Inserts a new lineage if `signature_hash` is unseen; otherwise
    /// returns the existing latest version. Idempotent.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    fn upsert_pattern(
        &self,
        signature: &str,
        signature_hash: &SignatureHash,
        observed_at: crate::core::Timestamp,
    ) -> Result<PatternId, PatternStoreError>;

    /// Creates a new row with incremented `version` for a known lineage.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::UnknownSignature`] if `signature_hash`
    /// has no existing pattern.
    fn start_new_version(
        &self,
        signature_hash: &SignatureHash,
        signature: &str,
        observed_at: crate::core::Timestamp,
    ) -> Result<PatternId, PatternStoreError>;

    /// Applies a lifecycle transition under a single transaction, verifying
    /// the optimistic lock, the FSM edge, and the evidence-tier gate.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    fn apply_transition(
        &self,
        pattern_id: &PatternId,
        from_status: LifecycleStatus,
        to_status: LifecycleStatus,
        evidence_tier: EvidenceTier,
        gate_snapshot: GateSnapshot,
        idempotency_key: &IdempotencyKey,
        applied_at: crate::core::Timestamp,
    ) -> Result<TransitionResult, PatternStoreError>;

    /// Updates the rolling window and counters for `pattern_id` atomically.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    fn record_outcome(
        &self,
        pattern_id: &PatternId,
        outcome: Outcome,
        weight: f64,
    ) -> Result<(), PatternStoreError>;

    /// Read-only lookup against `filters`.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    fn query_patterns(&self, filters: &PatternQuery) -> Result<Vec<Pattern>, PatternStoreError>;

    /// Reads the current projection row for one pattern, if it exists.
    ///
    /// # Errors
    ///
    /// Returns [`PatternStoreError::TransientIo`] on storage unavailability.
    fn get_pattern(&self, pattern_id: &PatternId) -> Result<Option<Pattern>, PatternStoreError>;
}

// ============================================================================
// SECTION: Dispatcher
// ============================================================================

/// Outcome of a single handler invocation, per the handler protocol.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerResult {
    /// The handler applied its effect successfully.
    Applied,
    /// A prior delivery already applied this effect; no-op.
    AlreadyApplied,
    /// A transient failure; the dispatcher should nack with backoff.
    RetryableFailure(String),
    /// A terminal failure; the dispatcher should route to DLQ.
    NonRetryableFailure(String, String),
}

/// Error taxonomy for [`Dispatcher`] operations.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// No route registered for the envelope's topic.
    #[error("no route registered for topic: {0}")]
    UnroutedTopic(String),
    /// The payload failed to decode into the route's declared type.
    #[error("payload decode failed: {0}")]
    Decode(String),
    /// Publishing the envelope onto the bus failed transiently.
    #[error("transient publish error: {0}")]
    TransientIo(String),
}

/// Publishes envelopes onto the message bus. Implemented by broker
/// adapters; the dispatch engine calls this to emit handler-produced events.
pub trait Dispatcher {
    /// Publishes one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::TransientIo`] on a bus hiccup.
    fn dispatch(&self, envelope: &EventEnvelope) -> Result<(), DispatchError>;
}

// ============================================================================
// SECTION: Contract drift
// ============================================================================

/// Raised at startup when a declared contract cannot be resolved against
/// the dispatch engine's routing table. Fatal; the process refuses to start.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractDriftError {
    /// A contract references a handler entry point that does not exist.
    #[error("unresolved handler entry point: {0}")]
    UnresolvedHandler(String),
    /// Two contracts declare the same subscribed topic.
    #[error("duplicate subscription for topic: {0}")]
    DuplicateSubscription(String),
}
