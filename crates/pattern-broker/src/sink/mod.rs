// pattern-broker/src/sink/mod.rs
// ============================================================================
// Module: Broker Sinks
// Description: Outbound bus adapters a CompositeBroker publishes through.
// Purpose: Define the Sink trait and its error taxonomy.
// Dependencies: pattern-core
// ============================================================================

//! A [`Sink`] is anything an [`crate::broker::CompositeBroker`] can publish
//! envelopes through. Two reference implementations ship in this crate:
//! [`inline::InlineSink`] (in-process channel) and [`file::FileSink`]
//! (append-only JSON-line file).

pub mod file;
pub mod inline;

pub use file::FileSink;
pub use inline::InlineSink;
use pattern_core::EventEnvelope;
use thiserror::Error;

/// Error taxonomy for [`Sink`] implementations.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The peer side of an in-process channel has gone away.
    #[error("sink channel disconnected")]
    Disconnected,
    /// The envelope could not be encoded for transport.
    #[error("sink encode failed: {0}")]
    Encode(String),
    /// A filesystem operation on the backing bus file failed.
    #[error("sink io failure: {0}")]
    Io(String),
}

/// Publishes envelopes onto a bus. Implementations must be usable from
/// multiple threads, since a `CompositeBroker` is shared behind an `Arc`.
pub trait Sink: Send + Sync {
    /// Publishes one envelope.
    ///
    /// # Errors
    ///
    /// Returns [`SinkError`] if the envelope cannot be delivered.
    fn publish(&self, envelope: &EventEnvelope) -> Result<(), SinkError>;
}
