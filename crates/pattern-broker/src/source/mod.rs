// pattern-broker/src/source/mod.rs
// ============================================================================
// Module: Broker Sources
// Description: Inbound bus adapters a CompositeBroker polls from.
// Purpose: Define the Source trait and its error taxonomy.
// Dependencies: pattern-core
// ============================================================================

//! A [`Source`] is anything a [`crate::broker::CompositeBroker`] can poll
//! envelopes from. Polling is non-blocking: implementations return `Ok(None)`
//! when nothing new is available rather than waiting.

pub mod file;
pub mod inline;

pub use file::FileSource;
pub use inline::InlineSource;
use pattern_core::EventEnvelope;
use thiserror::Error;

/// Error taxonomy for [`Source`] implementations.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The peer side of an in-process channel has gone away.
    #[error("source channel disconnected")]
    Disconnected,
    /// A pending record could not be decoded into an `EventEnvelope`.
    #[error("source decode failed: {0}")]
    Decode(String),
    /// A filesystem operation on the backing bus file failed.
    #[error("source io failure: {0}")]
    Io(String),
}

/// Polls a bus for the next inbound envelope.
pub trait Source: Send + Sync {
    /// Returns the next available envelope, or `None` if nothing new has
    /// arrived since the last call.
    ///
    /// # Errors
    ///
    /// Returns [`SourceError`] if a pending record could not be retrieved or
    /// decoded.
    fn poll(&self) -> Result<Option<EventEnvelope>, SourceError>;
}
