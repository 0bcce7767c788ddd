// pattern-broker/src/source/inline.rs
// ============================================================================
// Module: Inline Source
// Description: Polls envelopes from an in-process channel.
// Purpose: Wire a CompositeBroker directly to an in-process producer without
//          a durable backing store, for single-process wiring and tests.
// Dependencies: std::sync::mpsc
// ============================================================================

use std::sync::Mutex;
use std::sync::mpsc::Receiver;
use std::sync::mpsc::TryRecvError;

use pattern_core::EventEnvelope;

use super::Source;
use super::SourceError;

/// Polls the receiving half of an in-process channel.
///
/// Constructed in pairs with [`crate::sink::InlineSink`] by
/// [`crate::bus::InlineBus::channel`]. The receiver is held behind a mutex
/// so the source can be shared across threads, matching the `Send + Sync`
/// bound on [`Source`].
pub struct InlineSource {
    /// Receiving half of the backing channel.
    receiver: Mutex<Receiver<EventEnvelope>>,
}

impl InlineSource {
    /// Wraps a channel receiver as a [`Source`].
    #[must_use]
    pub fn new(receiver: Receiver<EventEnvelope>) -> Self {
        Self { receiver: Mutex::new(receiver) }
    }
}

impl Source for InlineSource {
    fn poll(&self) -> Result<Option<EventEnvelope>, SourceError> {
        let guard = self.receiver.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        match guard.try_recv() {
            Ok(envelope) => Ok(Some(envelope)),
            Err(TryRecvError::Empty) => Ok(None),
            Err(TryRecvError::Disconnected) => Err(SourceError::Disconnected),
        }
    }
}
