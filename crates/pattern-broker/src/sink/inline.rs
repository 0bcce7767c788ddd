// pattern-broker/src/sink/inline.rs
// ============================================================================
// Module: Inline Sink
// Description: Publishes envelopes onto an in-process channel.
// Purpose: Wire a CompositeBroker directly to an in-process consumer without
//          a durable backing store, for single-process wiring and tests.
// Dependencies: std::sync::mpsc
// ============================================================================

use std::sync::mpsc::SendError;
use std::sync::mpsc::Sender;

use pattern_core::EventEnvelope;

use super::Sink;
use super::SinkError;

/// Publishes envelopes onto the sending half of an in-process channel.
///
/// Constructed in pairs with [`crate::source::InlineSource`] by
/// [`crate::bus::InlineBus::channel`].
#[derive(Debug, Clone)]
pub struct InlineSink {
    /// Sending half of the backing channel.
    sender: Sender<EventEnvelope>,
}

impl InlineSink {
    /// Wraps a channel sender as a [`Sink`].
    #[must_use]
    pub fn new(sender: Sender<EventEnvelope>) -> Self {
        Self { sender }
    }
}

impl Sink for InlineSink {
    fn publish(&self, envelope: &EventEnvelope) -> Result<(), SinkError> {
        self.sender.send(envelope.clone()).map_err(|SendError(_)| SinkError::Disconnected)
    }
}
