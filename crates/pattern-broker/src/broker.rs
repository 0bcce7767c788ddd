// pattern-broker/src/broker.rs
// ============================================================================
// Module: Composite Broker
// Description: Wires a Sink (and optionally a Source) into the core
//              Dispatcher and handler-feed interfaces.
// Purpose: The single adapter host processes construct to connect
//          pattern-core to a real bus.
// Dependencies: pattern-core, crate::sink, crate::source
// ============================================================================

use std::sync::Arc;

use pattern_core::DispatchError;
use pattern_core::Dispatcher;
use pattern_core::EventEnvelope;
use pattern_core::core::envelope::TopicDescriptor;
use thiserror::Error;

use crate::sink::Sink;
use crate::sink::SinkError;
use crate::source::Source;
use crate::source::SourceError;

/// Error taxonomy for the composite broker, joined into [`DispatchError`] by
/// the `From` implementation below.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// `build()` was called without a sink configured.
    #[error("broker sink is not configured")]
    MissingSink,
    /// `poll_one()` was called without a source configured.
    #[error("broker source is not configured")]
    MissingSource,
    /// An envelope's topic does not follow the canonical naming scheme.
    #[error("invalid topic: {0}")]
    InvalidTopic(String),
    /// An envelope failed to encode or decode for transport.
    #[error("codec failure: {0}")]
    Codec(String),
    /// The configured sink failed to deliver.
    #[error("sink failure: {0}")]
    Sink(#[from] SinkError),
    /// The configured source failed to resolve.
    #[error("source failure: {0}")]
    Source(#[from] SourceError),
}

impl From<BrokerError> for DispatchError {
    fn from(error: BrokerError) -> Self {
        match error {
            BrokerError::InvalidTopic(reason) => DispatchError::UnroutedTopic(reason),
            BrokerError::Codec(reason) => DispatchError::Decode(reason),
            other => DispatchError::TransientIo(other.to_string()),
        }
    }
}

/// Builder for a [`CompositeBroker`].
#[derive(Default)]
pub struct CompositeBrokerBuilder {
    /// Sink to publish through, if configured.
    sink: Option<Arc<dyn Sink>>,
    /// Source to poll from, if configured.
    source: Option<Arc<dyn Source>>,
}

impl CompositeBrokerBuilder {
    /// Registers the sink used to publish outbound envelopes.
    #[must_use]
    pub fn sink(mut self, sink: impl Sink + 'static) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Registers the source used to poll inbound envelopes.
    #[must_use]
    pub fn source(mut self, source: impl Source + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Builds the composite broker.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MissingSink`] when no sink was configured.
    pub fn build(self) -> Result<CompositeBroker, BrokerError> {
        Ok(CompositeBroker { sink: self.sink.ok_or(BrokerError::MissingSink)?, source: self.source })
    }
}

/// Publishes handler-emitted envelopes through a configured [`Sink`] and,
/// if a [`Source`] is also configured, polls inbound envelopes from a bus to
/// feed a [`pattern_core::runtime::DispatchEngine`].
///
/// This is a consumer/producer on a message bus, not a message bus itself:
/// durability, ordering, and delivery guarantees belong to whatever sink and
/// source are wired in, not to this type.
pub struct CompositeBroker {
    /// Sink used to publish handler-emitted envelopes.
    sink: Arc<dyn Sink>,
    /// Source used to poll inbound envelopes, if this broker also consumes.
    source: Option<Arc<dyn Source>>,
}

impl CompositeBroker {
    /// Returns a builder for the composite broker.
    #[must_use]
    pub fn builder() -> CompositeBrokerBuilder {
        CompositeBrokerBuilder::default()
    }

    /// Polls the configured source for the next inbound envelope.
    ///
    /// # Errors
    ///
    /// Returns [`BrokerError::MissingSource`] if no source was configured,
    /// or [`BrokerError::Source`] if the underlying poll fails.
    pub fn poll_one(&self) -> Result<Option<EventEnvelope>, BrokerError> {
        let source = self.source.as_ref().ok_or(BrokerError::MissingSource)?;
        Ok(source.poll()?)
    }

    /// Validates that an envelope's topic follows the canonical naming
    /// scheme before it is handed to the sink.
    fn validate_topic(envelope: &EventEnvelope) -> Result<(), BrokerError> {
        TopicDescriptor::parse(&envelope.topic).map(|_| ()).map_err(|err| BrokerError::InvalidTopic(err.to_string()))
    }
}

impl Dispatcher for CompositeBroker {
    fn dispatch(&self, envelope: &EventEnvelope) -> Result<(), DispatchError> {
        Self::validate_topic(envelope).map_err(DispatchError::from)?;
        self.sink.publish(envelope).map_err(|err| DispatchError::from(BrokerError::from(err)))
    }
}
