// pattern-broker/src/lib.rs
// ============================================================================
// Crate: pattern-broker
// Description: Bus adapters connecting pattern-core to a durable external
//              message bus.
// Purpose: Provide Sink/Source primitives, two reference bus pairs, and a
//          CompositeBroker wiring them into the Dispatcher trait.
// Dependencies: pattern-core, serde_json, thiserror
// ============================================================================

//! ## Overview
//!
//! This crate is a consumer/producer on a message bus, not a message bus
//! itself. It ships two reference bus pairs — [`InlineBus`] (in-process
//! channel, for single-process wiring and tests) and [`FileBus`] (append-only
//! JSON-line file, for a simple durable local log) — plus [`CompositeBroker`],
//! which implements [`pattern_core::Dispatcher`] over a configured [`Sink`]
//! and optionally polls a configured [`Source`] to feed inbound envelopes to
//! a [`pattern_core::runtime::DispatchEngine`].

pub mod broker;
pub mod bus;
pub mod sink;
pub mod source;

pub use broker::BrokerError;
pub use broker::CompositeBroker;
pub use broker::CompositeBrokerBuilder;
pub use bus::BusError;
pub use bus::FileBus;
pub use bus::InlineBus;
pub use sink::FileSink;
pub use sink::InlineSink;
pub use sink::Sink;
pub use sink::SinkError;
pub use source::FileSource;
pub use source::InlineSource;
pub use source::Source;
pub use source::SourceError;

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::panic,
        reason = "test assertions may unwrap, expect, or panic on failure"
    )]
    use std::io::Write;

    use pattern_core::CorrelationId;
    use pattern_core::Dispatcher;
    use pattern_core::EventEnvelope;
    use pattern_core::EventId;
    use pattern_core::Timestamp;
    use pattern_core::Topic;

    use super::*;

    fn envelope(topic: &str) -> EventEnvelope {
        EventEnvelope::new(
            EventId::from("e1"),
            Topic::from(topic),
            "pattern-stored",
            CorrelationId::from("corr-1"),
            Timestamp::Logical(1),
            1,
            serde_json::Value::Null,
        )
    }

    #[test]
    fn inline_bus_round_trips_an_envelope() {
        let (sink, source) = InlineBus::channel();
        let broker = CompositeBroker::builder().sink(sink).source(source).build().expect("build broker");
        broker.dispatch(&envelope("prod.onex.evt.pattern.stored.v1")).expect("dispatch succeeds");
        let received = broker.poll_one().expect("poll succeeds").expect("envelope present");
        assert_eq!(received.event_id.as_str(), "e1");
    }

    #[test]
    fn file_bus_persists_envelopes_across_handles() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bus.jsonl");
        let (sink, source) = FileBus::open(&path).expect("open file bus");
        let broker = CompositeBroker::builder().sink(sink).source(source).build().expect("build broker");
        broker.dispatch(&envelope("prod.onex.evt.pattern.stored.v1")).expect("dispatch succeeds");
        let received = broker.poll_one().expect("poll succeeds").expect("envelope present");
        assert_eq!(received.topic.as_str(), "prod.onex.evt.pattern.stored.v1");
    }

    #[test]
    fn file_source_ignores_a_trailing_partial_line() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("bus.jsonl");
        let (sink, source) = FileBus::open(&path).expect("open file bus");
        CompositeBroker::builder()
            .sink(sink)
            .build()
            .expect("build broker")
            .dispatch(&envelope("prod.onex.evt.pattern.stored.v1"))
            .expect("dispatch succeeds");
        std::fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .expect("reopen bus file")
            .write_all(b"{\"incomplete\":")
            .expect("write partial line");
        assert!(source.poll().expect("first poll succeeds").is_some());
        assert!(source.poll().expect("second poll succeeds").is_none());
    }

    #[test]
    fn dispatch_rejects_a_malformed_topic() {
        let (sink, _source) = InlineBus::channel();
        let broker = CompositeBroker::builder().sink(sink).build().expect("build broker");
        let result = broker.dispatch(&envelope("not-a-topic"));
        assert!(matches!(result, Err(pattern_core::DispatchError::UnroutedTopic(_))));
    }

    #[test]
    fn builder_without_sink_fails() {
        let result = CompositeBrokerBuilder::default().build();
        assert!(matches!(result, Err(BrokerError::MissingSink)));
    }

    #[test]
    fn poll_without_source_reports_missing_source() {
        let (sink, _source) = InlineBus::channel();
        let broker = CompositeBroker::builder().sink(sink).build().expect("build broker");
        let result = broker.poll_one();
        assert!(matches!(result, Err(BrokerError::MissingSource)));
    }
}
