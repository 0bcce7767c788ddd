// pattern-core/src/core/envelope.rs
// ============================================================================
// Module: Pattern Core Event Envelope
// Description: Universal wire record and canonical topic naming.
// Purpose: Provide typed event identity, partitioning key, correlation lineage.
// Dependencies: serde, crate::core::{identifiers, time}
// ============================================================================

//! Every event crossing a component boundary is wrapped in an
//! [`EventEnvelope`]. `emitted_at` has no construction-time default: callers
//! must supply it, which keeps tests and replays deterministic.

use serde::Deserialize;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::core::identifiers::CorrelationId;
use crate::core::identifiers::EventId;
use crate::core::identifiers::Topic;
use crate::core::time::Timestamp;

/// Whether a topic carries commands (intent) or events (fact).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TopicKind {
    /// An instruction for a consumer to act on.
    Command,
    /// A fact about something that already happened.
    Event,
}

/// How a topic's partition key is selected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PartitionStrategy {
    /// Partition on `signature_hash` to guarantee per-pattern ordering.
    SignatureHash,
    /// Fan-out round robin; no ordering guarantee across keys.
    RoundRobin,
}

/// A parsed, validated topic name following the canonical naming scheme
/// `{env}.onex.{cmd|evt}.{domain}.{name}.v{N}`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicDescriptor {
    /// Deployment environment segment, e.g. `prod`.
    pub env: String,
    /// Whether this is a command or event topic.
    pub kind: TopicKind,
    /// Domain segment, e.g. `pattern`.
    pub domain: String,
    /// Name segment, e.g. `stored`.
    pub name: String,
    /// Schema version suffix.
    pub schema_version: u32,
}

/// Error raised while parsing a topic name.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TopicError {
    /// The topic string did not match `{env}.onex.{cmd|evt}.{domain}.{name}.v{N}`.
    #[error("malformed topic name: {0}")]
    Malformed(String),
}

impl TopicDescriptor {
    /// Parses a canonical topic string into its segments.
    ///
    /// # Errors
    ///
    /// Returns [`TopicError::Malformed`] when the string does not match the
    /// canonical `{env}.onex.{cmd|evt}.{domain}.{name}.v{N}` shape.
    pub fn parse(topic: &Topic) -> Result<Self, TopicError> {
        let raw = topic.as_str();
        let segments: Vec<&str> = raw.split('.').collect();
        let [env, onex, kind, domain, name, version] = segments.as_slice() else {
            return Err(TopicError::Malformed(raw.to_string()));
        };
        if *onex != "onex" {
            return Err(TopicError::Malformed(raw.to_string()));
        }
        let kind = match *kind {
            "cmd" => TopicKind::Command,
            "evt" => TopicKind::Event,
            _ => return Err(TopicError::Malformed(raw.to_string())),
        };
        let schema_version = version
            .strip_prefix('v')
            .and_then(|digits| digits.parse::<u32>().ok())
            .ok_or_else(|| TopicError::Malformed(raw.to_string()))?;
        Ok(Self {
            env: (*env).to_string(),
            kind,
            domain: (*domain).to_string(),
            name: (*name).to_string(),
            schema_version,
        })
    }

    /// Renders this descriptor back into its canonical topic string.
    #[must_use]
    pub fn render(&self) -> Topic {
        let kind = match self.kind {
            TopicKind::Command => "cmd",
            TopicKind::Event => "evt",
        };
        Topic::new(format!(
            "{}.onex.{}.{}.{}.v{}",
            self.env, kind, self.domain, self.name, self.schema_version
        ))
    }
}

/// A registry entry describing one topic's partitioning strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TopicRegistryEntry {
    /// Canonical topic name.
    pub topic: Topic,
    /// How envelopes on this topic are partitioned.
    pub partition_strategy: PartitionStrategy,
}

/// Immutable, frozen-after-startup table of known topics and their
/// partitioning strategy. Built once at startup; no lazy mutation.
#[derive(Debug, Clone, Default)]
pub struct TopicRegistry {
    entries: Vec<TopicRegistryEntry>,
}

impl TopicRegistry {
    /// Builds a registry from a fixed list of entries.
    #[must_use]
    pub fn new(entries: Vec<TopicRegistryEntry>) -> Self {
        Self { entries }
    }

    /// Looks up the partitioning strategy for a topic, if registered.
    #[must_use]
    pub fn partition_strategy(&self, topic: &Topic) -> Option<PartitionStrategy> {
        self.entries
            .iter()
            .find(|entry| &entry.topic == topic)
            .map(|entry| entry.partition_strategy)
    }

    /// Returns all registered topics.
    #[must_use]
    pub fn topics(&self) -> impl Iterator<Item = &Topic> {
        self.entries.iter().map(|entry| &entry.topic)
    }
}

/// Universal wire record. Every event crossing a component boundary is one
/// of these.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique identifier of this event, scoped per topic for idempotency.
    pub event_id: EventId,
    /// Canonical topic this envelope was published to.
    pub topic: Topic,
    /// Name of the payload's logical event type, e.g. `pattern-stored`.
    pub event_type: String,
    /// Causal-chain identifier, propagated unchanged through derived events.
    pub correlation_id: CorrelationId,
    /// Producer-supplied emission time; never defaulted at construction.
    pub emitted_at: Timestamp,
    /// Schema version of `payload`.
    pub schema_version: u32,
    /// Typed payload, carried as JSON.
    pub payload: Value,
}

impl EventEnvelope {
    /// Builds a new envelope. All fields are required; there is no
    /// builder-with-defaults because `emitted_at` and `correlation_id` must
    /// always be explicit.
    #[must_use]
    pub fn new(
        event_id: EventId,
        topic: Topic,
        event_type: impl Into<String>,
        correlation_id: CorrelationId,
        emitted_at: Timestamp,
        schema_version: u32,
        payload: Value,
    ) -> Self {
        Self {
            event_id,
            topic,
            event_type: event_type.into(),
            correlation_id,
            emitted_at,
            schema_version,
            payload,
        }
    }

    /// Derives a new envelope inheriting this envelope's `correlation_id`,
    /// per the correlation-closure invariant: any event a handler emits
    /// carries the inbound correlation id unchanged.
    #[must_use]
    pub fn derive(
        &self,
        event_id: EventId,
        topic: Topic,
        event_type: impl Into<String>,
        emitted_at: Timestamp,
        schema_version: u32,
        payload: Value,
    ) -> Self {
        Self::new(
            event_id,
            topic,
            event_type,
            self.correlation_id.clone(),
            emitted_at,
            schema_version,
            payload,
        )
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

    #[test]
    fn parses_canonical_topic() {
        let topic = Topic::from("prod.onex.evt.pattern.stored.v1");
        let parsed = TopicDescriptor::parse(&topic).expect("parses");
        assert_eq!(parsed.env, "prod");
        assert_eq!(parsed.kind, TopicKind::Event);
        assert_eq!(parsed.domain, "pattern");
        assert_eq!(parsed.name, "stored");
        assert_eq!(parsed.schema_version, 1);
        assert_eq!(parsed.render(), topic);
    }

    #[test]
    fn rejects_malformed_topic() {
        let topic = Topic::from("not-a-topic");
        assert!(TopicDescriptor::parse(&topic).is_err());
    }

    #[test]
    fn derive_inherits_correlation_id() {
        let parent = EventEnvelope::new(
            EventId::from("e1"),
            Topic::from("prod.onex.cmd.pattern.store.v1"),
            "pattern-store",
            CorrelationId::from("corr-1"),
            Timestamp::Logical(1),
            1,
            Value::Null,
        );
        let child = parent.derive(
            EventId::from("e2"),
            Topic::from("prod.onex.evt.pattern.stored.v1"),
            "pattern-stored",
            Timestamp::Logical(2),
            1,
            Value::Null,
        );
        assert_eq!(child.correlation_id, parent.correlation_id);
    }

    #[test]
    fn registry_looks_up_partition_strategy() {
        let topic = Topic::from("prod.onex.cmd.pattern.store.v1");
        let registry = TopicRegistry::new(vec![TopicRegistryEntry {
            topic: topic.clone(),
            partition_strategy: PartitionStrategy::SignatureHash,
        }]);
        assert_eq!(
            registry.partition_strategy(&topic),
            Some(PartitionStrategy::SignatureHash)
        );
        assert_eq!(
            registry.partition_strategy(&Topic::from("unknown.topic")),
            None
        );
    }
}
