// pattern-core/src/core/identifiers.rs
// ============================================================================
// Module: Pattern Core Identifiers
// Description: Canonical opaque identifiers for patterns, sessions, and events.
// Purpose: Provide strongly typed, serializable IDs with stable string forms.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Identifiers in this module are opaque and serialize as strings. Validation
//! of identifier content is handled at store or dispatch boundaries, not
//! within these simple wrappers.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

macro_rules! string_identifier {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier from any string-like value.
            #[must_use]
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::new(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::new(value)
            }
        }
    };
}

string_identifier!(
    /// Opaque unique identifier assigned to each stored pattern version.
    PatternId
);

string_identifier!(
    /// Stable fingerprint shared across every version of one pattern lineage.
    SignatureHash
);

string_identifier!(
    /// Identifier of an external agent session under observation.
    SessionId
);

string_identifier!(
    /// Causal-chain identifier propagated unchanged through derived events.
    CorrelationId
);

string_identifier!(
    /// Identifier of a single pattern injection into a session.
    InjectionId
);

string_identifier!(
    /// Identifier of an attribution record produced by the feedback loop.
    AttributionId
);

string_identifier!(
    /// Identifier of a decision record.
    DecisionId
);

string_identifier!(
    /// Identifier of an individual event envelope, unique per (topic, id) pair.
    EventId
);

string_identifier!(
    /// Canonical topic name, e.g. `prod.onex.evt.pattern.stored.v1`.
    Topic
);

string_identifier!(
    /// Idempotency key scoping a mutation to at-most-once application.
    IdempotencyKey
);

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
    fn round_trips_through_json() {
        let id = PatternId::new("p-1");
        let json = serde_json::to_string(&id).expect("serializable");
        assert_eq!(json, "\"p-1\"");
        let back: PatternId = serde_json::from_str(&json).expect("deserializable");
        assert_eq!(back, id);
    }

    #[test]
    fn display_matches_as_str() {
        let topic = Topic::from("prod.onex.evt.pattern.stored.v1");
        assert_eq!(topic.to_string(), topic.as_str());
    }
}
