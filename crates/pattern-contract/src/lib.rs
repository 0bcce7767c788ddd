// pattern-contract/src/lib.rs
// ============================================================================
// Crate: pattern-contract
// Description: Compile-time node contract table and startup contract-drift
//              validation.
// Purpose: Replace YAML-at-runtime contract resolution with a static table
//          that fails the build, or at worst the first startup check,
//          instead of the first live envelope.
// Dependencies: pattern-core, thiserror
// ============================================================================

//! ## Overview
//!
//! Source systems in this family have historically resolved node contracts
//! from YAML read at startup. Here the contract table is a literal Rust
//! constant: [`CONTRACTS`]. [`validate_contracts`] cross-checks it against
//! the set of topics a host has actually wired handlers for, returning a
//! [`ContractError`] — convertible into
//! [`pattern_core::ContractDriftError`] — on the first unresolved reference
//! or duplicate subscription, rather than discovering the gap when an
//! envelope with no route arrives.

use std::collections::HashSet;

use pattern_core::ContractDriftError;
use pattern_core::Topic;
use pattern_core::core::envelope::TopicDescriptor;
use pattern_core::core::envelope::TopicKind;
use thiserror::Error;

/// Error taxonomy for contract validation, convertible into
/// [`ContractDriftError`] at the startup boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContractError {
    /// A contract's subscribed topic has no handler registered for it.
    #[error("unresolved handler entry point: {0}")]
    UnresolvedHandler(String),
    /// Two contracts declare the same subscribed topic.
    #[error("duplicate subscription for topic: {0}")]
    DuplicateSubscription(String),
}

impl From<ContractError> for ContractDriftError {
    fn from(error: ContractError) -> Self {
        match error {
            ContractError::UnresolvedHandler(topic) => ContractDriftError::UnresolvedHandler(topic),
            ContractError::DuplicateSubscription(topic) => ContractDriftError::DuplicateSubscription(topic),
        }
    }
}

/// One topic a contract subscribes to or publishes on, described
/// structurally so the same contract table renders against any
/// deployment environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContractTopic {
    /// Whether this is a command or event topic.
    pub kind: TopicKind,
    /// Domain segment, e.g. `pattern`.
    pub domain: &'static str,
    /// Name segment, e.g. `stored`.
    pub name: &'static str,
    /// Schema version suffix.
    pub schema_version: u32,
}

impl ContractTopic {
    /// Renders this structural topic against a deployment environment
    /// segment, producing the canonical topic name.
    #[must_use]
    pub fn render(&self, env: &str) -> Topic {
        TopicDescriptor {
            env: env.to_string(),
            kind: self.kind,
            domain: self.domain.to_string(),
            name: self.name.to_string(),
            schema_version: self.schema_version,
        }
        .render()
    }
}

/// One node's declared contract: what it consumes, what it produces, and
/// the handler entry point that implements it.
#[derive(Debug, Clone, Copy)]
pub struct NodeContract {
    /// Human-readable contract name.
    pub name: &'static str,
    /// Topics this node's handler subscribes to.
    pub subscribed_topics: &'static [ContractTopic],
    /// Topics this node's handler may publish to.
    pub published_topics: &'static [ContractTopic],
    /// Name of the inbound payload type this node expects.
    pub input_type: &'static str,
    /// Names of the outbound payload types this node may emit.
    pub output_types: &'static [&'static str],
    /// Name of the handler function implementing this contract.
    pub handler_entry_point: &'static str,
}

/// The compile-time-literal contract table for this system's nodes, per
/// the topic catalog.
pub const CONTRACTS: &[NodeContract] = &[
    NodeContract {
        name: "pattern upsert",
        subscribed_topics: &[ContractTopic { kind: TopicKind::Command, domain: "pattern", name: "store", schema_version: 1 }],
        published_topics: &[ContractTopic { kind: TopicKind::Event, domain: "pattern", name: "stored", schema_version: 1 }],
        input_type: "UpsertPatternCommand",
        output_types: &["PatternStoredEvent"],
        handler_entry_point: "pattern_upsert_handler",
    },
    NodeContract {
        name: "session outcome",
        subscribed_topics: &[ContractTopic { kind: TopicKind::Command, domain: "session", name: "outcome", schema_version: 1 }],
        published_topics: &[
            ContractTopic { kind: TopicKind::Event, domain: "pattern", name: "lifecycle-transitioned", schema_version: 1 },
            ContractTopic { kind: TopicKind::Event, domain: "pattern", name: "promoted", schema_version: 1 },
            ContractTopic { kind: TopicKind::Event, domain: "pattern", name: "demoted", schema_version: 1 },
            ContractTopic { kind: TopicKind::Event, domain: "pattern", name: "metrics-updated", schema_version: 1 },
        ],
        input_type: "SessionOutcomeCommand",
        output_types: &[
            "PatternLifecycleTransitionedEvent",
            "PatternPromotedEvent",
            "PatternDemotedEvent",
            "PatternMetricsUpdatedEvent",
        ],
        handler_entry_point: "session_outcome_handler",
    },
    NodeContract {
        name: "decision record",
        subscribed_topics: &[ContractTopic { kind: TopicKind::Command, domain: "decision", name: "recorded", schema_version: 1 }],
        published_topics: &[ContractTopic { kind: TopicKind::Event, domain: "decision", name: "mismatch-detected", schema_version: 1 }],
        input_type: "DecisionRecordCommand",
        output_types: &["DecisionMismatchDetectedEvent"],
        handler_entry_point: "decision_record_handler",
    },
];

/// Cross-checks `contracts` against `registered_topics` — the set of
/// topics a host has actually wired handlers for in its routing table —
/// rendered against `env`.
///
/// # Errors
///
/// Returns [`ContractError::DuplicateSubscription`] if two contracts
/// declare the same subscribed topic, or
/// [`ContractError::UnresolvedHandler`] if a contract subscribes to a
/// topic with no registered handler.
pub fn validate_contracts(
    contracts: &[NodeContract],
    env: &str,
    registered_topics: &HashSet<Topic>,
) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    for contract in contracts {
        for topic in contract.subscribed_topics {
            let rendered = topic.render(env);
            if !seen.insert(rendered.clone()) {
                return Err(ContractError::DuplicateSubscription(rendered.to_string()));
            }
        }
    }
    for contract in contracts {
        for topic in contract.subscribed_topics {
            let rendered = topic.render(env);
            if !registered_topics.contains(&rendered) {
                return Err(ContractError::UnresolvedHandler(format!(
                    "{}: no handler registered for {rendered}",
                    contract.handler_entry_point
                )));
            }
        }
    }
    Ok(())
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

    fn all_contract_topics(env: &str) -> HashSet<Topic> {
        CONTRACTS
            .iter()
            .flat_map(|contract| contract.subscribed_topics.iter())
            .map(|topic| topic.render(env))
            .collect()
    }

    #[test]
    fn validates_cleanly_when_every_subscription_is_registered() {
        let registered = all_contract_topics("prod");
        assert!(validate_contracts(CONTRACTS, "prod", &registered).is_ok());
    }

    #[test]
    fn reports_unresolved_handler_when_topic_is_missing() {
        let registered: HashSet<Topic> = HashSet::new();
        let result = validate_contracts(CONTRACTS, "prod", &registered);
        assert!(matches!(result, Err(ContractError::UnresolvedHandler(_))));
    }

    #[test]
    fn reports_duplicate_subscription_across_contracts() {
        let duplicated = &[
            NodeContract {
                name: "first",
                subscribed_topics: &[ContractTopic {
                    kind: TopicKind::Command,
                    domain: "pattern",
                    name: "store",
                    schema_version: 1,
                }],
                published_topics: &[],
                input_type: "UpsertPatternCommand",
                output_types: &[],
                handler_entry_point: "first_handler",
            },
            NodeContract {
                name: "second",
                subscribed_topics: &[ContractTopic {
                    kind: TopicKind::Command,
                    domain: "pattern",
                    name: "store",
                    schema_version: 1,
                }],
                published_topics: &[],
                input_type: "UpsertPatternCommand",
                output_types: &[],
                handler_entry_point: "second_handler",
            },
        ];
        let registered = all_contract_topics("prod");
        let result = validate_contracts(duplicated, "prod", &registered);
        assert!(matches!(result, Err(ContractError::DuplicateSubscription(_))));
    }

    #[test]
    fn contract_error_converts_into_dispatch_drift_error() {
        let error: ContractDriftError = ContractError::UnresolvedHandler("x".to_string()).into();
        assert!(matches!(error, ContractDriftError::UnresolvedHandler(_)));
    }
}
