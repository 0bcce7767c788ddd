// pattern-core/src/runtime/nodes.rs
// ============================================================================
// Module: Pattern Core Node Kinds
// Description: Compute/Effect/Reducer/Orchestrator archetypes.
// Purpose: Enforce the purity discipline at the type level.
// Dependencies: crate::interfaces
// ============================================================================

//! Four archetypes, each with enforced discipline: purity rules are
//! statically checkable via the traits below rather than a runtime audit.
//! A `Compute` or `Reducer` implementation simply has no way to reach the
//! store or a dispatcher, because its trait signature never hands it one.

use crate::core::EventEnvelope;
use crate::interfaces::DispatchError;
use crate::interfaces::Dispatcher;
use crate::interfaces::PatternStore;

/// A pure function of its inputs: no I/O, no env, no network, no file
/// system. The unit of deterministic algorithmic work (classification,
/// scoring, feature extraction).
pub trait ComputeNode {
    /// Input type this node consumes.
    type Input;
    /// Output type this node produces.
    type Output;

    /// Computes `Output` from `Input` with no observable side effects.
    fn compute(&self, input: Self::Input) -> Self::Output;
}

/// In-memory aggregation over a stream of inputs into a new state. Like
/// `Compute`, it never performs I/O and never emits events; it only folds.
pub trait ReducerNode {
    /// Type of each streamed input.
    type Input;
    /// Accumulated state type.
    type State;

    /// Folds one input into the existing state, returning the next state.
    fn reduce(&self, state: Self::State, input: Self::Input) -> Self::State;
}

/// The only archetype permitted external side effects: it may read and
/// write the pattern store and may emit events through a [`Dispatcher`].
pub trait EffectNode {
    /// Input type this node consumes.
    type Input;
    /// Output type this node produces on success.
    type Output;
    /// Structured error type this node may fail with.
    type Error;

    /// Performs the node's I/O, using `store` and `dispatcher` as needed.
    ///
    /// # Errors
    ///
    /// Returns `Self::Error` on any failure to perform the effect.
    fn run(
        &self,
        input: Self::Input,
        store: &dyn PatternStore,
        dispatcher: &dyn Dispatcher,
    ) -> Result<Self::Output, Self::Error>;
}

/// Coordinates multiple nodes. It never performs direct I/O; any side
/// effect it needs happens through a delegate `EffectNode` it calls into.
pub trait OrchestratorNode {
    /// Input type this node consumes.
    type Input;
    /// Output type this node produces on success.
    type Output;

    /// Coordinates delegate nodes to produce `Output` from `Input`.
    fn orchestrate(&self, input: Self::Input) -> Self::Output;
}

/// A no-op [`Dispatcher`] used by effect-node unit tests that do not need a
/// real bus adapter.
#[derive(Debug, Clone, Copy, Default)]
pub struct DiscardingDispatcher;

impl Dispatcher for DiscardingDispatcher {
    fn dispatch(&self, _envelope: &EventEnvelope) -> Result<(), DispatchError> {
        Ok(())
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
    use crate::core::CorrelationId;
    use crate::core::EventId;
    use crate::core::Timestamp;
    use crate::core::Topic;

    struct DoubleCompute;
    impl ComputeNode for DoubleCompute {
        type Input = i64;
        type Output = i64;

        fn compute(&self, input: Self::Input) -> Self::Output {
            input * 2
        }
    }

    struct SumReducer;
    impl ReducerNode for SumReducer {
        type Input = i64;
        type State = i64;

        fn reduce(&self, state: Self::State, input: Self::Input) -> Self::State {
            state + input
        }
    }

    #[test]
    fn compute_node_is_a_pure_function() {
        let node = DoubleCompute;
        assert_eq!(node.compute(21), 42);
    }

    #[test]
    fn reducer_node_folds_a_stream() {
        let node = SumReducer;
        let state = [1, 2, 3].into_iter().fold(0, |state, input| node.reduce(state, input));
        assert_eq!(state, 6);
    }

    #[test]
    fn discarding_dispatcher_accepts_any_envelope() {
        let dispatcher = DiscardingDispatcher;
        let envelope = EventEnvelope::new(
            EventId::from("e1"),
            Topic::from("prod.onex.evt.pattern.stored.v1"),
            "pattern-stored",
            CorrelationId::from("corr-1"),
            Timestamp::Logical(1),
            1,
            serde_json::Value::Null,
        );
        assert!(dispatcher.dispatch(&envelope).is_ok());
    }
}
