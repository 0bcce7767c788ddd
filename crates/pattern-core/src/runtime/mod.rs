// pattern-core/src/runtime/mod.rs
// ============================================================================
// Module: Pattern Core — runtime
// Description: Submodule declarations and re-exports for the runtime layer.
// ============================================================================

pub mod dispatch;
pub mod feedback;
pub mod fsm;
pub mod handlers;
pub mod nodes;
pub mod store_mem;

pub use dispatch::BackoffDelay;
pub use dispatch::DispatchConfig;
pub use dispatch::DispatchEngine;
pub use dispatch::DispatchOutcome;
pub use dispatch::Handler;
pub use dispatch::RoutingTable;
pub use dispatch::compute_backoff;
pub use feedback::FeedbackStatus;
pub use feedback::RecordedSessions;
pub use feedback::evidence_tier_from_signals;
pub use feedback::process_outcome;
pub use fsm::AntiGamingState;
pub use fsm::GuardFailure;
pub use fsm::LifecycleThresholds;
pub use fsm::evaluate_transition;
pub use handlers::DecisionRecordEffect;
pub use handlers::DecisionRecordInput;
pub use handlers::HandlerError;
pub use handlers::IngestAndPromoteInput;
pub use handlers::IngestAndPromoteOrchestrator;
pub use handlers::IngestAndPromoteOutput;
pub use handlers::LifecycleTransitionEffect;
pub use handlers::LifecycleTransitionInput;
pub use handlers::LifecycleTransitionOutcome;
pub use handlers::PatternUpsertEffect;
pub use handlers::PatternUpsertInput;
pub use nodes::ComputeNode;
pub use nodes::DiscardingDispatcher;
pub use nodes::EffectNode;
pub use nodes::OrchestratorNode;
pub use nodes::ReducerNode;
pub use store_mem::InMemoryPatternStore;
pub use store_mem::SharedPatternStore;
