//! Fleet Reconciliation
//!
//! Plans every agent of a fleet against a target topology, validates the
//! plans, and commits them with all-or-nothing semantics: capable agents
//! first, then the agents that depend on them, rolling back acked agents
//! when any push fails.

mod directory;
mod reconciler;
mod report;

pub use directory::{Agent, AgentDirectory, InMemoryAgentDirectory, PushOutcome, PushRecord};
pub use reconciler::FleetReconciler;
pub use report::{AgentReport, AgentState, RunOutcome, RunPhase, RunReport};
