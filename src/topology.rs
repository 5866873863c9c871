//! Trace Load-Balancing Topology
//!
//! Computes the structural patch that moves one agent's pipeline layout
//! between the load-balanced, forwarded-only, and default topologies.
//!
//! A load-balancing capable agent keeps its original trace receivers in a
//! `traces/lb` pipeline that exports to the `loadbalancing` exporter, while
//! its `traces` pipeline only ingests the forwarded traffic arriving on
//! `otlp_internal`. Agents without load-balancing support run the
//! forwarded-only half of that layout.

mod plan;
mod planner;
mod validation;

pub use plan::{Mutation, TopologyPlan};
pub use planner::TopologyPlanner;
pub use validation::validate_references;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Receiver that accepts traffic forwarded by the load-balancing exporter.
pub const INTERNAL_RECEIVER: &str = "otlp_internal";
/// Fleet-wide endpoint of [`INTERNAL_RECEIVER`]. Peers are addressed by
/// hostname only, so every agent must listen on the same port.
pub const INTERNAL_ENDPOINT: &str = "0.0.0.0:4949";
/// Exporter that fans traces out to peers.
pub const LB_EXPORTER: &str = "loadbalancing";
/// Default trace pipeline.
pub const TRACES_PIPELINE: &str = "traces";
/// Pipeline holding the original trace receivers on capable agents.
pub const TRACES_LB_PIPELINE: &str = "traces/lb";

/// Target topology for one agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DesiredState {
    /// Ingest original traffic, balance it across peers, and ingest forwarded traffic.
    LbEnabled,
    /// Ingest forwarded traffic only.
    LbDisabled,
}

impl DesiredState {
    /// State an agent should be planned with when the fleet targets `self`.
    ///
    /// Agents without load-balancing support always run forwarded-only.
    pub fn for_agent(self, can_lb: bool) -> DesiredState {
        if can_lb {
            self
        } else {
            DesiredState::LbDisabled
        }
    }
}

impl fmt::Display for DesiredState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DesiredState::LbEnabled => f.write_str("lb-enabled"),
            DesiredState::LbDisabled => f.write_str("lb-disabled"),
        }
    }
}
