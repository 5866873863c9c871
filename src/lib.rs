//! lbfleet: Trace Load-Balancing Fleet Reconciliation
//!
//! Rewires the pipeline topology of a fleet of telemetry-collector agents so
//! that load-balancing capable agents fan incoming traces out to their peers
//! while every agent ingests the forwarded traffic.
//!
//! - [`document`]: addressable YAML configuration documents with deep merge.
//! - [`component`]: typed access to receivers, processors, exporters and pipelines.
//! - [`topology`]: pure planning of the load-balanced topology and its inverse.
//! - [`fleet`]: dry-run, commit and rollback across the whole fleet.

pub mod component;
pub mod concurrency;
pub mod config;
pub mod document;
pub mod error;
pub mod fleet;
pub mod logging;
pub mod topology;

pub use component::{ComponentAccessor, ComponentId, ComponentKind, Pipeline};
pub use concurrency::{AgentLockManager, CancellationFlag};
pub use config::{ConfigLoader, FleetConfig, LoadBalancingSettings, ReconcilerConfig};
pub use document::{ConfigDocument, ConfigPath};
pub use error::{DirectoryError, DocumentError, ReconcileError, SetupError};
pub use fleet::{
    Agent, AgentDirectory, AgentState, FleetReconciler, InMemoryAgentDirectory, PushOutcome,
    RunOutcome, RunReport,
};
pub use logging::{init_logging, LoggingConfig};
pub use topology::{DesiredState, TopologyPlan, TopologyPlanner};
