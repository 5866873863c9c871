//! Error types for document handling, reconciliation, and bootstrap.

use crate::fleet::RunReport;
use thiserror::Error;

/// Errors raised while parsing, navigating, or rewriting a configuration document.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("malformed document: {0}")]
    Parse(#[source] serde_yaml::Error),

    #[error("unexpected shape at `{path}`: expected {expected}, found {found}")]
    Shape {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("merge conflict at `{path}`: destination is a {destination}, patch is a {patch}")]
    MergeConflict {
        path: String,
        destination: &'static str,
        patch: &'static str,
    },

    #[error("failed to decode `{path}`: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to encode document: {0}")]
    Encode(#[source] serde_yaml::Error),
}

/// Errors raised by planning and fleet reconciliation.
#[derive(Debug, Error)]
pub enum ReconcileError {
    #[error("parse error: {0}")]
    Parse(#[from] DocumentError),

    #[error("referential error: {0}")]
    Referential(String),

    #[error("capability error: {0}")]
    Capability(String),

    #[error("apply failed for agent {agent_id}: {reason}")]
    Apply { agent_id: String, reason: String },

    #[error("rollback failed for agents: {}", agents.join(", "))]
    Rollback {
        agents: Vec<String>,
        report: Box<RunReport>,
    },

    #[error("agent {0} is already part of a run in flight")]
    Busy(String),

    #[error("agent directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("run cancelled before commit")]
    Cancelled,
}

/// Failure reported by an agent directory while listing the roster.
#[derive(Debug, Error)]
#[error("{0}")]
pub struct DirectoryError(pub String);

/// Errors raised while loading configuration or installing the log subscriber.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("logging error: {0}")]
    Logging(String),
}
