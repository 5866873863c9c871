//! Configuration
//!
//! Layered settings for the reconciler, the load-balancing exporter it
//! installs, and logging. Sources are merged by [`ConfigLoader`].

mod facade;
mod merge {
    pub(crate) mod service;
}
mod sources {
    pub(crate) mod environment;
}

pub use facade::ConfigLoader;

use crate::error::SetupError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub reconciler: ReconcilerConfig,
    #[serde(default)]
    pub load_balancing: LoadBalancingSettings,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl FleetConfig {
    pub fn validate(&self) -> Result<(), SetupError> {
        self.reconciler.validate()?;
        self.load_balancing.validate()
    }
}

/// Commit-phase limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcilerConfig {
    /// Per-push timeout in milliseconds. An expired push counts as a nack.
    #[serde(default = "default_push_timeout_ms")]
    pub push_timeout_ms: u64,
    /// Pushes in flight at once within one phase.
    #[serde(default = "default_max_concurrent_pushes")]
    pub max_concurrent_pushes: usize,
}

fn default_push_timeout_ms() -> u64 {
    10_000
}

fn default_max_concurrent_pushes() -> usize {
    8
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            push_timeout_ms: default_push_timeout_ms(),
            max_concurrent_pushes: default_max_concurrent_pushes(),
        }
    }
}

impl ReconcilerConfig {
    pub fn push_timeout(&self) -> Duration {
        Duration::from_millis(self.push_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), SetupError> {
        if self.push_timeout_ms == 0 {
            return Err(SetupError::Invalid(
                "reconciler.push_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_pushes == 0 {
            return Err(SetupError::Invalid(
                "reconciler.max_concurrent_pushes must be greater than zero".to_string(),
            ));
        }
        if self.max_concurrent_pushes > tokio::sync::Semaphore::MAX_PERMITS {
            return Err(SetupError::Invalid(format!(
                "reconciler.max_concurrent_pushes must be at most {}",
                tokio::sync::Semaphore::MAX_PERMITS
            )));
        }
        Ok(())
    }
}

/// Settings written into the `loadbalancing` exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadBalancingSettings {
    /// DNS names resolving to every agent's `otlp_internal` receiver.
    #[serde(default = "default_resolver_hostnames")]
    pub resolver_hostnames: Vec<String>,
    /// Forwarding timeout in collector duration syntax.
    #[serde(default = "default_protocol_timeout")]
    pub protocol_timeout: String,
}

fn default_resolver_hostnames() -> Vec<String> {
    vec!["otel-collector".to_string()]
}

fn default_protocol_timeout() -> String {
    "1s".to_string()
}

impl Default for LoadBalancingSettings {
    fn default() -> Self {
        Self {
            resolver_hostnames: default_resolver_hostnames(),
            protocol_timeout: default_protocol_timeout(),
        }
    }
}

impl LoadBalancingSettings {
    pub fn validate(&self) -> Result<(), SetupError> {
        if self.resolver_hostnames.is_empty() {
            return Err(SetupError::Invalid(
                "load_balancing.resolver_hostnames must not be empty".to_string(),
            ));
        }
        if self.resolver_hostnames.iter().any(|h| h.trim().is_empty()) {
            return Err(SetupError::Invalid(
                "load_balancing.resolver_hostnames contains a blank entry".to_string(),
            ));
        }
        if self.protocol_timeout.trim().is_empty() {
            return Err(SetupError::Invalid(
                "load_balancing.protocol_timeout must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}
