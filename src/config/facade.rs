//! ConfigLoader facade delegating to merge service.

use super::merge::service::MergeService;
use super::FleetConfig;
use crate::error::SetupError;
use std::path::Path;

/// Configuration loader facade.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from an optional file and the environment, then validate it.
    pub fn load(path: Option<&Path>) -> Result<FleetConfig, SetupError> {
        let config = MergeService::load(path)?;
        config.validate()?;
        Ok(config)
    }
}
