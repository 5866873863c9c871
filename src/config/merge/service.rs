//! MergeService: orchestrates sources and deserializes to FleetConfig.

use crate::config::sources::environment;
use crate::config::FleetConfig;
use config::{Config, ConfigError, File};
use std::path::Path;

/// Merge service for config composition.
pub struct MergeService;

impl MergeService {
    /// Precedence: serde defaults (lowest) -> file -> environment (highest).
    pub fn load(path: Option<&Path>) -> Result<FleetConfig, ConfigError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(File::from(path).required(true));
        }
        let builder = environment::add_to_builder(builder)?;

        let config = builder.build()?;
        config.try_deserialize()
    }
}
