//! Environment variable source: LBFLEET prefix with __ separator

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::Environment;

pub(crate) const PREFIX: &str = "LBFLEET";

/// Add environment variable overlay to builder.
///
/// `LBFLEET__RECONCILER__PUSH_TIMEOUT_MS=500` sets `reconciler.push_timeout_ms`.
/// Resolver hostnames take a comma-separated list.
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let builder = builder.add_source(
        Environment::with_prefix(PREFIX)
            .separator("__")
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("load_balancing.resolver_hostnames"),
    );
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use config::Config;

    #[test]
    fn test_environment_overlay() {
        std::env::set_var("LBFLEET__LOGGING__COLOR", "false");
        std::env::set_var(
            "LBFLEET__LOAD_BALANCING__RESOLVER_HOSTNAMES",
            "east.peers,west.peers",
        );
        let built = add_to_builder(Config::builder()).and_then(|b| b.build());
        std::env::remove_var("LBFLEET__LOGGING__COLOR");
        std::env::remove_var("LBFLEET__LOAD_BALANCING__RESOLVER_HOSTNAMES");

        let config = built.unwrap();
        assert!(!config.get_bool("logging.color").unwrap());
        assert_eq!(
            config
                .get::<Vec<String>>("load_balancing.resolver_hostnames")
                .unwrap(),
            vec!["east.peers", "west.peers"]
        );
    }
}
