//! Typed view of the load-balancing exporter.

use super::otlp::OtlpExporterConfig;
use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// `exporters.loadbalancing` configuration.
///
/// Forwards over OTLP to peers found through the resolver.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadBalancingExporterConfig {
    #[serde(default)]
    pub protocol: ForwardingProtocol,
    #[serde(default)]
    pub resolver: ResolverSettings,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl LoadBalancingExporterConfig {
    /// OTLP forwarding with `timeout`, peers resolved from DNS `hostnames`.
    pub fn dns(hostnames: Vec<String>, timeout: impl Into<String>) -> Self {
        Self {
            protocol: ForwardingProtocol {
                otlp: OtlpExporterConfig {
                    timeout: Some(timeout.into()),
                    ..OtlpExporterConfig::default()
                },
            },
            resolver: ResolverSettings {
                dns: Some(DnsResolver { hostname: hostnames }),
                static_hosts: None,
            },
            extra: BTreeMap::new(),
        }
    }

    /// All peer hostnames the resolver knows about.
    pub fn peer_hostnames(&self) -> Vec<&str> {
        let dns = self.resolver.dns.iter().flat_map(|d| d.hostname.iter());
        let fixed = self
            .resolver
            .static_hosts
            .iter()
            .flat_map(|s| s.hostnames.iter());
        dns.chain(fixed).map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForwardingProtocol {
    #[serde(default)]
    pub otlp: OtlpExporterConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResolverSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns: Option<DnsResolver>,
    #[serde(rename = "static", default, skip_serializing_if = "Option::is_none")]
    pub static_hosts: Option<StaticResolver>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsResolver {
    #[serde(default)]
    pub hostname: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StaticResolver {
    #[serde(default)]
    pub hostnames: Vec<String>,
}
