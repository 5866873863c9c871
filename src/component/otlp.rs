//! Typed views of the OTLP receiver and exporter.

use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// `receivers.otlp*` configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtlpReceiverConfig {
    #[serde(default)]
    pub protocols: OtlpProtocols,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl OtlpReceiverConfig {
    /// Receiver listening for OTLP/HTTP on `endpoint` only.
    pub fn http(endpoint: impl Into<String>) -> Self {
        Self {
            protocols: OtlpProtocols {
                grpc: None,
                http: Some(ServerSettings::at(endpoint)),
            },
            extra: BTreeMap::new(),
        }
    }
}

/// Enabled protocols. A protocol key present with an empty body
/// (`grpc:`) is enabled with defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtlpProtocols {
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_means_enabled"
    )]
    pub grpc: Option<ServerSettings>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "present_means_enabled"
    )]
    pub http: Option<ServerSettings>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl ServerSettings {
    pub fn at(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: Some(endpoint.into()),
            extra: BTreeMap::new(),
        }
    }
}

fn present_means_enabled<'de, D>(deserializer: D) -> Result<Option<ServerSettings>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<ServerSettings>::deserialize(deserializer).map(|s| Some(s.unwrap_or_default()))
}

/// `exporters.otlp*` configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OtlpExporterConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tls: Option<TlsSettings>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TlsSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insecure: Option<bool>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}
