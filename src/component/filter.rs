use serde::{Deserialize, Serialize};

/// `processors.filter*` configuration, metrics section only.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterProcessorConfig {
    #[serde(default)]
    pub metrics: MetricFilters,
}

/// Conditions matched against metric and data point properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricFilters {
    #[serde(rename = "metric", default, skip_serializing_if = "Vec::is_empty")]
    pub metric_conditions: Vec<String>,
    #[serde(rename = "datapoint", default, skip_serializing_if = "Vec::is_empty")]
    pub data_point_conditions: Vec<String>,
}
