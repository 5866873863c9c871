use serde::{Deserialize, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// One entry of `service.pipelines`.
///
/// Keys other than the three component lists are kept in `extra` so a
/// pipeline can be rewritten without dropping them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub receivers: Vec<String>,
    #[serde(default)]
    pub processors: Vec<String>,
    #[serde(default)]
    pub exporters: Vec<String>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl Pipeline {
    pub fn new(receivers: Vec<String>, processors: Vec<String>, exporters: Vec<String>) -> Self {
        Self {
            receivers,
            processors,
            exporters,
            extra: BTreeMap::new(),
        }
    }

    pub fn references_receiver(&self, id: &str) -> bool {
        self.receivers.iter().any(|r| r == id)
    }

    pub fn references_exporter(&self, id: &str) -> bool {
        self.exporters.iter().any(|e| e == id)
    }
}
