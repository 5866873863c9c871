use serde::{Deserialize, Serialize};
use std::fmt;

/// Component identifier in `type[/name]` form, e.g. `otlp`, `otlp/2`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ComponentId(String);

impl ComponentId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Build `kind/name`.
    pub fn with_name(kind: &str, name: &str) -> Self {
        Self(format!("{}/{}", kind, name))
    }

    /// Component type: everything before the first `/`.
    pub fn kind(&self) -> &str {
        self.0.split_once('/').map(|(kind, _)| kind).unwrap_or(&self.0)
    }

    /// Instance name after the first `/`, if any.
    pub fn name(&self) -> Option<&str> {
        self.0.split_once('/').map(|(_, name)| name)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ComponentId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for ComponentId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ComponentId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
