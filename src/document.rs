//! Structured Configuration Documents
//!
//! A parsed, addressable YAML tree for one agent's pipeline configuration.
//! Documents are created from an agent's effective config bytes, mutated in
//! memory, and serialized back before being handed to the agent directory.

mod merge;
mod path;

pub use path::ConfigPath;

use crate::error::DocumentError;
use serde_yaml::{Mapping, Value};

/// Top-level receiver section.
pub const RECEIVERS: &str = "receivers";
/// Top-level exporter section.
pub const EXPORTERS: &str = "exporters";
/// Top-level processor section.
pub const PROCESSORS: &str = "processors";
/// Top-level service section.
pub const SERVICE: &str = "service";
/// Pipelines map under `service`.
pub const PIPELINES: &str = "pipelines";

/// Path of the pipelines map: `service.pipelines`.
pub fn pipelines_path() -> ConfigPath {
    ConfigPath::root(SERVICE).child(PIPELINES)
}

/// Parsed configuration document.
///
/// The root is always a map. Equality is structural and insensitive to map
/// key order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigDocument {
    root: Mapping,
}

impl ConfigDocument {
    /// Create an empty document
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse serialized YAML.
    ///
    /// Empty input yields an empty document. A root that is not a map is a
    /// shape error.
    pub fn parse(bytes: &[u8]) -> Result<Self, DocumentError> {
        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::new());
        }
        let value: Value = serde_yaml::from_slice(bytes).map_err(DocumentError::Parse)?;
        Self::from_value(value)
    }

    /// Wrap an already-parsed value.
    pub fn from_value(value: Value) -> Result<Self, DocumentError> {
        match value {
            Value::Mapping(root) => Ok(Self { root }),
            Value::Null => Ok(Self::new()),
            other => Err(DocumentError::Shape {
                path: ConfigPath::default().to_string(),
                expected: "map",
                found: kind_name(&other),
            }),
        }
    }

    pub fn root(&self) -> &Mapping {
        &self.root
    }

    /// Look up the value at `path`. Missing paths return `None`.
    pub fn get(&self, path: impl Into<ConfigPath>) -> Option<&Value> {
        let path = path.into();
        let (first, rest) = path.segments().split_first()?;
        let mut current = self.root.get(first.as_str())?;
        for segment in rest {
            current = current.as_mapping()?.get(segment.as_str())?;
        }
        Some(current)
    }

    /// Whether a value exists at `path`.
    pub fn contains(&self, path: impl Into<ConfigPath>) -> bool {
        self.get(path).is_some()
    }

    /// Map at `path`, defaulting to empty when the path is absent or null.
    ///
    /// Anything other than a map or null is a shape error.
    pub fn section(&self, path: impl Into<ConfigPath>) -> Result<Mapping, DocumentError> {
        let path = path.into();
        match self.get(&path) {
            None | Some(Value::Null) => Ok(Mapping::new()),
            Some(Value::Mapping(map)) => Ok(map.clone()),
            Some(other) => Err(DocumentError::Shape {
                path: path.to_string(),
                expected: "map",
                found: kind_name(other),
            }),
        }
    }

    /// Write `value` at `path`, creating missing or null intermediate maps.
    pub fn set(&mut self, path: impl Into<ConfigPath>, value: Value) -> Result<(), DocumentError> {
        let path = path.into();
        let Some((last, parents)) = path.segments().split_last() else {
            *self = Self::from_value(value)?;
            return Ok(());
        };

        let mut current = &mut self.root;
        let mut walked = ConfigPath::default();
        for segment in parents {
            walked = walked.child(segment.clone());
            let entry = current
                .entry(Value::String(segment.clone()))
                .or_insert(Value::Null);
            if entry.is_null() {
                *entry = Value::Mapping(Mapping::new());
            }
            current = match entry {
                Value::Mapping(map) => map,
                other => {
                    return Err(DocumentError::Shape {
                        path: walked.to_string(),
                        expected: "map",
                        found: kind_name(other),
                    })
                }
            };
        }
        current.insert(Value::String(last.clone()), value);
        Ok(())
    }

    /// Remove and return the value at `path`.
    pub fn remove(&mut self, path: impl Into<ConfigPath>) -> Option<Value> {
        let path = path.into();
        let (last, parents) = path.segments().split_last()?;
        let mut current = &mut self.root;
        for segment in parents {
            current = current.get_mut(segment.as_str())?.as_mapping_mut()?;
        }
        current.remove(last.as_str())
    }

    /// Merge `patch` into this document in place.
    ///
    /// On conflict the document is left untouched.
    pub fn merge(&mut self, patch: &ConfigDocument) -> Result<(), DocumentError> {
        *self = self.merged(patch)?;
        Ok(())
    }

    /// Return the merge of `patch` over this document.
    pub fn merged(&self, patch: &ConfigDocument) -> Result<ConfigDocument, DocumentError> {
        let mut root = self.root.clone();
        merge::merge_mapping(&mut root, &patch.root, &mut Vec::new())?;
        Ok(Self { root })
    }

    /// Serialize back to YAML bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        serde_yaml::to_string(&self.root)
            .map(String::into_bytes)
            .map_err(DocumentError::Encode)
    }
}

/// Human-readable kind of a YAML node, used in error messages.
pub(crate) fn kind_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Sequence(_) => "sequence",
        Value::Mapping(_) => "map",
        Value::Tagged(_) => "tagged value",
    }
}
