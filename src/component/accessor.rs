//! Typed access to component and pipeline entries of one agent's document.

use super::id::ComponentId;
use super::pipeline::Pipeline;
use crate::document::{
    pipelines_path, ConfigDocument, ConfigPath, EXPORTERS, PROCESSORS, RECEIVERS,
};
use crate::error::DocumentError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use std::fmt;

/// Top-level component section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ComponentKind {
    Receiver,
    Processor,
    Exporter,
}

impl ComponentKind {
    pub fn section(self) -> &'static str {
        match self {
            ComponentKind::Receiver => RECEIVERS,
            ComponentKind::Processor => PROCESSORS,
            ComponentKind::Exporter => EXPORTERS,
        }
    }

    fn path(self, id: &ComponentId) -> ConfigPath {
        ConfigPath::root(self.section()).child(id.as_str())
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ComponentKind::Receiver => "receiver",
            ComponentKind::Processor => "processor",
            ComponentKind::Exporter => "exporter",
        };
        f.write_str(name)
    }
}

/// Reads and writes typed component configs inside one document.
///
/// Owns its document: writes are visible to later reads through the same
/// accessor and never touch the bytes the document was parsed from.
#[derive(Debug, Clone)]
pub struct ComponentAccessor {
    document: ConfigDocument,
}

impl ComponentAccessor {
    pub fn new(document: ConfigDocument) -> Self {
        Self { document }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DocumentError> {
        ConfigDocument::parse(bytes).map(Self::new)
    }

    pub fn document(&self) -> &ConfigDocument {
        &self.document
    }

    pub fn into_document(self) -> ConfigDocument {
        self.document
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, DocumentError> {
        self.document.to_bytes()
    }

    /// Merge a patch over the underlying document.
    pub fn merge(&mut self, patch: &ConfigDocument) -> Result<(), DocumentError> {
        self.document.merge(patch)
    }

    /// Raw config of a component, `None` when it does not exist.
    pub fn component_config(&self, kind: ComponentKind, id: &ComponentId) -> Option<&Value> {
        self.document.get(kind.path(id))
    }

    pub fn receiver_config(&self, id: &ComponentId) -> Option<&Value> {
        self.component_config(ComponentKind::Receiver, id)
    }

    pub fn exporter_config(&self, id: &ComponentId) -> Option<&Value> {
        self.component_config(ComponentKind::Exporter, id)
    }

    pub fn processor_config(&self, id: &ComponentId) -> Option<&Value> {
        self.component_config(ComponentKind::Processor, id)
    }

    /// Decode a component into `T`.
    ///
    /// A present key with an empty body decodes from null, which works for
    /// types whose fields are all optional or defaulted.
    pub fn typed_component<T: DeserializeOwned>(
        &self,
        kind: ComponentKind,
        id: &ComponentId,
    ) -> Result<Option<T>, DocumentError> {
        let Some(value) = self.component_config(kind, id) else {
            return Ok(None);
        };
        let value = match value {
            Value::Null => Value::Mapping(Mapping::new()),
            other => other.clone(),
        };
        serde_yaml::from_value(value)
            .map(Some)
            .map_err(|source| DocumentError::Decode {
                path: kind.path(id).to_string(),
                source,
            })
    }

    pub fn typed_receiver<T: DeserializeOwned>(
        &self,
        id: &ComponentId,
    ) -> Result<Option<T>, DocumentError> {
        self.typed_component(ComponentKind::Receiver, id)
    }

    pub fn typed_exporter<T: DeserializeOwned>(
        &self,
        id: &ComponentId,
    ) -> Result<Option<T>, DocumentError> {
        self.typed_component(ComponentKind::Exporter, id)
    }

    pub fn typed_processor<T: DeserializeOwned>(
        &self,
        id: &ComponentId,
    ) -> Result<Option<T>, DocumentError> {
        self.typed_component(ComponentKind::Processor, id)
    }

    /// Replace a component's config with the serialized form of `config`.
    pub fn set_component_config<T: Serialize>(
        &mut self,
        kind: ComponentKind,
        id: &ComponentId,
        config: &T,
    ) -> Result<(), DocumentError> {
        let value = serde_yaml::to_value(config).map_err(DocumentError::Encode)?;
        self.put_component(kind, id, value)
    }

    /// Replace a component's config with a raw value.
    pub fn put_component(
        &mut self,
        kind: ComponentKind,
        id: &ComponentId,
        value: Value,
    ) -> Result<(), DocumentError> {
        // Validate the section shape before writing into it.
        self.document.section(kind.section())?;
        self.document.set(kind.path(id), value)
    }

    pub fn set_receiver_config<T: Serialize>(
        &mut self,
        id: &ComponentId,
        config: &T,
    ) -> Result<(), DocumentError> {
        self.set_component_config(ComponentKind::Receiver, id, config)
    }

    pub fn set_exporter_config<T: Serialize>(
        &mut self,
        id: &ComponentId,
        config: &T,
    ) -> Result<(), DocumentError> {
        self.set_component_config(ComponentKind::Exporter, id, config)
    }

    pub fn set_processor_config<T: Serialize>(
        &mut self,
        id: &ComponentId,
        config: &T,
    ) -> Result<(), DocumentError> {
        self.set_component_config(ComponentKind::Processor, id, config)
    }

    pub fn remove_component(&mut self, kind: ComponentKind, id: &ComponentId) -> Option<Value> {
        self.document.remove(kind.path(id))
    }

    pub fn remove_receiver(&mut self, id: &ComponentId) -> Option<Value> {
        self.remove_component(ComponentKind::Receiver, id)
    }

    pub fn remove_exporter(&mut self, id: &ComponentId) -> Option<Value> {
        self.remove_component(ComponentKind::Exporter, id)
    }

    pub fn remove_processor(&mut self, id: &ComponentId) -> Option<Value> {
        self.remove_component(ComponentKind::Processor, id)
    }

    /// IDs defined in a component section. Absent sections are empty.
    pub fn component_ids(&self, kind: ComponentKind) -> Result<Vec<ComponentId>, DocumentError> {
        let section = self.document.section(kind.section())?;
        Ok(section
            .keys()
            .filter_map(Value::as_str)
            .map(ComponentId::new)
            .collect())
    }

    /// All pipelines, in document order.
    pub fn pipelines(&self) -> Result<Vec<(String, Pipeline)>, DocumentError> {
        let section = self.document.section(pipelines_path())?;
        let mut pipelines = Vec::with_capacity(section.len());
        for (name, body) in section {
            let Some(name) = name.as_str() else {
                continue;
            };
            let pipeline = decode_pipeline(name, body)?;
            pipelines.push((name.to_string(), pipeline));
        }
        Ok(pipelines)
    }

    pub fn pipeline(&self, name: &str) -> Result<Option<Pipeline>, DocumentError> {
        self.document.section(pipelines_path())?;
        match self.document.get(pipelines_path().child(name)) {
            None => Ok(None),
            Some(body) => decode_pipeline(name, body.clone()).map(Some),
        }
    }

    /// Create or replace a whole pipeline.
    pub fn set_pipeline(&mut self, name: &str, pipeline: &Pipeline) -> Result<(), DocumentError> {
        let value = serde_yaml::to_value(pipeline).map_err(DocumentError::Encode)?;
        self.document.section(pipelines_path())?;
        self.document.set(pipelines_path().child(name), value)
    }

    /// Replace only the `receivers` list of an existing pipeline.
    pub fn set_pipeline_receivers(
        &mut self,
        name: &str,
        receivers: &[String],
    ) -> Result<(), DocumentError> {
        let path = pipelines_path().child(name);
        match self.document.get(&path) {
            Some(Value::Mapping(_)) | Some(Value::Null) | None => {}
            Some(other) => {
                return Err(DocumentError::Shape {
                    path: path.to_string(),
                    expected: "map",
                    found: crate::document::kind_name(other),
                })
            }
        }
        let list = Value::Sequence(receivers.iter().cloned().map(Value::String).collect());
        self.document.set(path.child("receivers"), list)
    }

    /// Remove a pipeline and return its body. A body that does not decode is
    /// an error and the pipeline is left in place.
    pub fn remove_pipeline(&mut self, name: &str) -> Result<Option<Pipeline>, DocumentError> {
        let path = pipelines_path().child(name);
        let Some(body) = self.document.get(path.clone()).cloned() else {
            return Ok(None);
        };
        let pipeline = decode_pipeline(name, body)?;
        self.document.remove(path);
        Ok(Some(pipeline))
    }
}

fn decode_pipeline(name: &str, body: Value) -> Result<Pipeline, DocumentError> {
    let body = match body {
        Value::Null => Value::Mapping(Mapping::new()),
        other => other,
    };
    serde_yaml::from_value(body).map_err(|source| DocumentError::Decode {
        path: pipelines_path().child(name).to_string(),
        source,
    })
}
