use crate::component::{ComponentAccessor, ComponentId, ComponentKind, Pipeline};
use crate::document::ConfigDocument;
use crate::error::DocumentError;
use serde_yaml::Value;
use tracing::debug;

/// One structural change to an agent's document.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    /// Deep-merge a patch over the document.
    Merge(ConfigDocument),
    /// Replace a component's config wholesale.
    PutComponent {
        kind: ComponentKind,
        id: ComponentId,
        config: Value,
    },
    RemoveComponent {
        kind: ComponentKind,
        id: ComponentId,
    },
    /// Create or replace a pipeline.
    PutPipeline { name: String, pipeline: Pipeline },
    /// Replace a pipeline's receiver list, leaving its other keys alone.
    SetPipelineReceivers { name: String, receivers: Vec<String> },
    RemovePipeline { name: String },
}

impl Mutation {
    pub fn apply(&self, accessor: &mut ComponentAccessor) -> Result<(), DocumentError> {
        debug!(mutation = %self.describe(), "Applying mutation");
        match self {
            Mutation::Merge(patch) => accessor.merge(patch),
            Mutation::PutComponent { kind, id, config } => {
                accessor.put_component(*kind, id, config.clone())
            }
            Mutation::RemoveComponent { kind, id } => {
                accessor.remove_component(*kind, id);
                Ok(())
            }
            Mutation::PutPipeline { name, pipeline } => accessor.set_pipeline(name, pipeline),
            Mutation::SetPipelineReceivers { name, receivers } => {
                accessor.set_pipeline_receivers(name, receivers)
            }
            Mutation::RemovePipeline { name } => accessor.remove_pipeline(name).map(|_| ()),
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match self {
            Mutation::Merge(patch) => {
                let keys: Vec<&str> = patch.root().keys().filter_map(Value::as_str).collect();
                format!("merge [{}]", keys.join(", "))
            }
            Mutation::PutComponent { kind, id, .. } => format!("put {} {}", kind, id),
            Mutation::RemoveComponent { kind, id } => format!("remove {} {}", kind, id),
            Mutation::PutPipeline { name, .. } => format!("put pipeline {}", name),
            Mutation::SetPipelineReceivers { name, receivers } => {
                format!("set {} receivers [{}]", name, receivers.join(", "))
            }
            Mutation::RemovePipeline { name } => format!("remove pipeline {}", name),
        }
    }
}

/// Ordered mutations that move one document to a target topology.
///
/// Carries its own inverse and the trace receiver list captured before any
/// change, so a document produced by [`TopologyPlan::apply`] can be taken
/// back without re-deriving what the forward plan overwrote.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TopologyPlan {
    mutations: Vec<Mutation>,
    /// Stored in the order it must be applied.
    inverse: Vec<Mutation>,
    captured_receivers: Vec<String>,
}

impl TopologyPlan {
    pub(crate) fn new(
        mutations: Vec<Mutation>,
        inverse: Vec<Mutation>,
        captured_receivers: Vec<String>,
    ) -> Self {
        Self {
            mutations,
            inverse,
            captured_receivers,
        }
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    /// Trace receivers the agent ingested before the plan.
    pub fn captured_receivers(&self) -> &[String] {
        &self.captured_receivers
    }

    /// True when the document is already in the target shape.
    pub fn is_noop(&self) -> bool {
        self.mutations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Apply to a copy of `document`. The input is never modified.
    pub fn apply(&self, document: &ConfigDocument) -> Result<ConfigDocument, DocumentError> {
        let mut accessor = ComponentAccessor::new(document.clone());
        for mutation in &self.mutations {
            mutation.apply(&mut accessor)?;
        }
        Ok(accessor.into_document())
    }

    /// Plan that undoes this one when applied to its output.
    pub fn rollback(&self) -> TopologyPlan {
        TopologyPlan {
            mutations: self.inverse.clone(),
            inverse: self.mutations.clone(),
            captured_receivers: self.captured_receivers.clone(),
        }
    }
}
