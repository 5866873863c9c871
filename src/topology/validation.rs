use crate::component::{ComponentAccessor, ComponentId, ComponentKind};
use crate::document::ConfigDocument;
use crate::error::ReconcileError;
use std::collections::HashSet;

/// Check that every receiver and exporter a pipeline names is defined in its
/// section. Processor lists are not checked.
pub fn validate_references(document: &ConfigDocument) -> Result<(), ReconcileError> {
    let accessor = ComponentAccessor::new(document.clone());
    let defined = |kind| -> Result<HashSet<ComponentId>, ReconcileError> {
        Ok(accessor.component_ids(kind)?.into_iter().collect())
    };
    let receivers = defined(ComponentKind::Receiver)?;
    let exporters = defined(ComponentKind::Exporter)?;

    for (name, pipeline) in accessor.pipelines()? {
        let lists = [
            (ComponentKind::Receiver, &pipeline.receivers, &receivers),
            (ComponentKind::Exporter, &pipeline.exporters, &exporters),
        ];
        for (kind, ids, known) in lists {
            if let Some(missing) = ids
                .iter()
                .find(|id| !known.contains(&ComponentId::new(id.as_str())))
            {
                return Err(ReconcileError::Referential(format!(
                    "pipeline `{}` references undefined {} `{}`",
                    name, kind, missing
                )));
            }
        }
    }
    Ok(())
}
