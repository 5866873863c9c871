use super::plan::{Mutation, TopologyPlan};
use super::validation::validate_references;
use super::{
    DesiredState, INTERNAL_ENDPOINT, INTERNAL_RECEIVER, LB_EXPORTER, TRACES_LB_PIPELINE,
    TRACES_PIPELINE,
};
use crate::component::{
    ComponentAccessor, ComponentId, ComponentKind, LoadBalancingExporterConfig,
    OtlpReceiverConfig, Pipeline,
};
use crate::config::LoadBalancingSettings;
use crate::document::{ConfigDocument, ConfigPath};
use crate::error::{DocumentError, ReconcileError};
use serde::Serialize;
use tracing::debug;

/// Computes topology plans. Holds only settings; planning is pure.
#[derive(Debug, Clone, Default)]
pub struct TopologyPlanner {
    settings: LoadBalancingSettings,
}

impl TopologyPlanner {
    pub fn new(settings: LoadBalancingSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &LoadBalancingSettings {
        &self.settings
    }

    /// Plan the mutations that bring `document` to `desired`.
    ///
    /// Planning against a document already in the target shape returns an
    /// empty plan.
    pub fn plan(
        &self,
        document: &ConfigDocument,
        can_lb: bool,
        desired: DesiredState,
    ) -> Result<TopologyPlan, ReconcileError> {
        if desired == DesiredState::LbEnabled && !can_lb {
            return Err(ReconcileError::Capability(
                "load balancing requested for an agent without load-balancing support"
                    .to_string(),
            ));
        }

        let mut builder = PlanBuilder::new(document);
        let internal = ComponentId::new(INTERNAL_RECEIVER);
        let lb_exporter = ComponentId::new(LB_EXPORTER);

        builder.ensure_component(
            ComponentKind::Receiver,
            &internal,
            &OtlpReceiverConfig::http(INTERNAL_ENDPOINT),
        )?;
        if desired == DesiredState::LbEnabled {
            builder.ensure_component(
                ComponentKind::Exporter,
                &lb_exporter,
                &LoadBalancingExporterConfig::dns(
                    self.settings.resolver_hostnames.clone(),
                    self.settings.protocol_timeout.clone(),
                ),
            )?;
        }

        let traces = builder
            .accessor
            .pipeline(TRACES_PIPELINE)?
            .ok_or_else(missing_traces_pipeline)?;
        let balanced = builder.accessor.pipeline(TRACES_LB_PIPELINE)?;
        let forwarded_only = traces.receivers == [INTERNAL_RECEIVER];

        // Owned copy: `traces` is rewritten below and must not leak into `traces/lb`.
        let captured: Vec<String> = match desired {
            DesiredState::LbEnabled if forwarded_only => match &balanced {
                Some(lb) => external_receivers(&lb.receivers),
                None => {
                    return Err(ReconcileError::Referential(format!(
                        "pipeline `{}` only ingests `{}` and no `{}` pipeline holds its original receivers",
                        TRACES_PIPELINE, INTERNAL_RECEIVER, TRACES_LB_PIPELINE
                    )))
                }
            },
            _ => external_receivers(&traces.receivers),
        };

        match desired {
            DesiredState::LbEnabled => {
                if captured.is_empty() {
                    return Err(ReconcileError::Referential(format!(
                        "pipeline `{}` has no receivers to balance",
                        TRACES_PIPELINE
                    )));
                }
                let lb = Pipeline::new(captured.clone(), Vec::new(), vec![LB_EXPORTER.to_string()]);
                builder.put_pipeline(TRACES_LB_PIPELINE, lb)?;
            }
            DesiredState::LbDisabled => {
                builder.remove_pipeline(TRACES_LB_PIPELINE)?;
                builder.remove_unreferenced(ComponentKind::Exporter, &lb_exporter)?;
            }
        }
        builder.set_pipeline_receivers(TRACES_PIPELINE, vec![INTERNAL_RECEIVER.to_string()])?;

        let plan = builder.finish(captured);
        debug!(
            desired = %desired,
            mutations = plan.len(),
            captured = ?plan.captured_receivers(),
            "Planned topology"
        );
        Ok(plan)
    }

    /// Plan the way back to the default topology from a live document.
    ///
    /// Uses the receivers kept in `traces/lb`. Forwarded-only documents have
    /// lost their original receivers and cannot be restored this way.
    pub fn plan_restore(&self, document: &ConfigDocument) -> Result<TopologyPlan, ReconcileError> {
        let mut builder = PlanBuilder::new(document);
        let traces = builder
            .accessor
            .pipeline(TRACES_PIPELINE)?
            .ok_or_else(missing_traces_pipeline)?;

        let Some(balanced) = builder.accessor.pipeline(TRACES_LB_PIPELINE)? else {
            if traces.receivers == [INTERNAL_RECEIVER] {
                return Err(ReconcileError::Referential(format!(
                    "pipeline `{}` only ingests `{}`; its original receivers are unknown",
                    TRACES_PIPELINE, INTERNAL_RECEIVER
                )));
            }
            return Ok(builder.finish(external_receivers(&traces.receivers)));
        };

        let captured = external_receivers(&balanced.receivers);
        if captured.is_empty() {
            return Err(ReconcileError::Referential(format!(
                "pipeline `{}` holds no receivers to restore into `{}`",
                TRACES_LB_PIPELINE, TRACES_PIPELINE
            )));
        }
        builder.set_pipeline_receivers(TRACES_PIPELINE, captured.clone())?;
        builder.remove_pipeline(TRACES_LB_PIPELINE)?;
        builder.remove_unreferenced(ComponentKind::Exporter, &ComponentId::new(LB_EXPORTER))?;
        builder.remove_unreferenced(
            ComponentKind::Receiver,
            &ComponentId::new(INTERNAL_RECEIVER),
        )?;
        Ok(builder.finish(captured))
    }

    /// Check a planned document: references resolve and re-planning is a no-op.
    pub fn verify(
        &self,
        planned: &ConfigDocument,
        can_lb: bool,
        desired: DesiredState,
    ) -> Result<(), ReconcileError> {
        validate_references(planned)?;
        let replan = self.plan(planned, can_lb, desired)?;
        if !replan.is_noop() {
            let pending: Vec<String> = replan.mutations().iter().map(Mutation::describe).collect();
            return Err(ReconcileError::Referential(format!(
                "planned document has not converged: {}",
                pending.join("; ")
            )));
        }
        Ok(())
    }
}

/// Receivers other than `otlp_internal`. Forwarded traffic only enters `traces`.
fn external_receivers(receivers: &[String]) -> Vec<String> {
    receivers
        .iter()
        .filter(|id| id.as_str() != INTERNAL_RECEIVER)
        .cloned()
        .collect()
}

fn missing_traces_pipeline() -> ReconcileError {
    ReconcileError::Referential(format!("pipeline `{}` not found", TRACES_PIPELINE))
}

/// Applies mutations to a working copy while recording their inverses.
struct PlanBuilder {
    accessor: ComponentAccessor,
    mutations: Vec<Mutation>,
    inverse: Vec<Mutation>,
}

impl PlanBuilder {
    fn new(document: &ConfigDocument) -> Self {
        Self {
            accessor: ComponentAccessor::new(document.clone()),
            mutations: Vec::new(),
            inverse: Vec::new(),
        }
    }

    fn record(&mut self, forward: Mutation, inverse: Mutation) -> Result<(), DocumentError> {
        forward.apply(&mut self.accessor)?;
        self.mutations.push(forward);
        self.inverse.push(inverse);
        Ok(())
    }

    /// Merge `config` over the component, recording only if it changes anything.
    fn ensure_component<T: Serialize>(
        &mut self,
        kind: ComponentKind,
        id: &ComponentId,
        config: &T,
    ) -> Result<(), DocumentError> {
        self.accessor.document().section(kind.section())?;
        let value = serde_yaml::to_value(config).map_err(DocumentError::Encode)?;
        let mut patch = ConfigDocument::new();
        patch.set(ConfigPath::root(kind.section()).child(id.as_str()), value)?;

        let current = self.accessor.document();
        if current.merged(&patch)? == *current {
            return Ok(());
        }
        let inverse = match self.accessor.component_config(kind, id) {
            Some(previous) => Mutation::PutComponent {
                kind,
                id: id.clone(),
                config: previous.clone(),
            },
            None => Mutation::RemoveComponent {
                kind,
                id: id.clone(),
            },
        };
        self.record(Mutation::Merge(patch), inverse)
    }

    fn put_pipeline(&mut self, name: &str, pipeline: Pipeline) -> Result<(), DocumentError> {
        let previous = self.accessor.pipeline(name)?;
        if previous.as_ref() == Some(&pipeline) {
            return Ok(());
        }
        let inverse = match previous {
            Some(previous) => Mutation::PutPipeline {
                name: name.to_string(),
                pipeline: previous,
            },
            None => Mutation::RemovePipeline {
                name: name.to_string(),
            },
        };
        self.record(
            Mutation::PutPipeline {
                name: name.to_string(),
                pipeline,
            },
            inverse,
        )
    }

    fn set_pipeline_receivers(
        &mut self,
        name: &str,
        receivers: Vec<String>,
    ) -> Result<(), DocumentError> {
        let previous = self
            .accessor
            .pipeline(name)?
            .map(|p| p.receivers)
            .unwrap_or_default();
        if previous == receivers {
            return Ok(());
        }
        self.record(
            Mutation::SetPipelineReceivers {
                name: name.to_string(),
                receivers,
            },
            Mutation::SetPipelineReceivers {
                name: name.to_string(),
                receivers: previous,
            },
        )
    }

    fn remove_pipeline(&mut self, name: &str) -> Result<(), DocumentError> {
        let Some(previous) = self.accessor.pipeline(name)? else {
            return Ok(());
        };
        self.record(
            Mutation::RemovePipeline {
                name: name.to_string(),
            },
            Mutation::PutPipeline {
                name: name.to_string(),
                pipeline: previous,
            },
        )
    }

    /// Remove a component when no remaining pipeline references it.
    fn remove_unreferenced(
        &mut self,
        kind: ComponentKind,
        id: &ComponentId,
    ) -> Result<(), DocumentError> {
        let Some(previous) = self.accessor.component_config(kind, id).cloned() else {
            return Ok(());
        };
        let referenced = self.accessor.pipelines()?.iter().any(|(_, p)| match kind {
            ComponentKind::Receiver => p.references_receiver(id.as_str()),
            ComponentKind::Exporter => p.references_exporter(id.as_str()),
            ComponentKind::Processor => p.processors.iter().any(|x| x == id.as_str()),
        });
        if referenced {
            return Ok(());
        }
        self.record(
            Mutation::RemoveComponent {
                kind,
                id: id.clone(),
            },
            Mutation::PutComponent {
                kind,
                id: id.clone(),
                config: previous,
            },
        )
    }

    fn finish(self, captured: Vec<String>) -> TopologyPlan {
        let mut inverse = self.inverse;
        inverse.reverse();
        TopologyPlan::new(self.mutations, inverse, captured)
    }
}
