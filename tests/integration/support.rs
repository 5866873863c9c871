use lbfleet::{
    Agent, AgentDirectory, ComponentAccessor, ConfigDocument, FleetReconciler,
    InMemoryAgentDirectory, LoadBalancingSettings, Pipeline, ReconcilerConfig,
};
use std::sync::Arc;

pub const CAPABLE_CONFIG: &str = r#"receivers:
  otlp:
    protocols:
      grpc:
      http:
  jaeger:
    protocols:
      grpc:
      thrift_http:
processors:
  batch:
    send_batch_size: 10000
exporters:
  clickhousetraces:
    datasource: tcp://clickhouse:9000/?database=signoz_traces
service:
  pipelines:
    traces:
      receivers: [otlp, jaeger]
      processors: [batch]
      exporters: [clickhousetraces]
"#;

pub const DEPENDENT_CONFIG: &str = r#"receivers:
  otlp:
    protocols:
      grpc:
exporters:
  clickhousetraces:
    datasource: tcp://clickhouse:9000/?database=signoz_traces
service:
  pipelines:
    traces:
      receivers: [otlp]
      exporters: [clickhousetraces]
"#;

pub fn capable(id: &str) -> Agent {
    Agent::new(id, true, CAPABLE_CONFIG)
}

pub fn dependent(id: &str) -> Agent {
    Agent::new(id, false, DEPENDENT_CONFIG)
}

pub fn directory(agents: Vec<Agent>) -> Arc<InMemoryAgentDirectory> {
    Arc::new(InMemoryAgentDirectory::with_agents(agents))
}

pub fn settings() -> LoadBalancingSettings {
    LoadBalancingSettings {
        resolver_hostnames: vec!["collectors.fleet.internal".to_string()],
        protocol_timeout: "1s".to_string(),
    }
}

pub fn reconciler(directory: &Arc<InMemoryAgentDirectory>) -> FleetReconciler {
    reconciler_with(directory, ReconcilerConfig::default())
}

pub fn reconciler_with(
    directory: &Arc<InMemoryAgentDirectory>,
    config: ReconcilerConfig,
) -> FleetReconciler {
    let directory: Arc<dyn AgentDirectory> = directory.clone();
    FleetReconciler::new(directory, config, settings())
}

pub fn roster(directory: &InMemoryAgentDirectory, ids: &[&str]) -> Vec<Agent> {
    ids.iter()
        .map(|id| directory.agent(id).unwrap())
        .collect()
}

pub fn effective(directory: &InMemoryAgentDirectory, id: &str) -> ConfigDocument {
    ConfigDocument::parse(&directory.agent(id).unwrap().effective_config).unwrap()
}

pub fn pipeline(document: &ConfigDocument, name: &str) -> Option<Pipeline> {
    ComponentAccessor::new(document.clone()).pipeline(name).unwrap()
}

pub fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
