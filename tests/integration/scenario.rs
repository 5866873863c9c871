use lbfleet::component::{LoadBalancingExporterConfig, OtlpReceiverConfig};
use lbfleet::topology::{INTERNAL_ENDPOINT, INTERNAL_RECEIVER, LB_EXPORTER, TRACES_LB_PIPELINE};
use lbfleet::{
    AgentState, ComponentAccessor, ComponentId, ConfigDocument, DesiredState, RunOutcome,
};

use crate::integration::support::{
    capable, dependent, directory, effective, pipeline, reconciler, roster, strings,
    CAPABLE_CONFIG, DEPENDENT_CONFIG,
};

fn internal_endpoint(document: &ConfigDocument) -> Option<String> {
    let accessor = ComponentAccessor::new(document.clone());
    let receiver: OtlpReceiverConfig = accessor
        .typed_receiver(&ComponentId::new(INTERNAL_RECEIVER))
        .unwrap()?;
    receiver.protocols.http.and_then(|h| h.endpoint)
}

#[tokio::test]
async fn lb_enabled_commit_rewires_capable_and_dependent_agents() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler(&directory);

    let report = reconciler
        .run(roster(&directory, &["a", "b"]), DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert_eq!(report.outcome, Some(RunOutcome::Committed));
    assert_eq!(report.agent("a").unwrap().state, AgentState::Acked);
    assert_eq!(report.agent("a").unwrap().captured_receivers, strings(&["otlp", "jaeger"]));
    assert_eq!(report.agent("b").unwrap().desired, DesiredState::LbDisabled);

    let a = effective(&directory, "a");
    let traces = pipeline(&a, "traces").unwrap();
    assert_eq!(traces.receivers, strings(&[INTERNAL_RECEIVER]));
    assert_eq!(traces.processors, strings(&["batch"]));
    assert_eq!(traces.exporters, strings(&["clickhousetraces"]));
    let lb = pipeline(&a, TRACES_LB_PIPELINE).unwrap();
    assert_eq!(lb.receivers, strings(&["otlp", "jaeger"]));
    assert!(lb.processors.is_empty());
    assert_eq!(lb.exporters, strings(&[LB_EXPORTER]));
    let exporter: LoadBalancingExporterConfig = ComponentAccessor::new(a.clone())
        .typed_exporter(&ComponentId::new(LB_EXPORTER))
        .unwrap()
        .unwrap();
    assert_eq!(exporter.peer_hostnames(), vec!["collectors.fleet.internal"]);
    assert_eq!(internal_endpoint(&a).as_deref(), Some(INTERNAL_ENDPOINT));

    let b = effective(&directory, "b");
    assert_eq!(
        pipeline(&b, "traces").unwrap().receivers,
        strings(&[INTERNAL_RECEIVER])
    );
    assert!(pipeline(&b, TRACES_LB_PIPELINE).is_none());
    assert!(b.get("exporters.loadbalancing").is_none());
    assert_eq!(internal_endpoint(&b).as_deref(), Some(INTERNAL_ENDPOINT));
}

#[tokio::test]
async fn capable_agents_are_pushed_before_dependent_agents() {
    let directory = directory(vec![dependent("a-dependent"), capable("z-capable")]);
    let reconciler = reconciler(&directory);

    reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    let order: Vec<String> = directory.pushes().into_iter().map(|p| p.agent_id).collect();
    assert_eq!(order, vec!["z-capable", "a-dependent"]);
}

#[tokio::test]
async fn second_run_is_a_no_op() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler(&directory);

    reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    let after_first = directory.push_count();

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert!(report.is_committed());
    assert_eq!(directory.push_count(), after_first);
    assert!(report
        .agents
        .iter()
        .all(|a| a.state == AgentState::Unchanged && a.mutations == 0));
    // Receivers are recovered from `traces/lb` on the second pass.
    assert_eq!(
        report.agent("a").unwrap().captured_receivers,
        strings(&["otlp", "jaeger"])
    );
}

#[tokio::test]
async fn lb_disabled_demotes_a_balanced_fleet() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler(&directory);
    reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();

    let report = reconciler
        .reconcile_fleet(DesiredState::LbDisabled, false)
        .await
        .unwrap();
    assert!(report.is_committed());
    assert_eq!(report.agent("b").unwrap().state, AgentState::Unchanged);

    let a = effective(&directory, "a");
    assert!(pipeline(&a, TRACES_LB_PIPELINE).is_none());
    assert!(a.get("exporters.loadbalancing").is_none());
    assert_eq!(
        pipeline(&a, "traces").unwrap().receivers,
        strings(&[INTERNAL_RECEIVER])
    );
}

#[tokio::test]
async fn dry_run_validates_without_pushing() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler(&directory);

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, true)
        .await
        .unwrap();
    assert_eq!(report.outcome, Some(RunOutcome::Validated));
    assert!(report.dry_run);
    assert!(report.agents.iter().all(|a| a.state == AgentState::Planned));
    assert!(report.agent("a").unwrap().mutations > 0);
    assert_eq!(directory.push_count(), 0);
    assert_eq!(directory.agent("a").unwrap().effective_config, CAPABLE_CONFIG.as_bytes());
    assert_eq!(directory.agent("b").unwrap().effective_config, DEPENDENT_CONFIG.as_bytes());
}
