use lbfleet::topology::TRACES_LB_PIPELINE;
use lbfleet::{
    AgentState, DesiredState, PushOutcome, ReconcileError, ReconcilerConfig, RunOutcome,
};
use std::time::Duration;

use crate::integration::support::{
    capable, dependent, directory, effective, pipeline, reconciler, reconciler_with, roster,
    strings, DEPENDENT_CONFIG,
};

fn nack(reason: &str) -> PushOutcome {
    PushOutcome::Nack(reason.to_string())
}

#[tokio::test]
async fn nack_rolls_back_acked_agents() {
    let directory = directory(vec![capable("a"), capable("c"), dependent("b")]);
    directory.script_outcomes("b", [nack("exporter not built in")]);
    let reconciler = reconciler(&directory);

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert_eq!(
        report.outcome,
        Some(RunOutcome::Failed {
            failed_agents: strings(&["b"])
        })
    );
    assert_eq!(report.agent("a").unwrap().state, AgentState::RolledBack);
    assert_eq!(report.agent("c").unwrap().state, AgentState::RolledBack);
    assert_eq!(
        report.agent("b").unwrap().state,
        AgentState::Rejected {
            reason: "exporter not built in".to_string()
        }
    );
    let errors = report.apply_errors();
    assert_eq!(errors.len(), 1);
    assert!(matches!(&errors[0], ReconcileError::Apply { agent_id, .. } if agent_id == "b"));

    for id in ["a", "c"] {
        let document = effective(&directory, id);
        assert!(pipeline(&document, TRACES_LB_PIPELINE).is_none());
        assert_eq!(
            pipeline(&document, "traces").unwrap().receivers,
            strings(&["otlp", "jaeger"])
        );
        assert!(document.get("receivers.otlp_internal").is_none());
    }
    assert_eq!(
        directory.agent("b").unwrap().effective_config,
        DEPENDENT_CONFIG.as_bytes()
    );
    // Three forward pushes, two restores.
    assert_eq!(directory.push_count(), 5);
}

#[tokio::test]
async fn nack_stops_dispatch_of_remaining_agents() {
    let directory = directory(vec![capable("a"), capable("c"), dependent("b")]);
    directory.script_outcomes("a", [nack("rejected")]);
    let reconciler = reconciler_with(
        &directory,
        ReconcilerConfig {
            max_concurrent_pushes: 1,
            ..ReconcilerConfig::default()
        },
    );

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert_eq!(report.agent("c").unwrap().state, AgentState::NotAttempted);
    assert_eq!(report.agent("b").unwrap().state, AgentState::NotAttempted);
    match report.outcome {
        Some(RunOutcome::Failed { mut failed_agents }) => {
            failed_agents.sort();
            assert_eq!(failed_agents, strings(&["a", "b", "c"]));
        }
        other => panic!("expected failed outcome, got {:?}", other),
    }
    assert_eq!(directory.push_count(), 1);
}

#[tokio::test]
async fn timeout_counts_as_nack() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    directory.delay_pushes("b", Duration::from_millis(500));
    let reconciler = reconciler_with(
        &directory,
        ReconcilerConfig {
            push_timeout_ms: 50,
            ..ReconcilerConfig::default()
        },
    );

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert_eq!(report.agent("b").unwrap().state, AgentState::TimedOut);
    assert_eq!(report.agent("a").unwrap().state, AgentState::RolledBack);
    assert_eq!(
        report.outcome,
        Some(RunOutcome::Failed {
            failed_agents: strings(&["b"])
        })
    );
    assert_eq!(
        directory.agent("b").unwrap().effective_config,
        DEPENDENT_CONFIG.as_bytes()
    );
}

#[tokio::test]
async fn failed_rollback_escalates_with_report() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    directory.script_outcomes("a", [PushOutcome::Ack, nack("agent offline")]);
    directory.script_outcomes("b", [nack("rejected")]);
    let reconciler = reconciler(&directory);

    let err = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap_err();
    match err {
        ReconcileError::Rollback { agents, report } => {
            assert_eq!(agents, strings(&["a"]));
            assert_eq!(
                report.agent("a").unwrap().state,
                AgentState::RollbackFailed {
                    reason: "agent offline".to_string()
                }
            );
            assert!(matches!(report.outcome, Some(RunOutcome::Failed { .. })));
        }
        other => panic!("expected rollback error, got {:?}", other),
    }
    // `a` is left on the load-balanced topology.
    assert!(pipeline(&effective(&directory, "a"), TRACES_LB_PIPELINE).is_some());
}

#[tokio::test]
async fn lock_is_released_after_failed_run() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    directory.script_outcomes("b", [nack("rejected")]);
    let reconciler = reconciler(&directory);

    let failed = reconciler
        .run(roster(&directory, &["a", "b"]), DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert!(!failed.is_committed());
    assert!(!reconciler.lock_manager().is_locked("a"));

    let retried = reconciler
        .run(roster(&directory, &["a", "b"]), DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert!(retried.is_committed());
}
