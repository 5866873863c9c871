use lbfleet::{
    Agent, AgentState, CancellationFlag, DesiredState, ReconcileError, ReconcilerConfig,
    RunOutcome,
};
use std::time::Duration;

use crate::integration::support::{
    capable, dependent, directory, reconciler, reconciler_with, roster, strings,
    CAPABLE_CONFIG,
};

#[tokio::test]
async fn fleet_without_capable_agents_is_rejected() {
    let directory = directory(vec![dependent("a"), dependent("b")]);
    let reconciler = reconciler(&directory);

    let err = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Capability(_)));
    assert_eq!(directory.push_count(), 0);
}

#[tokio::test]
async fn fleet_whose_capable_agents_are_all_excluded_is_rejected() {
    let directory = directory(vec![
        Agent::new("a", true, "receivers: [otlp"),
        dependent("b"),
    ]);
    let reconciler = reconciler(&directory);

    let err = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Capability(_)));
    assert_eq!(directory.push_count(), 0);
}

#[tokio::test]
async fn unplannable_agents_are_excluded() {
    let directory = directory(vec![
        capable("a"),
        Agent::new("broken", true, "receivers: [otlp"),
        Agent::new("no-traces", false, "receivers:\n  otlp:\n"),
        dependent("b"),
    ]);
    let reconciler = reconciler(&directory);

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert!(report.is_committed());
    let mut excluded = report.excluded();
    excluded.sort();
    assert_eq!(excluded, strings(&["broken", "no-traces"]));
    match &report.agent("broken").unwrap().state {
        AgentState::Excluded { reason } => assert!(reason.starts_with("parse error")),
        other => panic!("expected exclusion, got {:?}", other),
    }
    match &report.agent("no-traces").unwrap().state {
        AgentState::Excluded { reason } => assert!(reason.starts_with("referential error")),
        other => panic!("expected exclusion, got {:?}", other),
    }
    let pushed: Vec<String> = directory.pushes().into_iter().map(|p| p.agent_id).collect();
    assert_eq!(pushed, vec!["a", "b"]);
}

#[tokio::test]
async fn overlapping_run_is_busy() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    directory.delay_pushes("a", Duration::from_millis(100));
    let reconciler = reconciler(&directory);
    let agents = roster(&directory, &["a", "b"]);

    let (first, second) = tokio::join!(
        reconciler.run(agents.clone(), DesiredState::LbEnabled, false),
        reconciler.run(agents.clone(), DesiredState::LbEnabled, false),
    );
    assert!(first.unwrap().is_committed());
    assert!(matches!(second, Err(ReconcileError::Busy(id)) if id == "a"));
    assert_eq!(directory.push_count(), 2);
}

#[tokio::test]
async fn disjoint_runs_proceed_together() {
    let directory = directory(vec![capable("a"), capable("c")]);
    directory.delay_pushes("a", Duration::from_millis(50));
    let reconciler = reconciler(&directory);

    let (first, second) = tokio::join!(
        reconciler.run(roster(&directory, &["a"]), DesiredState::LbEnabled, false),
        reconciler.run(roster(&directory, &["c"]), DesiredState::LbEnabled, false),
    );
    assert!(first.unwrap().is_committed());
    assert!(second.unwrap().is_committed());
}

#[tokio::test]
async fn cancel_before_commit_pushes_nothing() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler(&directory);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let err = reconciler
        .run_with_cancel(
            roster(&directory, &["a", "b"]),
            DesiredState::LbEnabled,
            false,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled));
    assert_eq!(directory.push_count(), 0);
    assert!(!reconciler.lock_manager().is_locked("a"));
}

#[tokio::test]
async fn cancelled_dry_run_is_discarded() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler(&directory);
    let cancel = CancellationFlag::new();
    cancel.cancel();

    let err = reconciler
        .run_with_cancel(
            roster(&directory, &["a", "b"]),
            DesiredState::LbEnabled,
            true,
            &cancel,
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ReconcileError::Cancelled));
    assert_eq!(directory.push_count(), 0);
    assert!(!reconciler.lock_manager().is_locked("a"));
}

#[tokio::test]
async fn oversized_push_limit_is_clamped() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    let reconciler = reconciler_with(
        &directory,
        ReconcilerConfig {
            max_concurrent_pushes: usize::MAX,
            ..ReconcilerConfig::default()
        },
    );

    let report = reconciler
        .reconcile_fleet(DesiredState::LbEnabled, false)
        .await
        .unwrap();
    assert!(report.is_committed());
    assert_eq!(directory.push_count(), 2);
}

#[tokio::test]
async fn cancel_during_commit_rolls_back_acked_agents() {
    let directory = directory(vec![capable("a"), dependent("b")]);
    directory.delay_pushes("a", Duration::from_millis(100));
    let reconciler = reconciler(&directory);
    let cancel = CancellationFlag::new();

    let (result, _) = tokio::join!(
        reconciler.run_with_cancel(
            roster(&directory, &["a", "b"]),
            DesiredState::LbEnabled,
            false,
            &cancel,
        ),
        async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            cancel.cancel();
        }
    );
    let report = result.unwrap();
    // The push to `a` was in flight and completed.
    assert_eq!(report.agent("a").unwrap().state, AgentState::RolledBack);
    assert_eq!(report.agent("b").unwrap().state, AgentState::NotAttempted);
    assert_eq!(
        report.outcome,
        Some(RunOutcome::Failed {
            failed_agents: strings(&["b"])
        })
    );
    assert_eq!(
        crate::integration::support::effective(&directory, "a"),
        lbfleet::ConfigDocument::parse(CAPABLE_CONFIG.as_bytes()).unwrap()
    );
}
