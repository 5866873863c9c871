use super::directory::{Agent, AgentDirectory, PushOutcome};
use super::report::{AgentReport, AgentState, RunOutcome, RunPhase, RunReport};
use crate::concurrency::{AgentLockManager, CancellationFlag};
use crate::config::{FleetConfig, LoadBalancingSettings, ReconcilerConfig};
use crate::document::ConfigDocument;
use crate::error::ReconcileError;
use crate::topology::{DesiredState, TopologyPlan, TopologyPlanner};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// A validated plan for one agent, with both documents it may need to push.
struct PlannedAgent {
    agent_id: String,
    can_lb: bool,
    plan: TopologyPlan,
    forward: Vec<u8>,
    restore: Vec<u8>,
}

/// Stop condition shared by the pushes of one commit.
struct Halt<'a> {
    cancel: &'a CancellationFlag,
    failed: AtomicBool,
}

impl Halt<'_> {
    fn should_stop(&self) -> bool {
        self.failed.load(Ordering::SeqCst) || self.cancel.is_cancelled()
    }
}

/// Applies a target topology across a fleet.
pub struct FleetReconciler {
    directory: Arc<dyn AgentDirectory>,
    planner: TopologyPlanner,
    config: ReconcilerConfig,
    locks: Arc<AgentLockManager>,
}

impl FleetReconciler {
    pub fn new(
        directory: Arc<dyn AgentDirectory>,
        config: ReconcilerConfig,
        settings: LoadBalancingSettings,
    ) -> Self {
        Self {
            directory,
            planner: TopologyPlanner::new(settings),
            config,
            locks: Arc::new(AgentLockManager::new()),
        }
    }

    pub fn from_config(directory: Arc<dyn AgentDirectory>, config: &FleetConfig) -> Self {
        Self::new(
            directory,
            config.reconciler.clone(),
            config.load_balancing.clone(),
        )
    }

    /// Share agent locks with other reconcilers driving the same fleet.
    pub fn with_lock_manager(mut self, locks: Arc<AgentLockManager>) -> Self {
        self.locks = locks;
        self
    }

    pub fn planner(&self) -> &TopologyPlanner {
        &self.planner
    }

    pub fn lock_manager(&self) -> &Arc<AgentLockManager> {
        &self.locks
    }

    /// Fetch the roster from the directory and run against all of it.
    pub async fn reconcile_fleet(
        &self,
        desired: DesiredState,
        dry_run: bool,
    ) -> Result<RunReport, ReconcileError> {
        let agents = self.directory.get_all_agents().await?;
        self.run(agents, desired, dry_run).await
    }

    pub async fn run(
        &self,
        agents: Vec<Agent>,
        desired: DesiredState,
        dry_run: bool,
    ) -> Result<RunReport, ReconcileError> {
        self.run_with_cancel(agents, desired, dry_run, &CancellationFlag::new())
            .await
    }

    /// Plan, validate and (unless `dry_run`) commit `desired` across `agents`.
    ///
    /// Agents that cannot be planned are excluded and reported. A push
    /// failure or cancellation during commit rolls back every agent that
    /// already acked and yields a `Failed` outcome; a failed rollback is
    /// returned as [`ReconcileError::Rollback`].
    pub async fn run_with_cancel(
        &self,
        agents: Vec<Agent>,
        desired: DesiredState,
        dry_run: bool,
        cancel: &CancellationFlag,
    ) -> Result<RunReport, ReconcileError> {
        let _lease = self.locks.try_acquire(agents.iter().map(|a| a.id.as_str()))?;
        let mut report = RunReport::new(desired, dry_run);
        log_phase(RunPhase::Planning, &report);

        if !agents.iter().any(|a| a.can_lb) {
            return Err(ReconcileError::Capability(
                "no load-balancing capable agent in the fleet".to_string(),
            ));
        }

        let (capable, dependent): (Vec<Agent>, Vec<Agent>) =
            agents.into_iter().partition(|a| a.can_lb);
        let mut planned = Vec::with_capacity(capable.len() + dependent.len());
        for agent in capable.iter().chain(dependent.iter()) {
            if cancel.is_cancelled() {
                info!(desired = %desired, "Run cancelled during planning");
                return Err(ReconcileError::Cancelled);
            }
            let agent_desired = desired.for_agent(agent.can_lb);
            match self.plan_agent(agent, agent_desired) {
                Ok(entry) => {
                    report.agents.push(AgentReport {
                        agent_id: agent.id.clone(),
                        can_lb: agent.can_lb,
                        desired: agent_desired,
                        mutations: entry.plan.len(),
                        captured_receivers: entry.plan.captured_receivers().to_vec(),
                        state: AgentState::Planned,
                    });
                    planned.push(entry);
                }
                Err(err @ (ReconcileError::Parse(_) | ReconcileError::Referential(_))) => {
                    warn!(agent_id = %agent.id, error = %err, "Excluding agent from run");
                    report.agents.push(AgentReport {
                        agent_id: agent.id.clone(),
                        can_lb: agent.can_lb,
                        desired: agent_desired,
                        mutations: 0,
                        captured_receivers: Vec::new(),
                        state: AgentState::Excluded {
                            reason: err.to_string(),
                        },
                    });
                }
                Err(err) => return Err(err),
            }
        }

        if !planned.iter().any(|p| p.can_lb) {
            return Err(ReconcileError::Capability(
                "every load-balancing capable agent was excluded during planning".to_string(),
            ));
        }

        if cancel.is_cancelled() {
            info!(desired = %desired, "Run cancelled before commit");
            return Err(ReconcileError::Cancelled);
        }
        if dry_run {
            report.finish(RunOutcome::Validated);
            log_phase(RunPhase::Validated, &report);
            return Ok(report);
        }

        log_phase(RunPhase::Applying, &report);
        let mut pending = Vec::new();
        for entry in &planned {
            if entry.plan.is_noop() {
                report.set_state(&entry.agent_id, AgentState::Unchanged);
            } else {
                pending.push(entry);
            }
        }

        let halt = Halt {
            cancel,
            failed: AtomicBool::new(false),
        };
        let mut acked: Vec<&PlannedAgent> = Vec::new();
        let mut failed = false;
        // Capable agents first, then the agents forwarding to them.
        for capable_phase in [true, false] {
            let batch: Vec<&PlannedAgent> = pending
                .iter()
                .copied()
                .filter(|p| p.can_lb == capable_phase)
                .collect();
            if failed {
                for entry in &batch {
                    report.set_state(&entry.agent_id, AgentState::NotAttempted);
                }
                continue;
            }
            let pushes: Vec<(&str, &[u8])> = batch
                .iter()
                .map(|p| (p.agent_id.as_str(), p.forward.as_slice()))
                .collect();
            let states = self.dispatch(&pushes, Some(&halt)).await;
            for (entry, state) in batch.iter().zip(states) {
                if state == AgentState::Acked {
                    acked.push(*entry);
                } else {
                    failed = true;
                }
                report.set_state(&entry.agent_id, state);
            }
        }

        if !failed {
            report.finish(RunOutcome::Committed);
            log_phase(RunPhase::Committed, &report);
            return Ok(report);
        }

        let failed_agents = report.agents_where(|s| {
            matches!(
                s,
                AgentState::Rejected { .. } | AgentState::TimedOut | AgentState::NotAttempted
            )
        });
        log_phase(RunPhase::RollingBack, &report);
        let restores: Vec<(&str, &[u8])> = acked
            .iter()
            .map(|p| (p.agent_id.as_str(), p.restore.as_slice()))
            .collect();
        let states = self.dispatch(&restores, None).await;

        let mut rollback_failed = Vec::new();
        for (entry, state) in acked.iter().zip(states) {
            let state = match state {
                AgentState::Acked => AgentState::RolledBack,
                AgentState::Rejected { reason } => AgentState::RollbackFailed { reason },
                _ => AgentState::RollbackFailed {
                    reason: "rollback push timed out".to_string(),
                },
            };
            if matches!(state, AgentState::RollbackFailed { .. }) {
                rollback_failed.push(entry.agent_id.clone());
            }
            report.set_state(&entry.agent_id, state);
        }

        report.finish(RunOutcome::Failed { failed_agents });
        log_phase(RunPhase::Failed, &report);
        if !rollback_failed.is_empty() {
            error!(
                agents = ?rollback_failed,
                "Rollback failed; agents left on the new topology"
            );
            return Err(ReconcileError::Rollback {
                agents: rollback_failed,
                report: Box::new(report),
            });
        }
        Ok(report)
    }

    fn plan_agent(
        &self,
        agent: &Agent,
        desired: DesiredState,
    ) -> Result<PlannedAgent, ReconcileError> {
        let document = ConfigDocument::parse(&agent.effective_config)?;
        let plan = self.planner.plan(&document, agent.can_lb, desired)?;
        let planned = plan.apply(&document)?;
        self.planner.verify(&planned, agent.can_lb, desired)?;
        let restored = plan.rollback().apply(&planned)?;
        debug!(
            agent_id = %agent.id,
            desired = %desired,
            mutations = plan.len(),
            "Planned agent"
        );
        Ok(PlannedAgent {
            agent_id: agent.id.clone(),
            can_lb: agent.can_lb,
            forward: planned.to_bytes()?,
            restore: restored.to_bytes()?,
            plan,
        })
    }

    /// Push each config concurrently, bounded by `max_concurrent_pushes`.
    ///
    /// With a `halt`, a failed push stops pushes that have not started yet
    /// and cancellation is observed before each push. Results follow the
    /// order of `pushes`.
    async fn dispatch(&self, pushes: &[(&str, &[u8])], halt: Option<&Halt<'_>>) -> Vec<AgentState> {
        let semaphore = Semaphore::new(
            self.config
                .max_concurrent_pushes
                .clamp(1, Semaphore::MAX_PERMITS),
        );
        let push_timeout = self.config.push_timeout();

        let futures = pushes.iter().map(|&(agent_id, config)| {
            let semaphore = &semaphore;
            async move {
                let Ok(_permit) = semaphore.acquire().await else {
                    return AgentState::NotAttempted;
                };
                if halt.map(Halt::should_stop).unwrap_or(false) {
                    debug!(agent_id = %agent_id, "Skipping push");
                    return AgentState::NotAttempted;
                }

                debug!(agent_id = %agent_id, bytes = config.len(), "Pushing config");
                let state =
                    match tokio::time::timeout(push_timeout, self.directory.push(agent_id, config))
                        .await
                    {
                        Ok(PushOutcome::Ack) => AgentState::Acked,
                        Ok(PushOutcome::Nack(reason)) => {
                            warn!(agent_id = %agent_id, reason = %reason, "Agent rejected config");
                            AgentState::Rejected { reason }
                        }
                        Err(_) => {
                            warn!(
                                agent_id = %agent_id,
                                timeout_ms = push_timeout.as_millis() as u64,
                                "Push timed out"
                            );
                            AgentState::TimedOut
                        }
                    };
                if state != AgentState::Acked {
                    if let Some(halt) = halt {
                        halt.failed.store(true, Ordering::SeqCst);
                    }
                }
                state
            }
        });
        join_all(futures).await
    }
}

fn log_phase(phase: RunPhase, report: &RunReport) {
    info!(
        phase = %phase,
        desired = %report.desired,
        dry_run = report.dry_run,
        agents = report.agents.len(),
        "Reconciliation phase"
    );
}
