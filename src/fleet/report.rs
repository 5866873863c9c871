use crate::error::ReconcileError;
use crate::topology::DesiredState;
use chrono::{DateTime, Utc};
use std::fmt;

/// Run state machine: `Planning -> Validated` for dry runs, otherwise
/// `Planning -> Applying -> Committed | RollingBack -> Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Planning,
    Validated,
    Applying,
    Committed,
    RollingBack,
    Failed,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunPhase::Planning => "planning",
            RunPhase::Validated => "validated",
            RunPhase::Applying => "applying",
            RunPhase::Committed => "committed",
            RunPhase::RollingBack => "rolling-back",
            RunPhase::Failed => "failed",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// Dry run: every surviving plan was validated, nothing pushed.
    Validated,
    /// Every planned agent acked.
    Committed,
    /// Some push failed; acked agents were rolled back.
    Failed { failed_agents: Vec<String> },
}

/// Where one agent ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AgentState {
    /// Plan validated, not yet pushed.
    Planned,
    /// Already in the target shape; not pushed.
    Unchanged,
    /// Left out of the run because its document could not be planned.
    Excluded { reason: String },
    Acked,
    Rejected { reason: String },
    TimedOut,
    /// Dispatch stopped before this agent was pushed.
    NotAttempted,
    /// Acked, then restored.
    RolledBack,
    RollbackFailed { reason: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct AgentReport {
    pub agent_id: String,
    pub can_lb: bool,
    pub desired: DesiredState,
    /// Number of planned mutations.
    pub mutations: usize,
    /// Trace receivers before the plan; empty for excluded agents.
    pub captured_receivers: Vec<String>,
    pub state: AgentState,
}

/// Record of one reconciliation run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub desired: DesiredState,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub outcome: Option<RunOutcome>,
    pub agents: Vec<AgentReport>,
}

impl RunReport {
    pub(crate) fn new(desired: DesiredState, dry_run: bool) -> Self {
        Self {
            desired,
            dry_run,
            started_at: Utc::now(),
            finished_at: None,
            outcome: None,
            agents: Vec::new(),
        }
    }

    pub(crate) fn finish(&mut self, outcome: RunOutcome) {
        self.outcome = Some(outcome);
        self.finished_at = Some(Utc::now());
    }

    pub fn agent(&self, agent_id: &str) -> Option<&AgentReport> {
        self.agents.iter().find(|a| a.agent_id == agent_id)
    }

    pub(crate) fn agent_mut(&mut self, agent_id: &str) -> Option<&mut AgentReport> {
        self.agents.iter_mut().find(|a| a.agent_id == agent_id)
    }

    pub(crate) fn set_state(&mut self, agent_id: &str, state: AgentState) {
        if let Some(agent) = self.agent_mut(agent_id) {
            agent.state = state;
        }
    }

    pub fn is_committed(&self) -> bool {
        self.outcome == Some(RunOutcome::Committed)
    }

    /// IDs of agents whose state matches `predicate`.
    pub fn agents_where(&self, predicate: impl Fn(&AgentState) -> bool) -> Vec<String> {
        self.agents
            .iter()
            .filter(|a| predicate(&a.state))
            .map(|a| a.agent_id.clone())
            .collect()
    }

    pub fn excluded(&self) -> Vec<String> {
        self.agents_where(|s| matches!(s, AgentState::Excluded { .. }))
    }

    /// Push failures as errors, one per rejected or timed-out agent.
    pub fn apply_errors(&self) -> Vec<ReconcileError> {
        self.agents
            .iter()
            .filter_map(|a| {
                let reason = match &a.state {
                    AgentState::Rejected { reason } => reason.clone(),
                    AgentState::TimedOut => "push timed out".to_string(),
                    _ => return None,
                };
                Some(ReconcileError::Apply {
                    agent_id: a.agent_id.clone(),
                    reason,
                })
            })
            .collect()
    }
}
