//! Agent directory contract and an in-memory implementation.

use crate::error::DirectoryError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;
use tracing::debug;

/// One managed collector agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Agent {
    pub id: String,
    /// Whether the agent's build ships the load-balancing exporter.
    pub can_lb: bool,
    /// YAML the agent currently runs.
    pub effective_config: Vec<u8>,
}

impl Agent {
    pub fn new(id: impl Into<String>, can_lb: bool, effective_config: impl Into<Vec<u8>>) -> Self {
        Self {
            id: id.into(),
            can_lb,
            effective_config: effective_config.into(),
        }
    }
}

/// Agent's answer to a pushed configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PushOutcome {
    Ack,
    Nack(String),
}

/// Source of the fleet roster and sink for configuration pushes.
///
/// Transport is the implementor's concern. `push` should return once the
/// agent has accepted or rejected the configuration.
#[async_trait]
pub trait AgentDirectory: Send + Sync {
    /// Current roster with each agent's effective configuration.
    async fn get_all_agents(&self) -> Result<Vec<Agent>, DirectoryError>;

    /// Deliver `config` to one agent.
    async fn push(&self, agent_id: &str, config: &[u8]) -> PushOutcome;
}

/// One entry of the in-memory push log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushRecord {
    pub agent_id: String,
    pub config: Vec<u8>,
    pub outcome: PushOutcome,
}

/// Directory held in memory.
///
/// Acked pushes replace the agent's effective configuration. Outcomes can be
/// scripted per agent; unscripted pushes to known agents ack.
#[derive(Debug, Default)]
pub struct InMemoryAgentDirectory {
    agents: RwLock<BTreeMap<String, Agent>>,
    scripted: RwLock<HashMap<String, VecDeque<PushOutcome>>>,
    delays: RwLock<HashMap<String, Duration>>,
    log: RwLock<Vec<PushRecord>>,
}

impl InMemoryAgentDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_agents(agents: impl IntoIterator<Item = Agent>) -> Self {
        let directory = Self::new();
        for agent in agents {
            directory.insert(agent);
        }
        directory
    }

    pub fn insert(&self, agent: Agent) {
        self.agents.write().insert(agent.id.clone(), agent);
    }

    pub fn agent(&self, agent_id: &str) -> Option<Agent> {
        self.agents.read().get(agent_id).cloned()
    }

    /// Queue outcomes for the next pushes to `agent_id`, consumed in order.
    pub fn script_outcomes(&self, agent_id: &str, outcomes: impl IntoIterator<Item = PushOutcome>) {
        self.scripted
            .write()
            .entry(agent_id.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// Delay every push to `agent_id` by `delay` before answering.
    pub fn delay_pushes(&self, agent_id: &str, delay: Duration) {
        self.delays.write().insert(agent_id.to_string(), delay);
    }

    /// Pushes answered so far, in completion order.
    pub fn pushes(&self) -> Vec<PushRecord> {
        self.log.read().clone()
    }

    pub fn push_count(&self) -> usize {
        self.log.read().len()
    }

    fn next_outcome(&self, agent_id: &str) -> PushOutcome {
        if !self.agents.read().contains_key(agent_id) {
            return PushOutcome::Nack(format!("unknown agent {}", agent_id));
        }
        self.scripted
            .write()
            .get_mut(agent_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PushOutcome::Ack)
    }
}

#[async_trait]
impl AgentDirectory for InMemoryAgentDirectory {
    async fn get_all_agents(&self) -> Result<Vec<Agent>, DirectoryError> {
        Ok(self.agents.read().values().cloned().collect())
    }

    async fn push(&self, agent_id: &str, config: &[u8]) -> PushOutcome {
        let delay = self.delays.read().get(agent_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let outcome = self.next_outcome(agent_id);
        if outcome == PushOutcome::Ack {
            if let Some(agent) = self.agents.write().get_mut(agent_id) {
                agent.effective_config = config.to_vec();
            }
        }
        debug!(agent_id = %agent_id, outcome = ?outcome, "In-memory push answered");
        self.log.write().push(PushRecord {
            agent_id: agent_id.to_string(),
            config: config.to_vec(),
            outcome: outcome.clone(),
        });
        outcome
    }
}
