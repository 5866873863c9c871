//! Concurrent access safety for reconciliation runs
//!
//! Provides per-agent locking so that two runs never push to the same agent
//! at once, plus a cooperative cancellation flag observed by the commit phase.

use crate::error::ReconcileError;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;

/// Per-agent lock manager
///
/// Runs over disjoint agent sets proceed concurrently; overlapping sets are
/// rejected rather than queued.
#[derive(Debug, Default)]
pub struct AgentLockManager {
    /// Map from agent ID to that agent's lock
    locks: RwLock<HashMap<String, Arc<Mutex<()>>>>,
}

impl AgentLockManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create the lock for one agent
    fn get_agent_lock(&self, agent_id: &str) -> Arc<Mutex<()>> {
        {
            let map = self.locks.read();
            if let Some(lock) = map.get(agent_id) {
                return lock.clone();
            }
        }

        let mut map = self.locks.write();
        // Double-check after acquiring write lock
        map.entry(agent_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Try to lock every agent in `agent_ids`.
    ///
    /// IDs are locked in sorted order. Fails with [`ReconcileError::Busy`]
    /// naming the first agent already held; locks taken so far are released.
    pub fn try_acquire<I, S>(&self, agent_ids: I) -> Result<FleetLease, ReconcileError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ids: Vec<String> = agent_ids
            .into_iter()
            .map(|id| id.as_ref().to_string())
            .collect();
        ids.sort();
        ids.dedup();

        let mut guards = Vec::with_capacity(ids.len());
        for id in &ids {
            let guard = self
                .get_agent_lock(id)
                .try_lock_owned()
                .map_err(|_| ReconcileError::Busy(id.clone()))?;
            guards.push(guard);
        }
        debug!(agents = ids.len(), "Acquired fleet lease");
        Ok(FleetLease {
            agent_ids: ids,
            _guards: guards,
        })
    }

    /// Whether a run currently holds `agent_id`.
    pub fn is_locked(&self, agent_id: &str) -> bool {
        self.locks
            .read()
            .get(agent_id)
            .map(|lock| lock.try_lock().is_err())
            .unwrap_or(false)
    }
}

/// Locks held by one run. Released on drop.
#[derive(Debug)]
pub struct FleetLease {
    agent_ids: Vec<String>,
    _guards: Vec<OwnedMutexGuard<()>>,
}

impl FleetLease {
    /// Locked agent IDs, sorted.
    pub fn agent_ids(&self) -> &[String] {
        &self.agent_ids
    }
}

/// Shared cancellation signal for a run.
#[derive(Debug, Clone, Default)]
pub struct CancellationFlag {
    cancelled: Arc<AtomicBool>,
}

impl CancellationFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}
