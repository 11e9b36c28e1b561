//! Per-tenant scheduler
//!
//! A [`Scheduler`] owns a registry of [`Agent`]s and, for started interval
//! agents, one [`IntervalTimer`] each. Every event emitted by an agent it
//! drives is republished on a broadcast channel ([`Scheduler::subscribe`]).

mod timer;

use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, RwLock, broadcast};
use tracing::{debug, info, instrument, warn};

use crate::agent::{Agent, AgentInfo, RunDisposition};
use crate::error::{BatchError, SchedulerError};
use crate::events::AgentEvent;

use timer::IntervalTimer;

/// Capacity of the republish channel; slow subscribers lag, agents never block
const EVENT_CAPACITY: usize = 256;

/// Drives start/stop/run-once/interval execution for one tenant's agents
pub struct Scheduler {
    tenant_id: String,
    agents: RwLock<HashMap<String, Arc<Agent>>>,
    timers: Mutex<HashMap<String, IntervalTimer>>,
    events: broadcast::Sender<AgentEvent>,
}

impl Scheduler {
    pub fn new(tenant_id: impl Into<String>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            tenant_id: tenant_id.into(),
            agents: RwLock::new(HashMap::new()),
            timers: Mutex::new(HashMap::new()),
            events,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    /// Receive every event emitted by agents this scheduler drives
    pub fn subscribe(&self) -> broadcast::Receiver<AgentEvent> {
        self.events.subscribe()
    }

    /// Add an agent; the first registration of an id wins
    pub async fn register(&self, agent: Arc<Agent>) -> Result<(), SchedulerError> {
        let mut agents = self.agents.write().await;
        match agents.entry(agent.id().to_string()) {
            Entry::Occupied(entry) => Err(SchedulerError::DuplicateAgent(entry.key().clone())),
            Entry::Vacant(entry) => {
                debug!(tenant_id = %self.tenant_id, agent_id = %agent.id(), "Agent registered");
                entry.insert(agent);
                Ok(())
            }
        }
    }

    /// Handle to a registered agent
    pub async fn get(&self, agent_id: &str) -> Option<Arc<Agent>> {
        self.agents.read().await.get(agent_id).cloned()
    }

    async fn require(&self, agent_id: &str) -> Result<Arc<Agent>, SchedulerError> {
        self.get(agent_id)
            .await
            .ok_or_else(|| SchedulerError::AgentNotFound(agent_id.to_string()))
    }

    /// Start an agent, arming its timer if the schedule is an interval
    ///
    /// Starting an agent that is already started changes nothing.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    pub async fn start(&self, agent_id: &str) -> Result<(), SchedulerError> {
        let agent = self.require(agent_id).await?;

        let schedule = agent.schedule();
        schedule
            .validate()
            .map_err(|reason| SchedulerError::InvalidSchedule {
                id: agent_id.to_string(),
                reason,
            })?;
        let period = schedule.period();

        // Held across arming and marking so a concurrent stop sees either
        // neither or both
        let mut timers = self.timers.lock().await;
        if let Some(period) = period
            && !timers.contains_key(agent_id)
        {
            let timer = IntervalTimer::arm(Arc::clone(&agent), period, self.events.clone());
            timers.insert(agent_id.to_string(), timer);
        }

        if agent.mark_started(period.is_some(), &self.events).await {
            info!(agent_id, scheduled = period.is_some(), "Agent started");
        } else {
            debug!(agent_id, "Agent already started");
        }
        Ok(())
    }

    /// Disarm the timer and mark the agent stopped; stopping twice is fine
    ///
    /// An execution already in flight is left to finish.
    #[instrument(skip(self), fields(tenant_id = %self.tenant_id))]
    pub async fn stop(&self, agent_id: &str) -> Result<(), SchedulerError> {
        let agent = self.require(agent_id).await?;

        let mut timers = self.timers.lock().await;
        if let Some(timer) = timers.remove(agent_id) {
            timer.cancel();
        }

        if agent.mark_stopped(&self.events).await {
            info!(agent_id, "Agent stopped");
        }
        Ok(())
    }

    /// Execute once, out of band, whatever the schedule
    ///
    /// Does not touch timers. A trigger that lands while a run is in flight is
    /// dropped and reported as [`RunDisposition::Skipped`].
    #[instrument(skip(self, input), fields(tenant_id = %self.tenant_id))]
    pub async fn run_once(
        &self,
        agent_id: &str,
        input: Option<Value>,
    ) -> Result<RunDisposition, SchedulerError> {
        let agent = self.require(agent_id).await?;
        Ok(agent.run(input, &self.events).await)
    }

    /// Start every agent, attempting all of them even if some fail
    pub async fn start_all(&self) -> Result<(), BatchError> {
        let mut failures = Vec::new();
        for agent_id in self.agent_ids().await {
            if let Err(e) = self.start(&agent_id).await {
                warn!(tenant_id = %self.tenant_id, agent_id = %agent_id, "Failed to start agent: {}", e);
                failures.push((agent_id, e));
            }
        }
        batch_result(failures)
    }

    /// Stop every agent, attempting all of them even if some fail
    pub async fn stop_all(&self) -> Result<(), BatchError> {
        let mut failures = Vec::new();
        for agent_id in self.agent_ids().await {
            if let Err(e) = self.stop(&agent_id).await {
                warn!(tenant_id = %self.tenant_id, agent_id = %agent_id, "Failed to stop agent: {}", e);
                failures.push((agent_id, e));
            }
        }
        batch_result(failures)
    }

    /// Snapshots of every agent, ordered by id
    pub async fn agents(&self) -> Vec<AgentInfo> {
        let agents: Vec<Arc<Agent>> = self.agents.read().await.values().cloned().collect();
        let mut infos = Vec::with_capacity(agents.len());
        for agent in agents {
            infos.push(agent.info().await);
        }
        infos.sort_by(|a, b| a.config.id.cmp(&b.config.id));
        infos
    }

    pub async fn agent(&self, agent_id: &str) -> Option<AgentInfo> {
        match self.get(agent_id).await {
            Some(agent) => Some(agent.info().await),
            None => None,
        }
    }

    /// Ids of agents with an armed timer
    pub async fn armed(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .timers
            .lock()
            .await
            .iter()
            .filter(|(_, timer)| !timer.is_finished())
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub async fn len(&self) -> usize {
        self.agents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.agents.read().await.is_empty()
    }

    async fn agent_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.agents.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("tenant_id", &self.tenant_id)
            .finish_non_exhaustive()
    }
}

fn batch_result(failures: Vec<(String, SchedulerError)>) -> Result<(), BatchError> {
    if failures.is_empty() {
        Ok(())
    } else {
        Err(BatchError { failures })
    }
}
