//! A tenant's live agent set

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::agent::{Agent, AgentKind};
use crate::executor::{Analyzable, Delegates};
use crate::scheduler::Scheduler;

/// Lifecycle of a tenant's set inside the manager
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantPhase {
    Absent,
    Building,
    Active,
}

/// Typed references to the agents built for a tenant
///
/// Lets the manager wire agents to each other without the scheduler knowing
/// which agent is which.
#[derive(Debug, Clone, Default)]
pub struct NamedAgents {
    pub email: Option<Arc<Agent>>,
    pub legal: Option<Arc<Agent>>,
    pub financial: Option<Arc<Agent>>,
    pub task: Option<Arc<Agent>>,
    pub stablecoin: Option<Arc<Agent>>,
}

impl NamedAgents {
    pub fn get(&self, kind: AgentKind) -> Option<&Arc<Agent>> {
        match kind {
            AgentKind::Email => self.email.as_ref(),
            AgentKind::Legal => self.legal.as_ref(),
            AgentKind::Financial => self.financial.as_ref(),
            AgentKind::Task => self.task.as_ref(),
            AgentKind::Stablecoin => self.stablecoin.as_ref(),
        }
    }

    pub(crate) fn set(&mut self, kind: AgentKind, agent: Arc<Agent>) {
        let slot = match kind {
            AgentKind::Email => &mut self.email,
            AgentKind::Legal => &mut self.legal,
            AgentKind::Financial => &mut self.financial,
            AgentKind::Task => &mut self.task,
            AgentKind::Stablecoin => &mut self.stablecoin,
        };
        *slot = Some(agent);
    }

    /// Kinds present, in build order
    pub fn kinds(&self) -> Vec<AgentKind> {
        AgentKind::BUILD_ORDER
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    /// The already-built agents the email executor can hand work to
    pub fn delegates(&self) -> Delegates {
        let capability = |agent: &Option<Arc<Agent>>| {
            agent
                .as_ref()
                .map(|a| Arc::clone(a) as Arc<dyn Analyzable>)
        };
        Delegates {
            legal: capability(&self.legal),
            financial: capability(&self.financial),
            task: capability(&self.task),
        }
    }
}

/// One tenant bound to one scheduler and the agents built for it
#[derive(Debug)]
pub struct TenantAgentSet {
    tenant_id: String,
    scheduler: Scheduler,
    agents: NamedAgents,
}

impl TenantAgentSet {
    pub(crate) fn new(tenant_id: impl Into<String>, scheduler: Scheduler, agents: NamedAgents) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            scheduler,
            agents,
        }
    }

    pub fn tenant_id(&self) -> &str {
        &self.tenant_id
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn agents(&self) -> &NamedAgents {
        &self.agents
    }

    pub fn agent(&self, kind: AgentKind) -> Option<&Arc<Agent>> {
        self.agents.get(kind)
    }
}
