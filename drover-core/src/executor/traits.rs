//! Executor abstractions

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::agent::{AgentKind, AgentOutput};
use crate::config::{AgentSettings, GlobalConfig};
use crate::error::ExecutorError;

/// The fetch → analyze → return logic behind one agent
///
/// Expected failure modes (network errors, empty queues, provider refusals)
/// are returned as `Err`; the owning agent turns them into a failed result.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// Perform one run
    async fn execute(&self, input: Option<Value>) -> Result<AgentOutput, ExecutorError>;

    /// Analyze a single item on behalf of another agent
    ///
    /// Only executors that serve as delegates implement this.
    async fn analyze(&self, input: Value) -> Result<Value, ExecutorError> {
        let _ = input;
        Err(ExecutorError::Unsupported("analyze".to_string()))
    }
}

/// Capability handed to agents that delegate sub-analysis inline
#[async_trait]
pub trait Analyzable: Send + Sync {
    async fn analyze(&self, input: Value) -> Result<Value, ExecutorError>;
}

/// Already-built agents the email executor may delegate to
#[derive(Clone, Default)]
pub struct Delegates {
    pub legal: Option<Arc<dyn Analyzable>>,
    pub financial: Option<Arc<dyn Analyzable>>,
    pub task: Option<Arc<dyn Analyzable>>,
}

impl Delegates {
    pub fn get(&self, kind: AgentKind) -> Option<&Arc<dyn Analyzable>> {
        match kind {
            AgentKind::Legal => self.legal.as_ref(),
            AgentKind::Financial => self.financial.as_ref(),
            AgentKind::Task => self.task.as_ref(),
            AgentKind::Email | AgentKind::Stablecoin => None,
        }
    }

    /// Kinds that have a delegate wired in
    pub fn kinds(&self) -> Vec<AgentKind> {
        [AgentKind::Legal, AgentKind::Financial, AgentKind::Task]
            .into_iter()
            .filter(|kind| self.get(*kind).is_some())
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.kinds().is_empty()
    }
}

impl std::fmt::Debug for Delegates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delegates")
            .field("kinds", &self.kinds())
            .finish()
    }
}

/// Everything a factory needs to build one tenant's executor
#[derive(Debug, Clone)]
pub struct ExecutorContext {
    pub tenant_id: String,
    pub kind: AgentKind,
    pub settings: AgentSettings,
    pub global: GlobalConfig,
    /// Empty for every kind except email
    pub delegates: Delegates,
}

/// Builds executors for the agent manager
#[async_trait]
pub trait ExecutorFactory: Send + Sync {
    async fn build(&self, ctx: &ExecutorContext) -> Result<Arc<dyn TaskExecutor>, ExecutorError>;
}
