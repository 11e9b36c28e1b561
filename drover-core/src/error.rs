//! Error types for drover-core

use thiserror::Error;

/// Top-level error type for drover-core
#[derive(Error, Debug)]
pub enum DroverError {
    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Manager error: {0}")]
    Manager(#[from] ManagerError),

    #[error("Executor error: {0}")]
    Executor(#[from] ExecutorError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// Result alias for drover-core operations
pub type DroverResult<T> = Result<T, DroverError>;

/// Errors raised by a tenant's scheduler
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SchedulerError {
    #[error("Agent not found: {0}")]
    AgentNotFound(String),

    #[error("Agent already registered: {0}")]
    DuplicateAgent(String),

    #[error("Invalid schedule for agent {id}: {reason}")]
    InvalidSchedule { id: String, reason: String },
}

/// Failures collected by `start_all` / `stop_all`
///
/// Every agent is attempted; this carries one entry per agent that failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} agent(s) failed: {}", .failures.len(), summarize(.failures))]
pub struct BatchError {
    pub failures: Vec<(String, SchedulerError)>,
}

fn summarize(failures: &[(String, SchedulerError)]) -> String {
    failures
        .iter()
        .map(|(id, e)| format!("{id}: {e}"))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from task executors
///
/// These are expected failure modes of a run; the agent converts them into a
/// failed execution result rather than propagating them.
#[derive(Error, Debug)]
pub enum ExecutorError {
    #[error("Execution failed: {0}")]
    Failed(String),

    #[error("Operation not supported: {0}")]
    Unsupported(String),

    #[error("Failed to spawn executor command: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Invalid executor output: {0}")]
    Output(String),

    #[error("Executor panicked: {0}")]
    Panicked(String),
}

/// Errors from the persistence sink and activation store
#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(String),
}

/// Errors from config/credential providers
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config unavailable: {0}")]
    Unavailable(String),

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: String, message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the notification channel
#[derive(Error, Debug)]
#[error("Notification failed: {0}")]
pub struct NotifyError(pub String);

/// Errors surfaced by the agent manager's control operations
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    #[error("Config unavailable for tenant {tenant_id}: {source}")]
    Config {
        tenant_id: String,
        #[source]
        source: ConfigError,
    },

    #[error("Activation state error: {0}")]
    Activation(#[from] PersistenceError),

    #[error("Unknown agent kind: {0}")]
    UnknownAgentKind(String),
}

impl ManagerError {
    /// Whether this error is the caller's fault (unknown agent or kind)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::Scheduler(SchedulerError::AgentNotFound(_)) | Self::UnknownAgentKind(_)
        )
    }
}
