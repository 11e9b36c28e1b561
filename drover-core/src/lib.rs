//! drover-core: per-tenant agent lifecycle and scheduling
//!
//! This crate provides the scheduling core behind drover:
//!
//! - **Agents** - [`Agent`] wraps a [`TaskExecutor`] with status, run accounting and
//!   a one-run-at-a-time guard
//! - **Scheduling** - [`Scheduler`] drives start/stop/run-once and interval timers for
//!   one tenant's agents
//! - **Orchestration** - [`AgentManager`] builds, rebuilds and tears down every
//!   tenant's [`TenantAgentSet`] from configuration
//! - **Collaborators** - traits for config ([`ConfigProvider`]), executors
//!   ([`ExecutorFactory`]), persistence ([`PersistenceSink`], [`ActivationStore`])
//!   and alerts ([`Notifier`]), with file-backed and in-memory implementations
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use drover_core::{
//!     AgentKind, AgentManager, CommandExecutorFactory, FileActivationStore, JsonlLogSink,
//!     TomlConfigProvider,
//! };
//!
//! async fn example() -> Result<(), Box<dyn std::error::Error>> {
//!     let data_dir = std::path::Path::new("/var/lib/drover");
//!     let manager = AgentManager::new(
//!         Arc::new(TomlConfigProvider::new("/etc/drover")),
//!         Arc::new(CommandExecutorFactory::new()),
//!         Arc::new(JsonlLogSink::new(data_dir)),
//!         Arc::new(FileActivationStore::load(data_dir).await?),
//!     );
//!
//!     manager.auto_start_agents().await?;
//!     manager.run_agent_once("alice", AgentKind::Email, None).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────┐
//! │                    AgentManager                      │
//! │  tenant ──▶ TenantAgentSet                           │
//! │  ┌────────────────────────────────────────────────┐  │
//! │  │ Scheduler (one per tenant)                     │  │
//! │  │  ┌─────────┐ ┌─────────┐        ┌───────────┐  │  │
//! │  │  │  Agent  │ │  Agent  │  ...   │  timers   │  │  │
//! │  │  └────┬────┘ └────┬────┘        └───────────┘  │  │
//! │  └───────┼───────────┼────────────────────────────┘  │
//! │          ▼           ▼                               │
//! │     TenantEventLogger ──▶ PersistenceSink / Notifier │
//! └──────────────────────────────────────────────────────┘
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod executor;
pub mod manager;
pub mod notifications;
pub mod persistence;
pub mod scheduler;

// Re-export key types for convenience
pub use agent::{
    Agent, AgentBuilder, AgentConfig, AgentInfo, AgentKind, AgentOutput, AgentStatus, Alert,
    ExecutionResult, RunDisposition, Schedule,
};
pub use config::{
    AgentSettings, ConfigProvider, GlobalConfig, StaticConfigProvider, TomlConfigProvider,
    UserConfig,
};
pub use error::{
    BatchError, ConfigError, DroverError, DroverResult, ExecutorError, ManagerError, NotifyError,
    PersistenceError, SchedulerError,
};
pub use events::{AgentEvent, AgentEventKind, AgentEventPayload, AgentListener, EventRecorder};
pub use executor::{
    Analyzable, CommandExecutor, CommandExecutorFactory, Delegates, ExecutorContext,
    ExecutorFactory, MockExecutor, MockExecutorFactory, TaskExecutor,
};
pub use manager::{
    AgentManager, AutoStartReport, NamedAgents, TenantAgentSet, TenantEventLogger, TenantPhase,
};
pub use notifications::{LogNotifier, Notification, Notifier, NotifyOptions, Priority};
pub use persistence::{
    ActivationStore, AgentLogRow, FileActivationStore, JsonlLogSink, LogQuery, MemoryStore,
    PersistenceSink,
};
pub use scheduler::Scheduler;
