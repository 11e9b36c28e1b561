//! Event type definitions

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::AgentOutput;

/// Discriminator for [`AgentEventPayload`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentEventKind {
    Started,
    Paused,
    Completed,
    Failed,
}

impl AgentEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Started => "started",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

/// Event-specific data
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AgentEventPayload {
    /// The scheduler started the agent; `scheduled` is true when a timer was armed
    Started { scheduled: bool },
    /// The scheduler stopped the agent
    Paused,
    /// An execution finished successfully
    Completed {
        result: AgentOutput,
        duration_ms: u64,
    },
    /// An execution failed or panicked
    Failed { error: String, duration_ms: u64 },
}

/// One lifecycle event of one agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentEvent {
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub payload: AgentEventPayload,
}

impl AgentEvent {
    fn now(agent_id: &str, payload: AgentEventPayload) -> Self {
        Self {
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            payload,
        }
    }

    pub fn started(agent_id: &str, scheduled: bool) -> Self {
        Self::now(agent_id, AgentEventPayload::Started { scheduled })
    }

    pub fn paused(agent_id: &str) -> Self {
        Self::now(agent_id, AgentEventPayload::Paused)
    }

    pub fn completed(agent_id: &str, result: AgentOutput, duration_ms: u64) -> Self {
        Self::now(
            agent_id,
            AgentEventPayload::Completed {
                result,
                duration_ms,
            },
        )
    }

    pub fn failed(agent_id: &str, error: impl Into<String>, duration_ms: u64) -> Self {
        Self::now(
            agent_id,
            AgentEventPayload::Failed {
                error: error.into(),
                duration_ms,
            },
        )
    }

    pub fn kind(&self) -> AgentEventKind {
        match self.payload {
            AgentEventPayload::Started { .. } => AgentEventKind::Started,
            AgentEventPayload::Paused => AgentEventKind::Paused,
            AgentEventPayload::Completed { .. } => AgentEventKind::Completed,
            AgentEventPayload::Failed { .. } => AgentEventKind::Failed,
        }
    }
}
