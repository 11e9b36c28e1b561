//! What an execution produces

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::notifications::Priority;

/// Structured items produced by one execution
///
/// The core never looks inside `items`; it only counts them and hands them to
/// the persistence sink.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentOutput {
    #[serde(default)]
    pub items: Vec<Value>,
    /// Urgent conditions detected during the run
    #[serde(default)]
    pub alerts: Vec<Alert>,
    /// Free-form run metadata copied into the log row
    #[serde(default)]
    pub details: Value,
}

impl AgentOutput {
    pub fn with_items(items: Vec<Value>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }

    pub fn with_alert(mut self, alert: Alert) -> Self {
        self.alerts.push(alert);
        self
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    pub fn processed_count(&self) -> usize {
        self.items.len()
    }
}

/// An urgent condition an executor wants a human to see
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub title: String,
    pub message: String,
    #[serde(default)]
    pub priority: Priority,
}

impl Alert {
    pub fn new(title: impl Into<String>, message: impl Into<String>, priority: Priority) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
            priority,
        }
    }
}

/// Tagged result of one `execute` call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ExecutionResult {
    Success { data: AgentOutput, duration_ms: u64 },
    Failure { error: String, duration_ms: u64 },
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    pub fn duration_ms(&self) -> u64 {
        match self {
            Self::Success { duration_ms, .. } | Self::Failure { duration_ms, .. } => *duration_ms,
        }
    }

    pub fn output(&self) -> Option<&AgentOutput> {
        match self {
            Self::Success { data, .. } => Some(data),
            Self::Failure { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Success { .. } => None,
            Self::Failure { error, .. } => Some(error),
        }
    }
}

/// What happened to a run trigger
#[derive(Debug, Clone, PartialEq)]
pub enum RunDisposition {
    /// The agent executed; the result was also emitted as an event
    Completed(ExecutionResult),
    /// Another execution was already in flight, so this trigger was dropped
    Skipped,
}

impl RunDisposition {
    pub fn result(&self) -> Option<&ExecutionResult> {
        match self {
            Self::Completed(result) => Some(result),
            Self::Skipped => None,
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped)
    }
}
