//! Notification types

use serde::{Deserialize, Serialize};

use crate::agent::Alert;

/// How loudly a notification should be delivered
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Urgent => "urgent",
        }
    }
}

/// Delivery options passed alongside the message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifyOptions {
    pub title: String,
    pub priority: Priority,
}

/// A message ready for the notification channel
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub message: String,
    pub options: NotifyOptions,
    /// Tag for grouping, `<agent id>:<title>`
    pub tag: String,
}

impl Notification {
    /// Build a notification for an alert raised by `agent_id`
    pub fn from_alert(agent_id: &str, alert: &Alert) -> Self {
        Self {
            message: alert.message.clone(),
            options: NotifyOptions {
                title: alert.title.clone(),
                priority: alert.priority,
            },
            tag: format!("{}:{}", agent_id, alert.title),
        }
    }
}
