//! Agent type definitions

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The kinds of agent a tenant can run
///
/// The scheduling core treats every kind the same way; the kind only decides
/// the agent id, its default schedule and its enablement predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    /// Pulls and classifies mail, delegating sub-analysis to the others
    Email,
    /// Legal document analysis
    Legal,
    /// Financial document extraction
    Financial,
    /// Task / action item extraction
    Task,
    /// Stablecoin transfer monitoring
    Stablecoin,
}

impl AgentKind {
    /// Every kind, in construction order: delegates before the email agent
    pub const BUILD_ORDER: [AgentKind; 5] = [
        AgentKind::Financial,
        AgentKind::Legal,
        AgentKind::Task,
        AgentKind::Email,
        AgentKind::Stablecoin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Legal => "legal",
            Self::Financial => "financial",
            Self::Task => "task",
            Self::Stablecoin => "stablecoin",
        }
    }

    /// Parse from the lowercase name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "email" => Some(Self::Email),
            "legal" => Some(Self::Legal),
            "financial" => Some(Self::Financial),
            "task" => Some(Self::Task),
            "stablecoin" => Some(Self::Stablecoin),
            _ => None,
        }
    }

    /// Tenant-scoped agent id: `<kind>-agent-<tenant>`
    pub fn agent_id(&self, tenant_id: &str) -> String {
        format!("{}-agent-{}", self.as_str(), tenant_id)
    }

    /// Display name used in logs and snapshots
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Email => "Email Agent",
            Self::Legal => "Legal Agent",
            Self::Financial => "Financial Agent",
            Self::Task => "Task Agent",
            Self::Stablecoin => "Stablecoin Agent",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Email => "Fetches new mail and classifies it",
            Self::Legal => "Analyzes legal documents",
            Self::Financial => "Extracts financial records",
            Self::Task => "Extracts tasks and action items",
            Self::Stablecoin => "Monitors stablecoin transfers",
        }
    }

    /// Schedule used when the tenant config does not set one
    pub fn default_schedule(&self) -> Schedule {
        match self {
            Self::Email => Schedule::Interval { minutes: 5 },
            Self::Stablecoin => Schedule::Interval { minutes: 10 },
            Self::Legal | Self::Financial | Self::Task => Schedule::Manual,
        }
    }
}

impl fmt::Display for AgentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AgentKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| s.to_string())
    }
}

/// When an agent runs on its own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Schedule {
    /// Repeats every `minutes` once started
    Interval { minutes: u64 },
    /// Only runs when explicitly triggered
    Manual,
}

impl Schedule {
    /// Longest interval a timer accepts, one year
    pub const MAX_INTERVAL_MINUTES: u64 = 365 * 24 * 60;

    /// Timer period, `None` for manual schedules
    ///
    /// Saturates instead of overflowing; [`Schedule::validate`] rejects
    /// intervals that large before a timer is armed.
    pub fn period(&self) -> Option<Duration> {
        match self {
            Self::Interval { minutes } => Some(Duration::from_secs(minutes.saturating_mul(60))),
            Self::Manual => None,
        }
    }

    /// Reason the schedule cannot drive a timer, if any
    pub fn validate(&self) -> Result<(), String> {
        match *self {
            Self::Interval { minutes: 0 } => {
                Err("interval must be at least one minute".to_string())
            }
            Self::Interval { minutes } if minutes > Self::MAX_INTERVAL_MINUTES => Err(format!(
                "interval of {minutes} minutes exceeds the {} minute maximum",
                Self::MAX_INTERVAL_MINUTES
            )),
            _ => Ok(()),
        }
    }

    pub fn is_interval(&self) -> bool {
        matches!(self, Self::Interval { .. })
    }
}

/// Static identity and schedule policy of one agent instance
///
/// Immutable once the agent is constructed; a schedule change means building
/// a new agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Unique per tenant, e.g. `email-agent-t1`
    pub id: String,
    pub name: String,
    pub description: String,
    pub enabled: bool,
    pub schedule: Schedule,
}

impl AgentConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>, schedule: Schedule) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            enabled: true,
            schedule,
        }
    }

    /// Config for a kind owned by `tenant_id`
    pub fn for_kind(kind: AgentKind, tenant_id: &str, schedule: Schedule) -> Self {
        Self {
            id: kind.agent_id(tenant_id),
            name: kind.display_name().to_string(),
            description: kind.description().to_string(),
            enabled: true,
            schedule,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// Agent runtime status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AgentStatus {
    /// Not started, or stopped
    #[default]
    Stopped,
    /// Started; interval agents have an armed timer
    Running,
    /// Last scheduled run failed; the timer is still armed
    Error,
}

/// Read-only snapshot of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub config: AgentConfig,
    pub status: AgentStatus,
    pub run_count: u64,
    pub last_run: Option<DateTime<Utc>>,
    /// An execution is currently in flight
    pub busy: bool,
    pub last_error: Option<String>,
}
