//! Shared application state for the drover server

use std::sync::Arc;

use chrono::{DateTime, Utc};
use drover_core::{AgentManager, LogQuery};

/// Shared application state accessible by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Owns every tenant's agents
    pub manager: Arc<AgentManager>,
    /// Read side of the run log, when the sink supports queries
    pub logs: Option<Arc<dyn LogQuery>>,
    /// When the server started
    pub started_at: DateTime<Utc>,
}

impl AppState {
    pub fn new(manager: Arc<AgentManager>) -> Self {
        Self {
            manager,
            logs: None,
            started_at: Utc::now(),
        }
    }

    /// Enable `GET /api/tenants/:tenant/logs`
    pub fn with_logs(mut self, logs: Arc<dyn LogQuery>) -> Self {
        self.logs = Some(logs);
        self
    }

    /// Returns how long the server has been running
    pub fn uptime_seconds(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds()
    }
}
