//! Persisted record types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::agent::AgentKind;
use crate::events::AgentEventKind;

/// One normalized row per completed or failed run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentLogRow {
    pub tenant_id: String,
    pub agent_id: String,
    pub agent_name: String,
    pub event_type: AgentEventKind,
    pub success: bool,
    pub duration_ms: u64,
    pub processed_count: usize,
    #[serde(default)]
    pub details: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// One payload item as written to storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredItem {
    pub tenant_id: String,
    pub agent: AgentKind,
    /// Natural key, when the item carries one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub item: Value,
    pub saved_at: DateTime<Utc>,
}

impl StoredItem {
    pub fn new(tenant_id: &str, agent: AgentKind, item: Value) -> Self {
        Self {
            tenant_id: tenant_id.to_string(),
            agent,
            key: natural_key(&item),
            item,
            saved_at: Utc::now(),
        }
    }
}

/// The item's `id` field as a string, if it has a usable one
pub(crate) fn natural_key(item: &Value) -> Option<String> {
    match item.get("id")? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
