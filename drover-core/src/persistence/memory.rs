//! In-memory persistence

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use super::types::{AgentLogRow, StoredItem};
use super::{ActivationStore, LogQuery, PersistenceSink};
use crate::agent::{AgentKind, AgentOutput};
use crate::error::PersistenceError;

/// Items saved for one tenant and kind
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SavedPayload {
    /// Keyed items; an id already present is skipped
    pub keyed: HashMap<String, Value>,
    /// Items without a natural key, in arrival order
    pub unkeyed: Vec<Value>,
}

impl SavedPayload {
    pub fn len(&self) -> usize {
        self.keyed.len() + self.unkeyed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sink, log reader and activation store in one, all in memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    logs: RwLock<Vec<AgentLogRow>>,
    payloads: RwLock<HashMap<(String, AgentKind), SavedPayload>>,
    active: RwLock<BTreeSet<String>>,
    payload_calls: AtomicU64,
    fail_logs: AtomicBool,
    fail_payloads: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the activation state
    pub fn with_active<I, S>(tenants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            active: RwLock::new(tenants.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    /// Make `append_log` fail until reset
    pub fn fail_logs(&self, fail: bool) {
        self.fail_logs.store(fail, Ordering::SeqCst);
    }

    /// Make `save_completed_payload` fail until reset
    pub fn fail_payloads(&self, fail: bool) {
        self.fail_payloads.store(fail, Ordering::SeqCst);
    }

    pub async fn logs(&self) -> Vec<AgentLogRow> {
        self.logs.read().await.clone()
    }

    /// Rows for one agent id
    pub async fn logs_for(&self, agent_id: &str) -> Vec<AgentLogRow> {
        self.logs
            .read()
            .await
            .iter()
            .filter(|row| row.agent_id == agent_id)
            .cloned()
            .collect()
    }

    pub async fn payload(&self, tenant_id: &str, kind: AgentKind) -> SavedPayload {
        self.payloads
            .read()
            .await
            .get(&(tenant_id.to_string(), kind))
            .cloned()
            .unwrap_or_default()
    }

    /// Number of `save_completed_payload` calls, including failed ones
    pub fn payload_calls(&self) -> u64 {
        self.payload_calls.load(Ordering::SeqCst)
    }

    pub async fn is_active(&self, tenant_id: &str) -> bool {
        self.active.read().await.contains(tenant_id)
    }
}

#[async_trait]
impl PersistenceSink for MemoryStore {
    async fn save_completed_payload(
        &self,
        kind: AgentKind,
        payload: &AgentOutput,
        tenant_id: &str,
    ) -> Result<(), PersistenceError> {
        self.payload_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_payloads.load(Ordering::SeqCst) {
            return Err(PersistenceError::Storage("payload store unavailable".to_string()));
        }

        let mut payloads = self.payloads.write().await;
        let saved = payloads.entry((tenant_id.to_string(), kind)).or_default();
        for item in &payload.items {
            let stored = StoredItem::new(tenant_id, kind, item.clone());
            match stored.key {
                Some(key) => {
                    saved.keyed.entry(key).or_insert(stored.item);
                }
                None => saved.unkeyed.push(stored.item),
            }
        }
        Ok(())
    }

    async fn append_log(&self, row: AgentLogRow) -> Result<(), PersistenceError> {
        if self.fail_logs.load(Ordering::SeqCst) {
            return Err(PersistenceError::Storage("log store unavailable".to_string()));
        }
        self.logs.write().await.push(row);
        Ok(())
    }
}

#[async_trait]
impl LogQuery for MemoryStore {
    async fn recent_logs(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentLogRow>, PersistenceError> {
        Ok(self
            .logs
            .read()
            .await
            .iter()
            .rev()
            .filter(|row| row.tenant_id == tenant_id)
            .take(limit)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ActivationStore for MemoryStore {
    async fn active_tenant_ids(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.active.read().await.iter().cloned().collect())
    }

    async fn set_active(&self, tenant_id: &str, active: bool) -> Result<(), PersistenceError> {
        let mut set = self.active.write().await;
        if active {
            set.insert(tenant_id.to_string());
        } else {
            set.remove(tenant_id);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::AgentEventKind;
    use chrono::Utc;
    use serde_json::json;

    fn row(tenant: &str, n: u64) -> AgentLogRow {
        AgentLogRow {
            tenant_id: tenant.to_string(),
            agent_id: format!("task-agent-{tenant}"),
            agent_name: "Task Agent".to_string(),
            event_type: AgentEventKind::Completed,
            success: true,
            duration_ms: n,
            processed_count: 0,
            details: Value::Null,
            error: None,
            timestamp: Utc::now(),
        }
    }

    #[tokio::test]
    async fn duplicate_ids_are_skipped() {
        let store = MemoryStore::new();
        let output = AgentOutput::with_items(vec![
            json!({"id": "a", "v": 1}),
            json!({"note": "no id"}),
        ]);
        store
            .save_completed_payload(AgentKind::Email, &output, "t1")
            .await
            .unwrap();

        let again = AgentOutput::with_items(vec![json!({"id": "a", "v": 2})]);
        store
            .save_completed_payload(AgentKind::Email, &again, "t1")
            .await
            .unwrap();

        let saved = store.payload("t1", AgentKind::Email).await;
        assert_eq!(saved.len(), 2);
        assert_eq!(saved.keyed["a"]["v"], 1);
        assert!(store.payload("t2", AgentKind::Email).await.is_empty());
    }

    #[tokio::test]
    async fn injected_failures_are_errors() {
        let store = MemoryStore::new();
        store.fail_logs(true);
        store.fail_payloads(true);
        assert!(store.append_log(row("t1", 1)).await.is_err());
        assert!(
            store
                .save_completed_payload(AgentKind::Task, &AgentOutput::default(), "t1")
                .await
                .is_err()
        );
        assert_eq!(store.payload_calls(), 1);

        store.fail_logs(false);
        assert!(store.append_log(row("t1", 1)).await.is_ok());
    }

    #[tokio::test]
    async fn recent_logs_are_newest_first_per_tenant() {
        let store = MemoryStore::new();
        for n in 0..3 {
            store.append_log(row("t1", n)).await.unwrap();
        }
        store.append_log(row("t2", 9)).await.unwrap();

        let rows = store.recent_logs("t1", 2).await.unwrap();
        let durations: Vec<u64> = rows.iter().map(|r| r.duration_ms).collect();
        assert_eq!(durations, vec![2, 1]);
    }

    #[tokio::test]
    async fn activation_set_and_clear() {
        let store = MemoryStore::with_active(["a"]);
        store.set_active("b", true).await.unwrap();
        store.set_active("a", false).await.unwrap();
        store.set_active("a", false).await.unwrap();
        assert_eq!(store.active_tenant_ids().await.unwrap(), vec!["b".to_string()]);
        assert!(store.is_active("b").await);
    }
}
