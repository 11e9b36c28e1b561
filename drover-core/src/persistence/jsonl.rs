//! JSONL file persistence
//!
//! Layout under the sink's root:
//!
//! ```text
//! logs/<tenant>.jsonl                 one AgentLogRow per line
//! payloads/<tenant>/<kind>.jsonl      one StoredItem per line
//! ```
//!
//! Payload files are append-only; an item whose `id` is already present in
//! the file is skipped, which makes repeated delivery harmless.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use super::types::{AgentLogRow, StoredItem};
use super::{LogQuery, PersistenceSink};
use crate::agent::{AgentKind, AgentOutput};
use crate::config::is_path_safe_tenant_id;
use crate::error::PersistenceError;

/// Append-only JSONL sink
pub struct JsonlLogSink {
    root: PathBuf,
    /// Natural keys already on disk, loaded per payload file on first use
    seen: Mutex<HashMap<PathBuf, HashSet<String>>>,
}

impl JsonlLogSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            seen: Mutex::new(HashMap::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn log_path(&self, tenant_id: &str) -> Result<PathBuf, PersistenceError> {
        let tenant_id = checked_tenant(tenant_id)?;
        Ok(self.root.join("logs").join(format!("{tenant_id}.jsonl")))
    }

    pub fn payload_path(
        &self,
        tenant_id: &str,
        kind: AgentKind,
    ) -> Result<PathBuf, PersistenceError> {
        let tenant_id = checked_tenant(tenant_id)?;
        Ok(self
            .root
            .join("payloads")
            .join(tenant_id)
            .join(format!("{}.jsonl", kind.as_str())))
    }

    /// Every stored item for a tenant's kind, oldest first
    pub async fn stored_items(
        &self,
        tenant_id: &str,
        kind: AgentKind,
    ) -> Result<Vec<StoredItem>, PersistenceError> {
        read_lines(&self.payload_path(tenant_id, kind)?).await
    }

    async fn append_lines<T: Serialize>(path: &Path, records: &[T]) -> Result<(), PersistenceError> {
        if records.is_empty() {
            return Ok(());
        }
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await?;
        }

        let mut buf = Vec::new();
        for record in records {
            serde_json::to_writer(&mut buf, record)?;
            buf.push(b'\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await?;
        file.write_all(&buf).await?;
        file.flush().await?;
        Ok(())
    }
}

fn checked_tenant(tenant_id: &str) -> Result<&str, PersistenceError> {
    if is_path_safe_tenant_id(tenant_id) {
        Ok(tenant_id)
    } else {
        Err(PersistenceError::Storage(format!(
            "tenant id '{tenant_id}' is not usable as a file name"
        )))
    }
}

/// Parse every line of a JSONL file; a missing file reads as empty
async fn read_lines<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, PersistenceError> {
    if !fs::try_exists(path).await? {
        return Ok(Vec::new());
    }

    let mut lines = BufReader::new(File::open(path).await?).lines();
    let mut records = Vec::new();
    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str(&line) {
            Ok(record) => records.push(record),
            Err(e) => warn!("Skipping malformed line in {}: {}", path.display(), e),
        }
    }
    Ok(records)
}

#[async_trait]
impl PersistenceSink for JsonlLogSink {
    async fn save_completed_payload(
        &self,
        kind: AgentKind,
        payload: &AgentOutput,
        tenant_id: &str,
    ) -> Result<(), PersistenceError> {
        let path = self.payload_path(tenant_id, kind)?;

        // Held across the write so two runs cannot both pass the key check
        let mut seen = self.seen.lock().await;
        if !seen.contains_key(&path) {
            let keys = read_lines::<StoredItem>(&path)
                .await?
                .into_iter()
                .filter_map(|stored| stored.key)
                .collect();
            seen.insert(path.clone(), keys);
        }
        let Some(keys) = seen.get_mut(&path) else {
            return Ok(());
        };

        let mut fresh = Vec::new();
        for item in &payload.items {
            let stored = StoredItem::new(tenant_id, kind, item.clone());
            if let Some(key) = &stored.key
                && !keys.insert(key.clone())
            {
                debug!(%tenant_id, agent = %kind, %key, "Item already stored, skipping");
                continue;
            }
            fresh.push(stored);
        }

        if let Err(e) = Self::append_lines(&path, &fresh).await {
            // Forget the cache so the next call re-reads what actually landed
            seen.remove(&path);
            return Err(e);
        }
        Ok(())
    }

    async fn append_log(&self, row: AgentLogRow) -> Result<(), PersistenceError> {
        let path = self.log_path(&row.tenant_id)?;
        Self::append_lines(&path, std::slice::from_ref(&row)).await
    }
}

#[async_trait]
impl LogQuery for JsonlLogSink {
    async fn recent_logs(
        &self,
        tenant_id: &str,
        limit: usize,
    ) -> Result<Vec<AgentLogRow>, PersistenceError> {
        let mut rows: Vec<AgentLogRow> = read_lines(&self.log_path(tenant_id)?).await?;
        rows.reverse();
        rows.truncate(limit);
        Ok(rows)
    }
}
