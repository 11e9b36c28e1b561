//! File-backed activation state

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;
use tracing::warn;

use super::ActivationStore;
use crate::error::PersistenceError;

/// Activation file name
const ACTIVATION_FILE: &str = "active_tenants.json";

/// Active tenant ids in a JSON array, rewritten on every change
pub struct FileActivationStore {
    active: RwLock<BTreeSet<String>>,
    file_path: PathBuf,
}

impl FileActivationStore {
    /// Load the file under `data_dir`, or start empty
    ///
    /// A corrupt file is logged and treated as empty so a bad write cannot
    /// keep the daemon from starting.
    pub async fn load(data_dir: &Path) -> Result<Self, PersistenceError> {
        let file_path = data_dir.join(ACTIVATION_FILE);

        let active = if fs::try_exists(&file_path).await? {
            let content = fs::read_to_string(&file_path).await?;
            serde_json::from_str::<BTreeSet<String>>(&content).unwrap_or_else(|e| {
                warn!("Ignoring unreadable {}: {}", file_path.display(), e);
                BTreeSet::new()
            })
        } else {
            BTreeSet::new()
        };

        Ok(Self {
            active: RwLock::new(active),
            file_path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.file_path
    }

    async fn persist(&self, active: &BTreeSet<String>) -> Result<(), PersistenceError> {
        if let Some(parent) = self.file_path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let content = serde_json::to_string_pretty(active)?;
        fs::write(&self.file_path, content).await?;
        Ok(())
    }
}

#[async_trait]
impl ActivationStore for FileActivationStore {
    async fn active_tenant_ids(&self) -> Result<Vec<String>, PersistenceError> {
        Ok(self.active.read().await.iter().cloned().collect())
    }

    async fn set_active(&self, tenant_id: &str, active: bool) -> Result<(), PersistenceError> {
        let mut set = self.active.write().await;
        let changed = if active {
            set.insert(tenant_id.to_string())
        } else {
            set.remove(tenant_id)
        };
        if changed {
            self.persist(&set).await?;
        }
        Ok(())
    }
}
