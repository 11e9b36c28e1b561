//! Config provider trait and in-memory implementation

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{GlobalConfig, UserConfig};
use crate::error::ConfigError;

/// Source of tenant and global configuration
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Per-tenant agent settings and credential flags
    async fn load_user_config(&self, tenant_id: &str) -> Result<UserConfig, ConfigError>;

    /// Process-wide provider credentials
    async fn load_global_config(&self) -> Result<GlobalConfig, ConfigError>;
}

/// Config provider backed by in-memory maps
///
/// Unknown tenants get an empty config (every agent kind disabled).
pub struct StaticConfigProvider {
    global: RwLock<GlobalConfig>,
    tenants: RwLock<HashMap<String, UserConfig>>,
}

impl StaticConfigProvider {
    pub fn new(global: GlobalConfig) -> Self {
        Self {
            global: RwLock::new(global),
            tenants: RwLock::new(HashMap::new()),
        }
    }

    /// Register a tenant while building the provider
    pub fn with_tenant(mut self, tenant_id: impl Into<String>, config: UserConfig) -> Self {
        self.tenants.get_mut().insert(tenant_id.into(), config);
        self
    }

    /// Replace a tenant's config; the next build picks it up
    pub async fn set_user_config(&self, tenant_id: impl Into<String>, config: UserConfig) {
        self.tenants.write().await.insert(tenant_id.into(), config);
    }

    pub async fn set_global_config(&self, global: GlobalConfig) {
        *self.global.write().await = global;
    }
}

#[async_trait]
impl ConfigProvider for StaticConfigProvider {
    async fn load_user_config(&self, tenant_id: &str) -> Result<UserConfig, ConfigError> {
        Ok(self
            .tenants
            .read()
            .await
            .get(tenant_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn load_global_config(&self) -> Result<GlobalConfig, ConfigError> {
        Ok(self.global.read().await.clone())
    }
}
