//! Directory-of-TOML-files config provider
//!
//! Layout:
//!
//! ```text
//! <dir>/global.toml          provider credentials, default commands
//! <dir>/tenants/<id>.toml    one file per tenant
//! ```

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::fs;
use tracing::debug;

use super::{ConfigProvider, GlobalConfig, UserConfig};
use crate::error::ConfigError;

const GLOBAL_FILE: &str = "global.toml";
const TENANTS_DIR: &str = "tenants";

/// Whether a tenant id can be used as a file name without escaping its directory
pub fn is_path_safe_tenant_id(tenant_id: &str) -> bool {
    !tenant_id.is_empty()
        && !tenant_id.starts_with('.')
        && tenant_id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.')
}

/// Reads configuration from TOML files on every call
pub struct TomlConfigProvider {
    dir: PathBuf,
}

impl TomlConfigProvider {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn global_path(&self) -> PathBuf {
        self.dir.join(GLOBAL_FILE)
    }

    /// Path of a tenant's file; `None` if the id could escape the directory
    pub fn tenant_path(&self, tenant_id: &str) -> Option<PathBuf> {
        is_path_safe_tenant_id(tenant_id)
            .then(|| self.dir.join(TENANTS_DIR).join(format!("{tenant_id}.toml")))
    }

    /// Parse `path`, or return the default when it does not exist
    async fn read_or_default<T: DeserializeOwned + Default>(
        path: &Path,
    ) -> Result<T, ConfigError> {
        if !fs::try_exists(path).await? {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(T::default());
        }
        let contents = fs::read_to_string(path).await?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ConfigProvider for TomlConfigProvider {
    async fn load_user_config(&self, tenant_id: &str) -> Result<UserConfig, ConfigError> {
        let path = self
            .tenant_path(tenant_id)
            .ok_or_else(|| ConfigError::Unavailable(format!("invalid tenant id '{tenant_id}'")))?;
        Self::read_or_default(&path).await
    }

    async fn load_global_config(&self) -> Result<GlobalConfig, ConfigError> {
        Self::read_or_default(&self.global_path()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentKind;
    use tempfile::TempDir;

    async fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).await.unwrap();
        fs::write(path, contents).await.unwrap();
    }

    #[tokio::test]
    async fn missing_files_yield_defaults() {
        let temp = TempDir::new().unwrap();
        let provider = TomlConfigProvider::new(temp.path());

        assert_eq!(
            provider.load_user_config("t1").await.unwrap(),
            UserConfig::default()
        );
        assert_eq!(
            provider.load_global_config().await.unwrap(),
            GlobalConfig::default()
        );
    }

    #[tokio::test]
    async fn reads_tenant_and_global_files() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            "global.toml",
            r#"
            [llm]
            api_key = "sk-test"

            [commands]
            email = ["drover-email", "--json"]
            "#,
        )
        .await;
        write(
            temp.path(),
            "tenants/t1.toml",
            r#"
            [credentials]
            gmail = true

            [email]
            enabled = true
            interval_minutes = 2
            "#,
        )
        .await;

        let provider = TomlConfigProvider::new(temp.path());
        let global = provider.load_global_config().await.unwrap();
        assert!(global.has_llm());
        assert_eq!(
            global.command_for(AgentKind::Email),
            Some(&vec!["drover-email".to_string(), "--json".to_string()])
        );

        let user = provider.load_user_config("t1").await.unwrap();
        assert!(user.credentials.gmail);
        assert_eq!(user.settings(AgentKind::Email).unwrap().interval_minutes, Some(2));
    }

    #[tokio::test]
    async fn malformed_file_is_a_parse_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "tenants/t1.toml", "[email\nenabled = ").await;

        let provider = TomlConfigProvider::new(temp.path());
        let err = provider.load_user_config("t1").await.unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[tokio::test]
    async fn path_traversal_ids_are_rejected() {
        let temp = TempDir::new().unwrap();
        let provider = TomlConfigProvider::new(temp.path());

        assert!(provider.tenant_path("../etc/passwd").is_none());
        assert!(provider.tenant_path(".hidden").is_none());
        assert!(provider.tenant_path("").is_none());
        assert!(provider.tenant_path("user_42").is_some());
        assert!(matches!(
            provider.load_user_config("a/b").await,
            Err(ConfigError::Unavailable(_))
        ));
    }
}
