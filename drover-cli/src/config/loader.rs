use super::types::{
    DEFAULT_HOST, DEFAULT_PORT, DroverConfig, RawDroverConfig, RawServerConfig, RawStorageConfig,
    RawTenantsConfig, ServerConfig, StorageConfig, TenantsConfig,
};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

pub struct ConfigLoader;

impl ConfigLoader {
    /// Load merged configuration (user + project)
    pub fn load() -> Result<DroverConfig> {
        let layers = [Self::user_config_path(), Self::project_config_path()];
        Self::load_layers(&layers)
    }

    /// Merge every existing file in order, later files winning
    pub fn load_layers<'a>(paths: impl IntoIterator<Item = &'a PathBuf>) -> Result<DroverConfig> {
        let mut raw = RawDroverConfig::default();
        for path in paths {
            if let Some(layer) = Self::read_raw(path)? {
                tracing::debug!(path = %path.display(), "Loaded config layer");
                raw = Self::merge_raw(raw, layer);
            }
        }

        // Convert to final config with defaults applied
        Ok(Self::finalize(raw))
    }

    fn read_raw(path: &Path) -> Result<Option<RawDroverConfig>> {
        if !path.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let raw = toml::from_str(&contents)
            .with_context(|| format!("Invalid config in {}", path.display()))?;
        Ok(Some(raw))
    }

    /// Get user config path
    pub fn user_config_path() -> PathBuf {
        drover_paths::config_dir().join("config.toml")
    }

    /// Get project config path
    /// Can be overridden with DROVER_PROJECT_CONFIG_DIR env var (useful for isolated tests)
    pub fn project_config_path() -> PathBuf {
        if let Ok(dir) = std::env::var("DROVER_PROJECT_CONFIG_DIR") {
            PathBuf::from(dir).join("config.toml")
        } else {
            PathBuf::from(".drover/config.toml")
        }
    }

    /// Merge two raw configs (overlay values override base only if explicitly set)
    fn merge_raw(base: RawDroverConfig, overlay: RawDroverConfig) -> RawDroverConfig {
        RawDroverConfig {
            server: RawServerConfig {
                host: overlay.server.host.or(base.server.host),
                port: overlay.server.port.or(base.server.port),
            },
            storage: RawStorageConfig {
                data_dir: overlay.storage.data_dir.or(base.storage.data_dir),
            },
            tenants: RawTenantsConfig {
                config_dir: overlay.tenants.config_dir.or(base.tenants.config_dir),
            },
        }
    }

    /// Convert raw config to final config with defaults applied
    fn finalize(raw: RawDroverConfig) -> DroverConfig {
        DroverConfig {
            server: ServerConfig {
                host: raw.server.host.unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: raw.server.port.unwrap_or(DEFAULT_PORT),
            },
            storage: raw
                .storage
                .data_dir
                .map(|data_dir| StorageConfig { data_dir })
                .unwrap_or_default(),
            tenants: raw
                .tenants
                .config_dir
                .map(|config_dir| TenantsConfig { config_dir })
                .unwrap_or_default(),
        }
    }
}
