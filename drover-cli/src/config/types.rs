use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default host for the drover server
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Default port for the drover server
pub const DEFAULT_PORT: u16 = 7743;

/// Configuration as stored in TOML files (with optional fields for merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawDroverConfig {
    #[serde(default)]
    pub server: RawServerConfig,

    #[serde(default)]
    pub storage: RawStorageConfig,

    #[serde(default)]
    pub tenants: RawTenantsConfig,
}

/// Server config as stored in TOML (optional fields for proper merging)
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawServerConfig {
    /// Host address to bind to
    pub host: Option<String>,

    /// Port for the drover server
    pub port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawStorageConfig {
    pub data_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawTenantsConfig {
    pub config_dir: Option<PathBuf>,
}

/// Final configuration with defaults applied
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DroverConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub tenants: TenantsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,

    /// Port for the drover server
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

/// Where run logs, saved payloads and activation state are written
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: drover_paths::data_dir(),
        }
    }
}

/// Directory holding `global.toml` and `tenants/<id>.toml`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TenantsConfig {
    pub config_dir: PathBuf,
}

impl Default for TenantsConfig {
    fn default() -> Self {
        Self {
            config_dir: drover_paths::config_dir(),
        }
    }
}
