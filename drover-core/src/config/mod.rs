//! Tenant and global configuration
//!
//! The agent manager reads both layers through a [`ConfigProvider`] before
//! every tenant build; nothing here is cached by the core.

mod provider;
mod toml_dir;
mod types;

pub use provider::{ConfigProvider, StaticConfigProvider};
pub use toml_dir::{TomlConfigProvider, is_path_safe_tenant_id};
pub use types::{
    AgentSettings, ApiCredential, GlobalConfig, OAuthClient, TenantCredentials, UserConfig,
};
