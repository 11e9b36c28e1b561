//! Wiring of the file-backed collaborators into one agent manager

use std::sync::Arc;

use anyhow::{Context, Result};
use drover_core::{
    AgentManager, CommandExecutorFactory, FileActivationStore, JsonlLogSink, LogNotifier,
    Priority, TomlConfigProvider,
};

use crate::config::DroverConfig;

/// Everything a command needs to drive agents
pub struct Runtime {
    pub manager: Arc<AgentManager>,
    pub logs: Arc<JsonlLogSink>,
}

impl Runtime {
    /// Build the manager over the configured directories
    pub async fn build(config: &DroverConfig) -> Result<Self> {
        let data_dir = &config.storage.data_dir;
        tokio::fs::create_dir_all(data_dir)
            .await
            .with_context(|| format!("Failed to create data dir {}", data_dir.display()))?;

        let activation = FileActivationStore::load(data_dir)
            .await
            .context("Failed to load activation state")?;
        let logs = Arc::new(JsonlLogSink::new(data_dir));

        let manager = AgentManager::new(
            Arc::new(TomlConfigProvider::new(&config.tenants.config_dir)),
            Arc::new(CommandExecutorFactory::new()),
            logs.clone(),
            Arc::new(activation),
        )
        .with_notifier(Arc::new(LogNotifier::new(Priority::Normal)));

        tracing::debug!(
            data_dir = %data_dir.display(),
            config_dir = %config.tenants.config_dir.display(),
            "Agent manager ready"
        );

        Ok(Self {
            manager: Arc::new(manager),
            logs,
        })
    }
}
