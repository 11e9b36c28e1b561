//! Drover serve command for running the daemon
//!
//! The serve command resumes every tenant marked active, then exposes the
//! agent manager over HTTP until Ctrl+C or SIGTERM.

use anyhow::Result;
use clap::Args;
use drover_server::{AppState, DroverServer, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::ConfigLoader;
use crate::runtime::Runtime;

/// Arguments for the serve command
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Port to listen on (overrides config)
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Host to bind to (overrides config)
    #[arg(long)]
    pub host: Option<String>,

    /// Do not resume tenants marked active
    #[arg(long)]
    pub no_auto_start: bool,
}

/// Run the serve command
pub async fn run(args: ServeArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let runtime = Runtime::build(&config).await?;

    if !args.no_auto_start {
        let report = runtime.manager.auto_start_agents().await?;
        info!(
            started = report.started.len(),
            failed = report.failed.len(),
            "Auto-start finished"
        );
        for (tenant_id, error) in &report.failed {
            warn!(tenant_id = %tenant_id, "Tenant not resumed: {}", error);
        }
    }

    let server_config = ServerConfig::new(
        args.host.unwrap_or(config.server.host),
        args.port.unwrap_or(config.server.port),
    );
    info!("Starting drover server on {}", server_config.addr());

    let state = AppState::new(Arc::clone(&runtime.manager)).with_logs(runtime.logs.clone());
    let result = DroverServer::new(server_config, Arc::new(state))
        .run_until(shutdown_signal())
        .await;

    // Stop timers whether or not the server exited cleanly
    runtime.manager.shutdown().await;
    result.map_err(Into::into)
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
