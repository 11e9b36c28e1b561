//! One-shot agent run without the server

use anyhow::{Context, Result, bail};
use clap::Args;
use drover_core::{AgentKind, RunDisposition};
use serde_json::Value;

use crate::config::ConfigLoader;
use crate::runtime::Runtime;

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Tenant whose agent should run
    pub tenant: String,

    /// Agent kind (email, legal, financial, task, stablecoin)
    pub kind: AgentKind,

    /// JSON input handed to the executor
    #[arg(long)]
    pub input: Option<String>,
}

pub async fn run(args: RunArgs) -> Result<()> {
    let input = args
        .input
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .context("--input must be valid JSON")?;

    let config = ConfigLoader::load()?;
    let runtime = Runtime::build(&config).await?;
    let outcome = runtime
        .manager
        .run_agent(&args.tenant, args.kind, input)
        .await;
    runtime.manager.shutdown().await;

    let result = match outcome? {
        RunDisposition::Completed(result) => result,
        RunDisposition::Skipped => bail!("{} agent is already running", args.kind),
    };
    println!("{}", serde_json::to_string_pretty(&result)?);

    if let Some(error) = result.error() {
        bail!("{} agent failed: {}", args.kind, error);
    }
    Ok(())
}
