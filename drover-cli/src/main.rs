use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;
mod config;
mod runtime;

#[derive(Parser)]
#[command(name = "drover", about = "Per-tenant agent scheduler")]
#[command(version, propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Show which agents a tenant would get
    Check(commands::check::CheckArgs),
    /// Manage configuration
    Config(commands::config::ConfigArgs),
    /// Show a tenant's recent agent runs
    Logs(commands::logs::LogsArgs),
    /// Run one agent once and print its result
    Run(commands::run::RunArgs),
    /// Run the drover daemon
    Serve(commands::serve::ServeArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // RUST_LOG wins over --verbose
    let default = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check(args) => commands::check::run(args).await,
        Commands::Config(args) => commands::config::run(args),
        Commands::Logs(args) => commands::logs::run(args).await,
        Commands::Run(args) => commands::run::run(args).await,
        Commands::Serve(args) => commands::serve::run(args).await,
    }
}
