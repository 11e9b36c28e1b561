//! Show which agents a tenant's configuration would build

use anyhow::{Context, Result};
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use drover_core::manager::check_enablement;
use drover_core::{AgentKind, ConfigProvider, Schedule, TomlConfigProvider};

use crate::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Tenant to inspect
    pub tenant: String,
}

pub async fn run(args: CheckArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let provider = TomlConfigProvider::new(&config.tenants.config_dir);

    let global = provider
        .load_global_config()
        .await
        .context("Failed to load global config")?;
    let user = provider
        .load_user_config(&args.tenant)
        .await
        .with_context(|| format!("Failed to load config for tenant {}", args.tenant))?;

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("Agent").fg(Color::Cyan),
        Cell::new("Id").fg(Color::Cyan),
        Cell::new("Status").fg(Color::Cyan),
    ]);

    for kind in AgentKind::BUILD_ORDER {
        let status = match check_enablement(kind, &user, &global) {
            Ok(settings) => Cell::new(format!(
                "enabled, {}",
                describe(settings.schedule(kind))
            ))
            .fg(Color::Green),
            Err(skip) => Cell::new(format!("skipped: {skip}")).fg(Color::Yellow),
        };
        table.add_row(vec![
            Cell::new(kind.as_str()),
            Cell::new(kind.agent_id(&args.tenant)),
            status,
        ]);
    }

    println!("{table}");
    Ok(())
}

fn describe(schedule: Schedule) -> String {
    match schedule {
        Schedule::Interval { minutes: 1 } => "every minute".to_string(),
        Schedule::Interval { minutes } => format!("every {minutes} minutes"),
        Schedule::Manual => "manual".to_string(),
    }
}
