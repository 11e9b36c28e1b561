//! Print a tenant's recent agent runs

use anyhow::Result;
use clap::Args;
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use drover_core::{AgentLogRow, JsonlLogSink, LogQuery};

use crate::config::ConfigLoader;

#[derive(Debug, Args)]
pub struct LogsArgs {
    /// Tenant whose runs to show
    pub tenant: String,

    /// Maximum number of rows, newest first
    #[arg(short = 'n', long, default_value_t = 20)]
    pub limit: usize,
}

pub async fn run(args: LogsArgs) -> Result<()> {
    let config = ConfigLoader::load()?;
    let sink = JsonlLogSink::new(&config.storage.data_dir);
    let rows = sink.recent_logs(&args.tenant, args.limit).await?;

    if rows.is_empty() {
        println!("No runs recorded for tenant {}.", args.tenant);
        return Ok(());
    }

    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("When").fg(Color::Cyan),
        Cell::new("Agent").fg(Color::Cyan),
        Cell::new("Result").fg(Color::Cyan),
        Cell::new("Items").fg(Color::Cyan),
        Cell::new("Duration").fg(Color::Cyan),
    ]);
    for row in &rows {
        table.add_row(vec![
            Cell::new(row.timestamp.format("%Y-%m-%d %H:%M:%S")),
            Cell::new(&row.agent_name),
            result_cell(row),
            Cell::new(row.processed_count),
            Cell::new(format!("{} ms", row.duration_ms)),
        ]);
    }

    println!("{table}");
    Ok(())
}

fn result_cell(row: &AgentLogRow) -> Cell {
    match (&row.error, row.success) {
        (_, true) => Cell::new("ok").fg(Color::Green),
        (Some(error), false) => Cell::new(format!("failed: {error}")).fg(Color::Red),
        (None, false) => Cell::new("failed").fg(Color::Red),
    }
}
