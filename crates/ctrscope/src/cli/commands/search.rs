use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::RuntimePaths;
use crate::locate::locate;
use crate::models::QueryEnvelope;

const COMMAND: &str = "search";

#[derive(Debug, Clone, Args)]
pub struct SearchArgs {
    #[arg(long, value_name = "ID")]
    pub contact_id: Option<String>,
}

pub fn run(args: &SearchArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let contact_id = args.contact_id.as_deref().map(str::trim);
    let outcome = locate(&runtime_paths.data_dir, contact_id);

    let data = json!({
        "columns": outcome.rows.columns(),
        "rows": outcome.rows.rows_as_json(),
        "count": outcome.rows.len(),
    });
    QueryEnvelope::ok(COMMAND, data)
        .with_meta("contact_id", json!(contact_id.filter(|id| !id.is_empty())))
        .with_meta("backing_found", json!(outcome.backing_found))
        .with_warnings("search_degraded", outcome.warnings)
        .emit()
}
