use std::path::PathBuf;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{analyze_canonical, describe_issue};
use crate::aggregate::threshold_filter;
use crate::cli::app::AnalysisArgs;
use crate::config::RuntimePaths;
use crate::export::{download_options, export_csv, export_file_name};
use crate::models::QueryEnvelope;
use crate::storage::write_file_atomic;

const COMMAND: &str = "export";

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    #[arg(long, value_name = "PATH")]
    pub out: Option<PathBuf>,
}

pub fn run(args: &ExportArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let options = args.analysis.derivation_options();
    let analysis = analyze_canonical(runtime_paths, &options);

    let threshold = args.analysis.threshold;
    let records = match threshold {
        Some(threshold) => threshold_filter(&analysis.outcome.records, threshold).records,
        None => analysis.outcome.records.clone(),
    };

    let file_name = export_file_name(threshold);
    let out_path = match &args.out {
        Some(path) if path.is_absolute() => path.clone(),
        Some(path) => runtime_paths.cwd.join(path),
        None => runtime_paths.cwd.join(&file_name),
    };

    let encoded = export_csv(&records, &download_options()).map_err(|error| {
        QueryEnvelope::failure(COMMAND, "export_encode_failed", "failed to encode csv", &error)
    })?;
    write_file_atomic(&out_path, &encoded).map_err(|error| {
        QueryEnvelope::failure(COMMAND, "export_write_failed", "failed to write csv", &error)
    })?;

    let data = json!({
        "file_name": file_name,
        "path": out_path.display().to_string(),
        "records": records.len(),
        "bytes": encoded.len(),
    });
    QueryEnvelope::ok(COMMAND, data)
        .with_meta("threshold_seconds", json!(threshold))
        .with_meta("channel", json!(options.channel))
        .with_meta("date_basis", json!(options.date_basis))
        .with_warnings("export_degraded", analysis.warnings)
        .with_warnings(
            "metrics_row_issue",
            analysis.outcome.issues.iter().map(describe_issue),
        )
        .emit()
}
