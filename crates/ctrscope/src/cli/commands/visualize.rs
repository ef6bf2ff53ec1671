use anyhow::Result;
use clap::Args;
use serde_json::json;

use super::{analyze_canonical, describe_issue};
use crate::aggregate::{
    DEFAULT_HISTOGRAM_BINS, channel_aggregate, daily_aggregate, delay_histogram, delay_summary,
    threshold_filter,
};
use crate::cli::app::AnalysisArgs;
use crate::config::RuntimePaths;
use crate::models::QueryEnvelope;

const COMMAND: &str = "visualize";

#[derive(Debug, Clone, Args)]
pub struct VisualizeArgs {
    #[command(flatten)]
    pub analysis: AnalysisArgs,

    #[arg(long, default_value_t = DEFAULT_HISTOGRAM_BINS)]
    pub bins: usize,
}

pub fn run(args: &VisualizeArgs, runtime_paths: &RuntimePaths) -> Result<()> {
    let options = args.analysis.derivation_options();
    let analysis = analyze_canonical(runtime_paths, &options);
    let records = &analysis.outcome.records;

    let summary = delay_summary(records);
    // Without an explicit threshold, start at the smallest observed delay.
    let threshold = args
        .analysis
        .threshold
        .or(summary.min_seconds)
        .unwrap_or(0.0);
    let view = threshold_filter(records, threshold);

    let data = json!({
        "summary": summary,
        "histogram": delay_histogram(records, args.bins),
        "threshold": view,
        "channels": channel_aggregate(records),
        "daily": daily_aggregate(records),
        "derivation": {
            "input_rows": analysis.outcome.input_rows,
            "excluded_rows": analysis.outcome.excluded_rows,
            "collapsed_rows": analysis.outcome.collapsed_rows,
            "channel_filtered_rows": analysis.outcome.channel_filtered_rows,
            "issues": analysis.outcome.issues,
        },
    });

    QueryEnvelope::ok(COMMAND, data)
        .with_meta(
            "data_dir",
            json!(runtime_paths.data_dir.display().to_string()),
        )
        .with_meta("channel", json!(options.channel))
        .with_meta("date_basis", json!(options.date_basis))
        .with_warnings("visualize_degraded", analysis.warnings)
        .with_warnings(
            "metrics_row_issue",
            analysis.outcome.issues.iter().map(describe_issue),
        )
        .emit()
}
