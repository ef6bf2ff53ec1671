use anyhow::{Context, Result};
use clap::Args;
use serde_json::{Value, json};

use crate::ingest::{LOAD_REPORT_SCHEMA_VERSION, LoadReport};
use crate::metrics::{DerivedMetricsRecord, METRIC_COLUMNS};
use crate::models::QueryEnvelope;

const COMMAND: &str = "schema";

#[derive(Debug, Clone, Args)]
pub struct SchemaArgs {}

pub fn run(_args: &SchemaArgs) -> Result<()> {
    let data = build_schema_document().map_err(|error| {
        QueryEnvelope::failure(
            COMMAND,
            "schema_encode_failed",
            "failed to encode schemas",
            &error,
        )
    })?;
    QueryEnvelope::ok(COMMAND, data).emit()
}

pub fn build_schema_document() -> Result<Value> {
    let metrics = serde_json::to_value(schemars::schema_for!(DerivedMetricsRecord))
        .context("failed to encode metrics record schema")?;
    let load_report = serde_json::to_value(schemars::schema_for!(LoadReport))
        .context("failed to encode load report schema")?;

    Ok(json!({
        "metrics_record": {
            "columns": METRIC_COLUMNS,
            "schema": metrics,
        },
        "load_report": {
            "schema_version": LOAD_REPORT_SCHEMA_VERSION,
            "schema": load_report,
        },
    }))
}
