use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schemars::JsonSchema;
use serde::Serialize;

use super::{LoadBatch, ObjectFailure};
use crate::config::SourceLocation;
use crate::storage::write_file_atomic;

pub const LOAD_REPORT_SCHEMA_VERSION: &str = "ctrscope.load-report.v1";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct LoadReportCounts {
    pub objects_listed: usize,
    pub objects_matched: usize,
    pub objects_merged: usize,
    pub objects_failed: usize,
    pub objects_skipped: usize,
    pub rows_merged: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct LoadReport {
    pub schema_version: String,
    pub bucket: String,
    pub prefix: String,
    pub canonical_path: String,
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub duration_ms: u64,
    pub counts: LoadReportCounts,
    pub no_file_found: bool,
    pub failures: Vec<ObjectFailure>,
    pub skipped_keys: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTimings {
    pub started_at_utc: String,
    pub finished_at_utc: String,
    pub duration_ms: u64,
}

#[must_use]
pub fn load_report_path(data_dir: &Path) -> PathBuf {
    data_dir.join("load").join("report.json")
}

#[must_use]
pub fn build_load_report(
    location: &SourceLocation,
    batch: &LoadBatch,
    rows_merged: usize,
    canonical_path: &Path,
    timings: LoadTimings,
) -> LoadReport {
    LoadReport {
        schema_version: LOAD_REPORT_SCHEMA_VERSION.to_string(),
        bucket: location.bucket.clone(),
        prefix: location.prefix.clone(),
        canonical_path: canonical_path.display().to_string(),
        started_at_utc: timings.started_at_utc,
        finished_at_utc: timings.finished_at_utc,
        duration_ms: timings.duration_ms,
        counts: LoadReportCounts {
            objects_listed: batch.objects_listed,
            objects_matched: batch.objects_matched(),
            objects_merged: batch.success_count(),
            objects_failed: batch.failures.len(),
            objects_skipped: batch.skipped_keys.len(),
            rows_merged,
        },
        no_file_found: batch.no_file_found(),
        failures: batch.failures.clone(),
        skipped_keys: batch.skipped_keys.clone(),
    }
}

pub fn write_load_report(path: &Path, report: &LoadReport) -> Result<()> {
    let encoded = serde_json::to_vec_pretty(report).context("failed to encode load report")?;
    write_file_atomic(path, &encoded)
        .with_context(|| format!("failed to write load report: {}", path.display()))
}
