use anyhow::Result;
use clap::Args;
use serde_json::json;

use crate::config::{BucketConfig, RuntimePaths, SourceLocation};
use crate::consolidate::{run_load, source_contributions};
use crate::ingest::{LoadOptions, Loader};
use crate::models::QueryEnvelope;
use crate::remote::{DEFAULT_PAGE_SIZE, DirectoryObjectStore};
use crate::storage::{CsvWriteOptions, raw_sources_dir};

const COMMAND: &str = "load";

#[derive(Debug, Clone, Args)]
pub struct LoadArgs {
    #[arg(long, value_name = "LOCATION")]
    pub source: Option<String>,

    #[arg(long, default_value_t = false)]
    pub keep_raw: bool,

    #[arg(long, default_value_t = DEFAULT_PAGE_SIZE)]
    pub page_size: usize,
}

pub fn run(
    args: &LoadArgs,
    runtime_paths: &RuntimePaths,
    bucket_config: Option<&BucketConfig>,
) -> Result<()> {
    let Some(raw_source) = args
        .source
        .clone()
        .or_else(|| bucket_config.map(|config| config.bucket_name.clone()))
    else {
        return Err(QueryEnvelope::error(
            COMMAND,
            "load_source_missing",
            "no source given; pass --source or create s3bucket.json",
        )
        .into_error());
    };

    let location = SourceLocation::parse(&raw_source).map_err(|error| {
        QueryEnvelope::failure(
            COMMAND,
            "load_source_invalid",
            "invalid source location",
            &error,
        )
    })?;
    let bucket_dir = runtime_paths.bucket_dir(&location.bucket);
    let store = DirectoryObjectStore::open(&bucket_dir)
        .map_err(|error| {
            QueryEnvelope::failure(
                COMMAND,
                "load_bucket_unavailable",
                "bucket could not be opened",
                &error,
            )
        })?
        .with_page_size(args.page_size);

    let load_options = LoadOptions {
        raw_dir: args
            .keep_raw
            .then(|| raw_sources_dir(&runtime_paths.data_dir)),
    };
    let mut loader = Loader::new(&store);
    let load_run = run_load(
        &mut loader,
        &location,
        &runtime_paths.data_dir,
        &load_options,
        &CsvWriteOptions::default(),
    )
    .map_err(|error| QueryEnvelope::failure(COMMAND, "load_failed", "load failed", &error))?;

    let log = loader.into_log();
    let data = json!({
        "report": load_run.report,
        "sources": source_contributions(&load_run.batch.sources),
        "log": log.entries().collect::<Vec<_>>(),
        "log_dropped": log.dropped(),
    });

    let mut envelope = QueryEnvelope::ok(COMMAND, data)
        .with_meta("bucket_dir", json!(bucket_dir.display().to_string()))
        .with_meta(
            "canonical_path",
            json!(load_run.outcome.persisted_path.display().to_string()),
        )
        .with_meta(
            "report_path",
            json!(load_run.report_path.display().to_string()),
        )
        .with_warnings(
            "load_object_failed",
            load_run
                .batch
                .failures
                .iter()
                .map(|failure| format!("{}: {}", failure.key, failure.reason)),
        );
    if load_run.outcome.no_file_found {
        envelope = envelope.with_warning("load_no_file_found", "no files found.");
    }
    envelope.emit()
}
