use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use serde::Serialize;

use crate::config::SourceLocation;
use crate::ingest::{
    DecodedSource, LoadBatch, LoadLog, LoadOptions, LoadReport, LoadTimings, Loader,
    build_load_report, load_report_path, write_load_report,
};
use crate::models::RecordTable;
use crate::storage::{CsvWriteOptions, canonical_table_path, write_table};
use crate::utils::time::now_utc_string;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsolidationOutcome {
    pub table: RecordTable,
    pub merged_sources: usize,
    pub no_file_found: bool,
    pub persisted_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadRun {
    pub batch: LoadBatch,
    pub outcome: ConsolidationOutcome,
    pub report: LoadReport,
    pub report_path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceContribution {
    pub key: String,
    pub file_name: String,
    pub rows: usize,
}

#[must_use]
pub fn concat_tables<'a, I>(tables: I) -> RecordTable
where
    I: IntoIterator<Item = &'a RecordTable>,
{
    let tables = tables.into_iter().collect::<Vec<_>>();

    let mut columns: Vec<String> = Vec::new();
    for table in &tables {
        for column in table.columns() {
            if !columns.contains(column) {
                columns.push(column.clone());
            }
        }
    }

    let mut merged = RecordTable::new(columns.clone());
    for table in tables {
        let mapping = columns
            .iter()
            .map(|column| table.column_index(column))
            .collect::<Vec<_>>();
        for row in table.rows() {
            let aligned = mapping
                .iter()
                .map(|index| index.and_then(|index| row[index].clone()))
                .collect();
            merged.push_row(aligned);
        }
    }
    merged
}

#[must_use]
pub fn consolidate(sources: &[DecodedSource]) -> RecordTable {
    concat_tables(sources.iter().map(|source| &source.table))
}

#[must_use]
pub fn source_contributions(sources: &[DecodedSource]) -> Vec<SourceContribution> {
    sources
        .iter()
        .map(|source| SourceContribution {
            key: source.key.clone(),
            file_name: source.file_name.clone(),
            rows: source.table.len(),
        })
        .collect()
}

pub fn consolidate_and_persist(
    batch: &LoadBatch,
    data_dir: &Path,
    options: &CsvWriteOptions,
    log: &mut LoadLog,
) -> Result<ConsolidationOutcome> {
    let table = consolidate(&batch.sources);
    let persisted_path = canonical_table_path(data_dir);
    write_table(&table, &persisted_path, options).with_context(|| {
        format!(
            "failed to persist canonical table: {}",
            persisted_path.display()
        )
    })?;

    let no_file_found = batch.no_file_found();
    if no_file_found {
        log.warn("no files found.");
    } else {
        log.info(format!(
            "saved merged data to {} ({} rows)",
            persisted_path.display(),
            table.len()
        ));
        log.info(format!(
            "files loaded from bucket: {}",
            batch.success_count()
        ));
    }

    Ok(ConsolidationOutcome {
        table,
        merged_sources: batch.success_count(),
        no_file_found,
        persisted_path,
    })
}

pub fn run_load(
    loader: &mut Loader<'_>,
    location: &SourceLocation,
    data_dir: &Path,
    load_options: &LoadOptions,
    csv_options: &CsvWriteOptions,
) -> Result<LoadRun> {
    let started_at_utc = now_utc_string();
    let started_at = Instant::now();

    let batch = loader.load(location, load_options).with_context(|| {
        format!(
            "failed to list objects in bucket `{}` under prefix `{}`",
            location.bucket, location.prefix
        )
    })?;
    let outcome = consolidate_and_persist(&batch, data_dir, csv_options, loader.log_mut())?;

    let timings = LoadTimings {
        started_at_utc,
        finished_at_utc: now_utc_string(),
        duration_ms: started_at.elapsed().as_millis() as u64,
    };
    let report = build_load_report(
        location,
        &batch,
        outcome.table.len(),
        &outcome.persisted_path,
        timings,
    );
    let report_path = load_report_path(data_dir);
    write_load_report(&report_path, &report)?;

    Ok(LoadRun {
        batch,
        outcome,
        report,
        report_path,
    })
}
