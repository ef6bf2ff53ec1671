pub mod log;
pub mod report;

use std::path::{Path, PathBuf};

use anyhow::Result;
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use crate::config::SourceLocation;
use crate::decode::{DecodeError, decode_payload};
use crate::discovery::{DiscoveredObject, SourceFormat, plan_objects};
use crate::models::{RecordTable, SOURCE_FILE_COLUMN};
use crate::remote::{ObjectStore, list_all_keys};
use crate::storage::write_file_atomic;

pub use log::{DEFAULT_LOG_CAPACITY, LoadLog, LogEntry, LogLevel};
pub use report::{
    LOAD_REPORT_SCHEMA_VERSION, LoadReport, LoadReportCounts, LoadTimings, build_load_report,
    load_report_path, write_load_report,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadOptions {
    pub raw_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedSource {
    pub key: String,
    pub file_name: String,
    pub format: SourceFormat,
    pub table: RecordTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    Fetch,
    Decode,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, JsonSchema)]
pub struct ObjectFailure {
    pub key: String,
    pub stage: FailureStage,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum ObjectError {
    #[error("fetch failed: {0:#}")]
    Fetch(anyhow::Error),
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

impl ObjectError {
    const fn stage(&self) -> FailureStage {
        match self {
            Self::Fetch(_) => FailureStage::Fetch,
            Self::Decode(_) => FailureStage::Decode,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadBatch {
    pub sources: Vec<DecodedSource>,
    pub failures: Vec<ObjectFailure>,
    pub objects_listed: usize,
    pub skipped_keys: Vec<String>,
}

impl LoadBatch {
    #[must_use]
    pub fn success_count(&self) -> usize {
        self.sources.len()
    }

    #[must_use]
    pub fn no_file_found(&self) -> bool {
        self.sources.is_empty()
    }

    #[must_use]
    pub fn objects_matched(&self) -> usize {
        self.sources.len() + self.failures.len()
    }

    #[must_use]
    pub fn rows_decoded(&self) -> usize {
        self.sources.iter().map(|source| source.table.len()).sum()
    }
}

pub struct Loader<'a> {
    store: &'a dyn ObjectStore,
    log: LoadLog,
}

impl<'a> Loader<'a> {
    #[must_use]
    pub fn new(store: &'a dyn ObjectStore) -> Self {
        Self::with_log(store, LoadLog::default())
    }

    #[must_use]
    pub fn with_log(store: &'a dyn ObjectStore, log: LoadLog) -> Self {
        Self { store, log }
    }

    #[must_use]
    pub fn log(&self) -> &LoadLog {
        &self.log
    }

    pub fn log_mut(&mut self) -> &mut LoadLog {
        &mut self.log
    }

    #[must_use]
    pub fn into_log(self) -> LoadLog {
        self.log
    }

    pub fn load(&mut self, location: &SourceLocation, options: &LoadOptions) -> Result<LoadBatch> {
        self.log.info(format!(
            "loading from bucket: {}, prefix: {}",
            location.bucket,
            if location.prefix.is_empty() {
                "None"
            } else {
                location.prefix.as_str()
            }
        ));

        let keys = list_all_keys(self.store, &location.prefix)?;
        let plan = plan_objects(&keys);
        let mut batch = LoadBatch {
            objects_listed: keys.len(),
            skipped_keys: plan.skipped_keys,
            ..LoadBatch::default()
        };

        for object in plan.objects {
            match self.load_object(&object, options) {
                Ok(source) => {
                    self.log.info(format!(
                        "processed {} ({} rows)",
                        object.key,
                        source.table.len()
                    ));
                    batch.sources.push(source);
                }
                Err(error) => {
                    self.log
                        .error(format!("failed {}: {error}", object.key));
                    batch.failures.push(ObjectFailure {
                        key: object.key,
                        stage: error.stage(),
                        reason: error.to_string(),
                    });
                }
            }
        }

        Ok(batch)
    }

    fn load_object(
        &mut self,
        object: &DiscoveredObject,
        options: &LoadOptions,
    ) -> Result<DecodedSource, ObjectError> {
        let payload = self
            .store
            .get_object(&object.key)
            .map_err(ObjectError::Fetch)?;

        if let Some(raw_dir) = &options.raw_dir {
            match raw_copy_path(raw_dir, &object.key) {
                Some(raw_path) => {
                    if let Err(error) = write_file_atomic(&raw_path, &payload) {
                        self.log.warn(format!(
                            "could not keep raw copy of {}: {error:#}",
                            object.key
                        ));
                    }
                }
                None => self.log.warn(format!(
                    "could not keep raw copy of {}: key leaves the raw directory",
                    object.key
                )),
            }
        }

        let mut table = decode_payload(object.format, &payload)?;
        table.set_constant_column(SOURCE_FILE_COLUMN, &object.file_name);

        Ok(DecodedSource {
            key: object.key.clone(),
            file_name: object.file_name.clone(),
            format: object.format,
            table,
        })
    }
}

// Raw copies mirror the full object key under `raw_dir`.
fn raw_copy_path(raw_dir: &Path, key: &str) -> Option<PathBuf> {
    let mut path = raw_dir.to_path_buf();
    for segment in key.split('/').filter(|segment| !segment.is_empty() && *segment != ".") {
        if segment == ".." {
            return None;
        }
        path.push(segment);
    }
    (path.as_path() != raw_dir).then_some(path)
}
