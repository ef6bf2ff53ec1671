use std::path::Path;

use serde::Serialize;
use tracing::warn;

use crate::models::{CONTACT_ID_COLUMN, RecordTable};
use crate::storage::{canonical_table_path, read_table};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LocateOutcome {
    pub rows: RecordTable,
    pub warnings: Vec<String>,
    pub backing_found: bool,
}

#[must_use]
pub fn load_canonical_table(data_dir: &Path) -> LocateOutcome {
    let path = canonical_table_path(data_dir);
    if !path.is_file() {
        let message = format!(
            "no data found at {}; run `ctrscope load` first",
            path.display()
        );
        warn!("{message}");
        return LocateOutcome {
            warnings: vec![message],
            ..LocateOutcome::default()
        };
    }

    match read_table(&path, b',') {
        Ok(rows) => LocateOutcome {
            rows,
            warnings: Vec::new(),
            backing_found: true,
        },
        Err(error) => {
            let message = format!("could not read {}: {error:#}", path.display());
            warn!("{message}");
            LocateOutcome {
                warnings: vec![message],
                backing_found: true,
                ..LocateOutcome::default()
            }
        }
    }
}

#[must_use]
pub fn locate(data_dir: &Path, contact_id: Option<&str>) -> LocateOutcome {
    let mut outcome = load_canonical_table(data_dir);
    if !outcome.backing_found || !outcome.warnings.is_empty() {
        return outcome;
    }
    let (rows, warnings) = locate_in_table(outcome.rows, contact_id);
    outcome.rows = rows;
    outcome.warnings.extend(warnings);
    outcome
}

pub fn locate_in_table(table: RecordTable, contact_id: Option<&str>) -> (RecordTable, Vec<String>) {
    let Some(contact_id) = contact_id.filter(|id| !id.is_empty()) else {
        return (table, Vec::new());
    };
    let Some(column) = table.column_index(CONTACT_ID_COLUMN) else {
        let message =
            format!("column `{CONTACT_ID_COLUMN}` not found; returning all rows unfiltered");
        warn!("{message}");
        return (table, vec![message]);
    };

    let filtered = table.filter_rows(|row| row[column].as_deref() == Some(contact_id));
    (filtered, Vec::new())
}
