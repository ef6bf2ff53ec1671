use anyhow::Result;

use crate::metrics::{DerivedMetricsRecord, METRIC_COLUMNS};
use crate::storage::{CsvWriteOptions, encode_rows};

pub const FULL_EXPORT_FILE_NAME: &str = "contact_delay_analysis.csv";

// Downloads keep floats at full precision.
#[must_use]
pub fn download_options() -> CsvWriteOptions {
    CsvWriteOptions {
        float_precision: None,
        ..CsvWriteOptions::default()
    }
}

pub fn export_csv(records: &[DerivedMetricsRecord], options: &CsvWriteOptions) -> Result<Vec<u8>> {
    let header = METRIC_COLUMNS
        .iter()
        .map(|column| (*column).to_string())
        .collect::<Vec<_>>();
    encode_rows(
        &header,
        records.iter().map(DerivedMetricsRecord::csv_values),
        options,
    )
}

#[must_use]
pub fn threshold_export_file_name(threshold_seconds: f64) -> String {
    format!(
        "contacts_with_delay_over_{}s.csv",
        format_threshold(threshold_seconds)
    )
}

#[must_use]
pub fn export_file_name(threshold_seconds: Option<f64>) -> String {
    threshold_seconds.map_or_else(
        || FULL_EXPORT_FILE_NAME.to_string(),
        threshold_export_file_name,
    )
}

// Always at least one decimal place: 5 -> "5.0", 2.5 -> "2.5".
fn format_threshold(value: f64) -> String {
    let rendered = value.to_string();
    if value.is_finite() && !rendered.contains(['.', 'e', 'E']) {
        format!("{rendered}.0")
    } else {
        rendered
    }
}

