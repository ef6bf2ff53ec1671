use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use csv::{QuoteStyle, WriterBuilder};
use serde::Serialize;
use time::Date;

use crate::decode::csv::decode_csv_with_delimiter;
use crate::models::RecordTable;
use crate::utils::time::format_date_pattern;

pub const CANONICAL_FILE_NAME: &str = "ctr_data.csv";
pub const RAW_SOURCES_DIR: &str = "raw";

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CsvEncoding {
    Utf8,
    Utf8Bom,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CsvQuoting {
    Minimal,
    Always,
    NonNumeric,
    Never,
}

impl CsvQuoting {
    const fn quote_style(self) -> QuoteStyle {
        match self {
            Self::Minimal => QuoteStyle::Necessary,
            Self::Always => QuoteStyle::Always,
            Self::NonNumeric => QuoteStyle::NonNumeric,
            Self::Never => QuoteStyle::Never,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CsvWriteOptions {
    pub delimiter: u8,
    pub encoding: CsvEncoding,
    /// Decimal places for float cells; `None` writes the shortest round-trip form
    /// and keeps a trailing `.0` on whole numbers.
    pub float_precision: Option<usize>,
    pub date_format: String,
    pub null_repr: String,
    pub quoting: CsvQuoting,
}

impl Default for CsvWriteOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            encoding: CsvEncoding::Utf8,
            float_precision: Some(2),
            date_format: "%Y-%m-%d".to_string(),
            null_repr: String::new(),
            quoting: CsvQuoting::Minimal,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CsvValue {
    Null,
    Text(String),
    Integer(i64),
    Float(f64),
    Date(Date),
}

impl CsvValue {
    fn render(&self, options: &CsvWriteOptions) -> String {
        match self {
            Self::Null => options.null_repr.clone(),
            Self::Text(text) => text.clone(),
            Self::Integer(value) => value.to_string(),
            Self::Float(value) if value.is_nan() => options.null_repr.clone(),
            Self::Float(value) => match options.float_precision {
                Some(precision) => format!("{value:.precision$}"),
                None => format!("{value:?}"),
            },
            Self::Date(date) => format_date_pattern(*date, &options.date_format),
        }
    }
}

impl From<Option<&str>> for CsvValue {
    fn from(value: Option<&str>) -> Self {
        value.map_or(Self::Null, |text| Self::Text(text.to_string()))
    }
}

impl From<Option<i64>> for CsvValue {
    fn from(value: Option<i64>) -> Self {
        value.map_or(Self::Null, Self::Integer)
    }
}

impl From<Option<f64>> for CsvValue {
    fn from(value: Option<f64>) -> Self {
        value.map_or(Self::Null, Self::Float)
    }
}

impl From<Option<Date>> for CsvValue {
    fn from(value: Option<Date>) -> Self {
        value.map_or(Self::Null, Self::Date)
    }
}

#[must_use]
pub fn canonical_table_path(data_dir: &Path) -> PathBuf {
    data_dir.join(CANONICAL_FILE_NAME)
}

#[must_use]
pub fn raw_sources_dir(data_dir: &Path) -> PathBuf {
    data_dir.join(RAW_SOURCES_DIR)
}

pub fn encode_rows<I>(header: &[String], rows: I, options: &CsvWriteOptions) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = Vec<CsvValue>>,
{
    let mut buffer = Vec::new();
    if options.encoding == CsvEncoding::Utf8Bom {
        buffer.extend_from_slice(UTF8_BOM);
    }

    let mut writer = WriterBuilder::new()
        .delimiter(options.delimiter)
        .quote_style(options.quoting.quote_style())
        .from_writer(buffer);

    if !header.is_empty() {
        writer
            .write_record(header)
            .context("failed to encode csv header")?;
    }
    for (index, row) in rows.into_iter().enumerate() {
        if row.len() != header.len() {
            bail!(
                "csv row {} has {} cells, expected {}",
                index + 1,
                row.len(),
                header.len()
            );
        }
        writer
            .write_record(row.iter().map(|cell| cell.render(options)))
            .with_context(|| format!("failed to encode csv row {}", index + 1))?;
    }

    writer
        .into_inner()
        .map_err(|error| anyhow::anyhow!("failed to flush csv writer: {}", error.error()))
}

pub fn encode_table(table: &RecordTable, options: &CsvWriteOptions) -> Result<Vec<u8>> {
    let rows = table.rows().iter().map(|row| {
        row.iter()
            .map(|cell| CsvValue::from(cell.as_deref()))
            .collect::<Vec<_>>()
    });
    encode_rows(table.columns(), rows, options)
}

pub fn write_table(table: &RecordTable, path: &Path, options: &CsvWriteOptions) -> Result<()> {
    let encoded = encode_table(table, options)?;
    write_file_atomic(path, &encoded)
}

pub fn read_table(path: &Path, delimiter: u8) -> Result<RecordTable> {
    let payload =
        std::fs::read(path).with_context(|| format!("failed to read table: {}", path.display()))?;
    if payload.iter().all(u8::is_ascii_whitespace) {
        return Ok(RecordTable::empty());
    }
    decode_csv_with_delimiter(&payload, delimiter)
        .with_context(|| format!("failed to decode table: {}", path.display()))
}

pub fn write_file_atomic(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory: {}", parent.display()))?;
    }

    let temp = temp_path(path);
    std::fs::write(&temp, content)
        .with_context(|| format!("failed to write temp file: {}", temp.display()))?;
    if let Err(error) = std::fs::rename(&temp, path) {
        let _ = std::fs::remove_file(&temp);
        return Err(error).with_context(|| format!("failed to replace file: {}", path.display()));
    }
    Ok(())
}

fn temp_path(final_path: &Path) -> PathBuf {
    let file_name = final_path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("file");
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map_or(0, |duration| duration.as_nanos() as u64);
    final_path.with_file_name(format!(
        ".tmp.{:x}.{nanos:016x}.{file_name}",
        std::process::id()
    ))
}
