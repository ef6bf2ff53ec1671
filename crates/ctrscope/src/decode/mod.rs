pub mod csv;
pub mod json;
pub mod parquet;

use thiserror::Error;

use crate::discovery::SourceFormat;
use crate::models::RecordTable;

#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("csv decode failed: {0}")]
    Csv(#[from] ::csv::Error),
    #[error("parquet decode failed: {0}")]
    Parquet(#[from] ::parquet::errors::ParquetError),
    #[error("arrow conversion failed: {0}")]
    Arrow(#[from] ::arrow::error::ArrowError),
    #[error("json decode failed: {0}")]
    Json(#[from] serde_json::Error),
    #[error("payload is not valid utf-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),
    #[error("unexpected payload shape: {0}")]
    Shape(String),
}

// Shared by every decoder.
pub(crate) fn column_name(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

pub fn decode_payload(format: SourceFormat, payload: &[u8]) -> Result<RecordTable, DecodeError> {
    match format {
        SourceFormat::Csv => csv::decode_csv(payload),
        SourceFormat::Parquet => parquet::decode_parquet(payload),
        SourceFormat::Json => json::decode_json(payload),
    }
}
