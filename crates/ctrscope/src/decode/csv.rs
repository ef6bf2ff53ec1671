use csv::ReaderBuilder;

use super::{DecodeError, column_name};
use crate::models::RecordTable;

pub const DEFAULT_DELIMITER: u8 = b',';

pub fn decode_csv(payload: &[u8]) -> Result<RecordTable, DecodeError> {
    decode_csv_with_delimiter(payload, DEFAULT_DELIMITER)
}

pub fn decode_csv_with_delimiter(payload: &[u8], delimiter: u8) -> Result<RecordTable, DecodeError> {
    let payload = payload.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(payload);
    let mut reader = ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .flexible(false)
        .from_reader(payload);

    let headers = reader
        .headers()?
        .iter()
        .map(column_name)
        .collect::<Vec<_>>();
    if headers.iter().all(String::is_empty) {
        return Err(DecodeError::Shape("csv payload has no header row".to_string()));
    }

    let mut table = RecordTable::new(headers);
    for record in reader.records() {
        let record = record?;
        let row = record
            .iter()
            .map(|cell| (!cell.is_empty()).then(|| cell.to_string()))
            .collect();
        table.push_row(row);
    }

    Ok(table)
}
