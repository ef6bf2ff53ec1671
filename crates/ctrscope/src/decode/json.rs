use serde_json::{Map, Value};

use super::{DecodeError, column_name};
use crate::models::{Cell, RecordTable};

pub fn decode_json(payload: &[u8]) -> Result<RecordTable, DecodeError> {
    let text = std::str::from_utf8(payload)?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let records = match serde_json::from_str::<Value>(text) {
        Ok(Value::Array(items)) => items,
        Ok(object @ Value::Object(_)) => vec![object],
        Ok(other) => {
            return Err(DecodeError::Shape(format!(
                "json root must be an array or object, found {}",
                value_kind(&other)
            )));
        }
        Err(document_error) => {
            parse_json_lines(text).map_err(|_| DecodeError::Json(document_error))?
        }
    };

    let mut rows = Vec::with_capacity(records.len());
    for (index, record) in records.into_iter().enumerate() {
        let Value::Object(object) = record else {
            return Err(DecodeError::Shape(format!(
                "record {} is not an object",
                index + 1
            )));
        };
        rows.push(flatten_record(object));
    }

    Ok(RecordTable::from_records(rows, Vec::new()))
}

fn parse_json_lines(text: &str) -> Result<Vec<Value>, serde_json::Error> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(serde_json::from_str::<Value>)
        .collect()
}

fn flatten_record(object: Map<String, Value>) -> Vec<(String, Cell)> {
    object
        .into_iter()
        .map(|(key, value)| (column_name(&key), render_cell(value)))
        .collect()
}

fn render_cell(value: Value) -> Cell {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text),
        other => Some(render_nested(&other)),
    }
}

pub(crate) fn render_nested(value: &Value) -> String {
    match value {
        Value::Null => "None".to_string(),
        Value::String(text) => text.clone(),
        Value::Bool(flag) => flag.to_string(),
        Value::Number(number) => number.to_string(),
        Value::Array(_) => value.to_string(),
        Value::Object(object) => {
            let pairs = object
                .iter()
                .map(|(key, nested)| format!("{}={}", key.to_ascii_lowercase(), render_nested(nested)))
                .collect::<Vec<_>>();
            format!("{{{}}}", pairs.join(", "))
        }
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
