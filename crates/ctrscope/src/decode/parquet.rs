use arrow::array::{Array, StructArray};
use arrow::record_batch::RecordBatch;
use arrow::util::display::{ArrayFormatter, FormatOptions};
use bytes::Bytes;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::{DecodeError, column_name};
use crate::models::{Cell, RecordTable};

pub fn decode_parquet(payload: &[u8]) -> Result<RecordTable, DecodeError> {
    let reader =
        ParquetRecordBatchReaderBuilder::try_new(Bytes::copy_from_slice(payload))?.build()?;

    let mut table: Option<RecordTable> = None;
    for batch in reader {
        let batch = batch?;
        let target = table.get_or_insert_with(|| RecordTable::new(column_names(&batch)));
        append_batch(target, &batch)?;
    }

    Ok(table.unwrap_or_default())
}

fn column_names(batch: &RecordBatch) -> Vec<String> {
    batch
        .schema()
        .fields()
        .iter()
        .map(|field| column_name(field.name()))
        .collect()
}

fn append_batch(table: &mut RecordTable, batch: &RecordBatch) -> Result<(), DecodeError> {
    let columns = batch.columns();
    let mut rendered: Vec<Vec<Cell>> = Vec::with_capacity(columns.len());
    for column in columns {
        rendered.push(render_column(column.as_ref())?);
    }

    for row in 0..batch.num_rows() {
        table.push_row(rendered.iter().map(|cells| cells[row].clone()).collect());
    }
    Ok(())
}

fn render_column(array: &dyn Array) -> Result<Vec<Cell>, DecodeError> {
    if let Some(structs) = array.as_any().downcast_ref::<StructArray>() {
        return (0..structs.len())
            .map(|row| {
                if structs.is_null(row) {
                    Ok(None)
                } else {
                    render_struct(structs, row).map(Some)
                }
            })
            .collect();
    }

    let options = FormatOptions::default();
    let formatter = ArrayFormatter::try_new(array, &options)?;
    Ok((0..array.len())
        .map(|row| (!array.is_null(row)).then(|| formatter.value(row).to_string()))
        .collect())
}

fn render_struct(structs: &StructArray, row: usize) -> Result<String, DecodeError> {
    let mut pairs = Vec::with_capacity(structs.num_columns());
    for (name, child) in structs.column_names().into_iter().zip(structs.columns()) {
        let value = if child.is_null(row) {
            "None".to_string()
        } else if let Some(nested) = child.as_any().downcast_ref::<StructArray>() {
            render_struct(nested, row)?
        } else {
            let options = FormatOptions::default();
            ArrayFormatter::try_new(child.as_ref(), &options)?
                .value(row)
                .to_string()
        };
        pairs.push(format!("{}={value}", name.to_ascii_lowercase()));
    }
    Ok(format!("{{{}}}", pairs.join(", ")))
}
