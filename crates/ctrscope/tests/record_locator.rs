use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use ctrscope::locate::{load_canonical_table, locate, locate_in_table};
use ctrscope::models::RecordTable;
use ctrscope::storage::{CsvWriteOptions, canonical_table_path, write_table};

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}"))
}

fn ten_row_table() -> RecordTable {
    let mut table = RecordTable::new(vec!["contactid".to_string(), "channel".to_string()]);
    for index in 0..10 {
        let contact_id = if index == 7 {
            "Contact-3".to_string()
        } else {
            format!("contact-{}", index % 5)
        };
        table.push_row(vec![Some(contact_id), Some("VOICE".to_string())]);
    }
    table
}

fn persisted_data_dir(prefix: &str, table: &RecordTable) -> PathBuf {
    let data_dir = unique_temp_dir(prefix);
    write_table(
        table,
        &canonical_table_path(&data_dir),
        &CsvWriteOptions::default(),
    )
    .expect("canonical table should be writable");
    data_dir
}

#[test]
fn empty_or_unset_id_browses_all_rows() {
    let data_dir = persisted_data_dir("ctrscope-locate-browse", &ten_row_table());

    for contact_id in [None, Some("")] {
        let outcome = locate(&data_dir, contact_id);
        assert!(outcome.backing_found);
        assert!(outcome.warnings.is_empty());
        assert_eq!(outcome.rows.len(), 10);
    }
}

#[test]
fn lookup_is_exact_and_case_sensitive() {
    let data_dir = persisted_data_dir("ctrscope-locate-exact", &ten_row_table());

    let outcome = locate(&data_dir, Some("contact-3"));
    assert_eq!(outcome.rows.len(), 2);
    assert!(
        outcome
            .rows
            .rows()
            .iter()
            .all(|row| row[0].as_deref() == Some("contact-3"))
    );

    assert_eq!(locate(&data_dir, Some("Contact-3")).rows.len(), 1);
    assert_eq!(locate(&data_dir, Some("contact")).rows.len(), 0);
}

#[test]
fn missing_backing_file_warns_and_returns_empty() {
    let data_dir = unique_temp_dir("ctrscope-locate-missing");

    let outcome = locate(&data_dir, Some("contact-1"));
    assert!(!outcome.backing_found);
    assert!(outcome.rows.is_empty());
    assert_eq!(outcome.warnings.len(), 1);
    assert!(outcome.warnings[0].contains("ctrscope load"));

    assert!(load_canonical_table(&data_dir).rows.is_empty());
}

#[test]
fn missing_contact_column_returns_unfiltered_rows() {
    let mut table = RecordTable::new(vec!["channel".to_string()]);
    table.push_row(vec![Some("VOICE".to_string())]);
    table.push_row(vec![Some("CHAT".to_string())]);

    let (rows, warnings) = locate_in_table(table, Some("contact-1"));
    assert_eq!(rows.len(), 2);
    assert_eq!(warnings.len(), 1);
    assert!(warnings[0].contains("`contactid` not found"));
}
