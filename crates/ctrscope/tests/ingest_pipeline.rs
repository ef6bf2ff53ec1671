use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use arrow::array::{ArrayRef, Int64Array, StringArray, StructArray, TimestampMillisecondArray};
use arrow::datatypes::{DataType, Field};
use arrow::record_batch::RecordBatch;
use ctrscope::config::SourceLocation;
use ctrscope::consolidate::{consolidate, run_load};
use ctrscope::ingest::{FailureStage, LoadLog, LoadOptions, Loader, LogLevel};
use ctrscope::locate::locate_in_table;
use ctrscope::metrics::{DerivationOptions, derive_metrics};
use ctrscope::models::{AGENT_COLUMN, CONTACT_ID_COLUMN, SOURCE_FILE_COLUMN};
use ctrscope::remote::{DirectoryObjectStore, MemoryObjectStore};
use ctrscope::storage::{CsvWriteOptions, canonical_table_path, read_table};
use parquet::arrow::ArrowWriter;

const THREE_ROW_CSV: &str = "\
contactid,channel,initiationtimestamp,connectedtosystemtimestamp,disconnecttimestamp,lastupdatetimestamp
a-1,VOICE,2024-03-01T10:00:00Z,2024-03-01T10:00:02Z,2024-03-01T10:04:00Z,2024-03-01T10:05:00Z
a-2,CHAT,2024-03-01T11:00:00Z,2024-03-01T11:00:01Z,2024-03-01T11:09:00Z,2024-03-01T11:10:00Z
a-3,VOICE,2024-03-02T09:00:00Z,2024-03-02T09:00:07Z,2024-03-02T09:30:00Z,2024-03-02T09:31:00Z
";

fn unique_temp_dir(prefix: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time should be after unix epoch")
        .as_nanos();
    std::env::temp_dir().join(format!("{prefix}-{nanos}"))
}

fn two_row_parquet() -> Vec<u8> {
    let agent = StructArray::from(vec![
        (
            Arc::new(Field::new(
                "agentinteractionduration",
                DataType::Int64,
                true,
            )),
            Arc::new(Int64Array::from(vec![Some(45), Some(12)])) as ArrayRef,
        ),
        (
            Arc::new(Field::new(
                "aftercontactworkduration",
                DataType::Int64,
                true,
            )),
            Arc::new(Int64Array::from(vec![None, Some(3)])) as ArrayRef,
        ),
    ]);
    let strings = |values: [&str; 2]| Arc::new(StringArray::from(values.to_vec())) as ArrayRef;
    let batch = RecordBatch::try_from_iter(vec![
        ("contactid", strings(["p-1", "p-2"])),
        ("channel", strings(["VOICE", "VOICE"])),
        (
            "initiationtimestamp",
            strings(["2024-03-03T08:00:00Z", "2024-03-03T08:10:00Z"]),
        ),
        (
            "connectedtosystemtimestamp",
            strings(["2024-03-03T08:00:04Z", "2024-03-03T08:10:01Z"]),
        ),
        (
            "disconnecttimestamp",
            strings(["2024-03-03T08:06:00Z", "2024-03-03T08:12:00Z"]),
        ),
        (
            "lastupdatetimestamp",
            strings(["2024-03-03T08:07:00Z", "2024-03-03T08:13:00Z"]),
        ),
        ("agent", Arc::new(agent) as ArrayRef),
    ])
    .expect("record batch should build");

    let mut buffer = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buffer, batch.schema(), None).expect("writer should open");
    writer.write(&batch).expect("batch should write");
    writer.close().expect("writer should close");
    buffer
}

// pandas writes `datetime64[ns, UTC]` columns with a named zone.
fn utc_timestamp_parquet() -> Vec<u8> {
    let millis = |values: [i64; 1]| {
        Arc::new(TimestampMillisecondArray::from(values.to_vec()).with_timezone("UTC")) as ArrayRef
    };
    let batch = RecordBatch::try_from_iter(vec![
        (
            "ContactId",
            Arc::new(StringArray::from(vec!["c-parquet"])) as ArrayRef,
        ),
        (
            "Channel",
            Arc::new(StringArray::from(vec!["VOICE"])) as ArrayRef,
        ),
        ("InitiationTimestamp", millis([1_709_287_200_000])),
        ("ConnectedToSystemTimestamp", millis([1_709_287_202_500])),
        ("LastUpdateTimestamp", millis([1_709_287_500_000])),
    ])
    .expect("record batch should build");

    let mut buffer = Vec::new();
    let mut writer =
        ArrowWriter::try_new(&mut buffer, batch.schema(), None).expect("writer should open");
    writer.write(&batch).expect("batch should write");
    writer.close().expect("writer should close");
    buffer
}

fn mixed_store() -> MemoryObjectStore {
    let mut store = MemoryObjectStore::new();
    store.insert("connect/ctr/2024/03/part-0.csv", THREE_ROW_CSV);
    store.insert("connect/ctr/2024/03/part-1.parquet", two_row_parquet());
    store.insert("connect/ctr/2024/03/_SUCCESS", "");
    store
}

fn location(prefix: &str) -> SourceLocation {
    SourceLocation {
        bucket: "ctr-exports".to_string(),
        prefix: prefix.to_string(),
    }
}

#[test]
fn csv_and_parquet_sources_merge_into_one_canonical_table() {
    let data_dir = unique_temp_dir("ctrscope-ingest-mixed");
    let store = mixed_store();
    let mut loader = Loader::new(&store);

    let run = run_load(
        &mut loader,
        &location("connect/ctr/"),
        &data_dir,
        &LoadOptions::default(),
        &CsvWriteOptions::default(),
    )
    .expect("load should succeed");

    assert_eq!(run.outcome.table.len(), 5);
    assert_eq!(run.batch.success_count(), 2);
    assert!(!run.outcome.no_file_found);
    assert_eq!(run.batch.skipped_keys, vec!["connect/ctr/2024/03/_SUCCESS"]);
    assert_eq!(run.report.counts.objects_listed, 3);
    assert_eq!(run.report.counts.rows_merged, 5);

    let table = &run.outcome.table;
    assert_eq!(table.value(0, SOURCE_FILE_COLUMN), Some("part-0.csv"));
    assert_eq!(table.value(3, SOURCE_FILE_COLUMN), Some("part-1.parquet"));
    assert_eq!(table.value(0, AGENT_COLUMN), None);
    assert_eq!(
        table.value(3, AGENT_COLUMN),
        Some("{agentinteractionduration=45, aftercontactworkduration=None}")
    );

    let reloaded =
        read_table(&canonical_table_path(&data_dir), b',').expect("canonical table should load");
    assert_eq!(reloaded.len(), 5);
    let mut persisted_columns = reloaded.columns().to_vec();
    let mut merged_columns = table.columns().to_vec();
    persisted_columns.sort();
    merged_columns.sort();
    assert_eq!(persisted_columns, merged_columns);
}

#[test]
fn empty_prefix_reports_no_file_found() {
    let data_dir = unique_temp_dir("ctrscope-ingest-empty");
    let store = mixed_store();
    let mut loader = Loader::new(&store);

    let run = run_load(
        &mut loader,
        &location("connect/agent-events/"),
        &data_dir,
        &LoadOptions::default(),
        &CsvWriteOptions::default(),
    )
    .expect("empty load should still succeed");

    assert_eq!(run.outcome.table.len(), 0);
    assert_eq!(run.batch.success_count(), 0);
    assert!(run.outcome.no_file_found);
    assert!(run.report.no_file_found);
    assert!(canonical_table_path(&data_dir).is_file());

    let log = loader.into_log();
    let last = log.entries().last().expect("log should not be empty");
    assert_eq!(last.level, LogLevel::Warn);
    assert_eq!(last.message, "no files found.");
}

#[test]
fn undecodable_object_is_logged_and_skipped() {
    let data_dir = unique_temp_dir("ctrscope-ingest-corrupt");
    let mut store = mixed_store();
    store.insert("connect/ctr/2024/03/part-2.parquet", "not parquet at all");
    let mut loader = Loader::new(&store);

    let run = run_load(
        &mut loader,
        &location("connect/ctr/"),
        &data_dir,
        &LoadOptions::default(),
        &CsvWriteOptions::default(),
    )
    .expect("a bad object must not fail the load");

    assert_eq!(run.batch.success_count(), 2);
    assert_eq!(run.outcome.table.len(), 5);
    assert_eq!(run.batch.failures.len(), 1);
    let failure = &run.batch.failures[0];
    assert_eq!(failure.key, "connect/ctr/2024/03/part-2.parquet");
    assert_eq!(failure.stage, FailureStage::Decode);
    assert_eq!(run.report.counts.objects_failed, 1);

    let log = loader.into_log();
    assert!(log.entries().any(|entry| {
        entry.level == LogLevel::Error
            && entry
                .message
                .starts_with("failed connect/ctr/2024/03/part-2.parquet:")
    }));
    assert!(
        log.messages()
            .contains(&"files loaded from bucket: 2".to_string())
    );
}

#[test]
fn every_listing_page_is_consumed() {
    let mut store = MemoryObjectStore::new().with_page_size(1);
    for index in 0..4 {
        store.insert(
            format!("ctr/part-{index}.csv"),
            "contactid,channel\nc,VOICE\n",
        );
    }
    let mut loader = Loader::new(&store);

    let batch = loader
        .load(&location("ctr/"), &LoadOptions::default())
        .expect("load should succeed");

    assert_eq!(batch.objects_listed, 4);
    assert_eq!(batch.success_count(), 4);
    assert_eq!(batch.rows_decoded(), 4);
}

#[test]
fn repeated_load_overwrites_instead_of_accumulating() {
    let data_dir = unique_temp_dir("ctrscope-ingest-idempotent");
    let store = mixed_store();

    let mut counts = Vec::new();
    for _ in 0..2 {
        let mut loader = Loader::new(&store);
        run_load(
            &mut loader,
            &location("connect/ctr/"),
            &data_dir,
            &LoadOptions::default(),
            &CsvWriteOptions::default(),
        )
        .expect("load should succeed");
        let persisted = read_table(&canonical_table_path(&data_dir), b',')
            .expect("canonical table should load");
        counts.push(persisted.len());
    }

    assert_eq!(counts, vec![5, 5]);
}

#[test]
fn directory_store_keeps_raw_copies_when_asked() {
    let root = unique_temp_dir("ctrscope-ingest-raw");
    let bucket = root.join("ctr-exports");
    let data_dir = root.join("CTRs");
    std::fs::create_dir_all(bucket.join("daily")).expect("bucket should be creatable");
    std::fs::write(bucket.join("daily").join("export.json"), {
        r#"[{"ContactId": "j-1", "Channel": "CHAT", "Agent": null},
            {"ContactId": "j-2", "Channel": "VOICE", "Agent": {"AgentInteractionDuration": 30, "AfterContactWorkDuration": null}}]"#
    })
    .expect("fixture should be writable");
    std::fs::create_dir_all(bucket.join("weekly")).expect("bucket should be creatable");
    std::fs::write(
        bucket.join("weekly").join("export.json"),
        r#"{"ContactId": "w-1", "Channel": "VOICE"}"#,
    )
    .expect("fixture should be writable");

    let store = DirectoryObjectStore::open(&bucket).expect("bucket should open");
    let mut loader = Loader::with_log(&store, LoadLog::with_capacity(2));
    let options = LoadOptions {
        raw_dir: Some(data_dir.join("raw")),
    };

    let run = run_load(
        &mut loader,
        &location(""),
        &data_dir,
        &options,
        &CsvWriteOptions::default(),
    )
    .expect("load should succeed");

    let raw_dir = data_dir.join("raw");
    let daily_copy = std::fs::read_to_string(raw_dir.join("daily").join("export.json"))
        .expect("daily raw copy should exist");
    let weekly_copy = std::fs::read_to_string(raw_dir.join("weekly").join("export.json"))
        .expect("weekly raw copy should exist");
    assert!(daily_copy.contains("j-1"));
    assert!(weekly_copy.contains("w-1"));
    assert_eq!(run.batch.success_count(), 2);
    assert_eq!(run.outcome.table.value(2, "contactid"), Some("w-1"));
    assert_eq!(run.outcome.table.value(0, "contactid"), Some("j-1"));
    assert_eq!(run.outcome.table.value(0, "agent"), None);
    let agent = run
        .outcome
        .table
        .value(1, "agent")
        .expect("nested agent should render");
    assert!(agent.starts_with('{') && agent.ends_with('}'));
    assert!(agent.contains("agentinteractionduration=30"));
    assert!(agent.contains("aftercontactworkduration=None"));

    let log = loader.into_log();
    assert_eq!(log.len(), 2);
    assert!(log.dropped() > 0);
}

#[test]
fn mixed_case_headers_merge_into_one_contact_column() {
    let mut store = MemoryObjectStore::new();
    store.insert(
        "ctr/a.csv",
        "ContactId,Channel,InitiationTimestamp,ConnectedToSystemTimestamp,LastUpdateTimestamp\n\
         c-csv,CHAT,2024-03-01T09:00:00Z,2024-03-01T09:00:01Z,2024-03-01T09:05:00Z\n",
    );
    store.insert("ctr/b.parquet", utc_timestamp_parquet());
    store.insert("ctr/c.json", r#"[{"ContactId": "c-json", "Channel": "TASK"}]"#);
    let mut loader = Loader::new(&store);

    let batch = loader
        .load(&location("ctr/"), &LoadOptions::default())
        .expect("load should succeed");
    assert!(batch.failures.is_empty(), "{:?}", batch.failures);
    assert_eq!(batch.success_count(), 3);

    let table = consolidate(&batch.sources);
    assert_eq!(
        table
            .columns()
            .iter()
            .filter(|column| column.eq_ignore_ascii_case(CONTACT_ID_COLUMN))
            .count(),
        1
    );
    let ids = (0..table.len())
        .map(|row| table.value(row, CONTACT_ID_COLUMN))
        .collect::<Vec<_>>();
    assert_eq!(ids, vec![Some("c-csv"), Some("c-parquet"), Some("c-json")]);

    let (found, warnings) = locate_in_table(table.clone(), Some("c-parquet"));
    assert!(warnings.is_empty());
    assert_eq!(found.len(), 1);

    let outcome = derive_metrics(&table, &DerivationOptions::default());
    let parquet_record = outcome
        .records
        .iter()
        .find(|record| record.contactid.as_deref() == Some("c-parquet"))
        .expect("parquet contact should survive derivation");
    assert_eq!(parquet_record.delay_seconds, Some(2.5));
}
