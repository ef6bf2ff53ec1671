use ctrscope::export::{download_options, export_csv, export_file_name};
use ctrscope::metrics::{DerivedMetricsRecord, METRIC_COLUMNS};
use ctrscope::storage::{CsvEncoding, CsvQuoting, CsvWriteOptions};
use time::macros::date;

fn answered_call() -> DerivedMetricsRecord {
    DerivedMetricsRecord {
        contactid: Some("c-1".to_string()),
        channel: Some("VOICE".to_string()),
        initiationtimestamp: Some("2024-03-01T10:00:00Z".to_string()),
        connectedtosystemtimestamp: Some("2024-03-01T10:00:02Z".to_string()),
        disconnecttimestamp: Some("2024-03-01T10:04:00Z".to_string()),
        lastupdatetimestamp: Some("2024-03-01T10:05:00Z".to_string()),
        delay_seconds: Some(2.0),
        agentinteractionduration_seconds: Some(45),
        aftercontactworkduration_seconds: Some(0),
        contactduration_seconds: Some(240.0),
        date: Some(date!(2024 - 03 - 01)),
        sourcefile: Some("part-0.csv".to_string()),
    }
}

fn sparse_chat() -> DerivedMetricsRecord {
    DerivedMetricsRecord {
        contactid: Some("c-2".to_string()),
        channel: Some("CHAT, web".to_string()),
        initiationtimestamp: None,
        connectedtosystemtimestamp: None,
        disconnecttimestamp: None,
        lastupdatetimestamp: None,
        delay_seconds: Some(-1.5),
        agentinteractionduration_seconds: None,
        aftercontactworkduration_seconds: None,
        contactduration_seconds: None,
        date: None,
        sourcefile: None,
    }
}

#[test]
fn default_export_matches_snapshot() {
    let encoded = export_csv(
        &[answered_call(), sparse_chat()],
        &CsvWriteOptions::default(),
    )
    .expect("export should encode");
    let text = String::from_utf8(encoded).expect("export should be utf-8");

    insta::assert_snapshot!(text, @r#"
    contactid,channel,initiationtimestamp,connectedtosystemtimestamp,disconnecttimestamp,lastupdatetimestamp,delay_seconds,agentinteractionduration_seconds,aftercontactworkduration_seconds,contactduration_seconds,date,sourcefile
    c-1,VOICE,2024-03-01T10:00:00Z,2024-03-01T10:00:02Z,2024-03-01T10:04:00Z,2024-03-01T10:05:00Z,2.00,45,0,240.00,2024-03-01,part-0.csv
    c-2,"CHAT, web",,,,,-1.50,,,,,
    "#);
}

#[test]
fn writer_options_are_honoured() {
    let options = CsvWriteOptions {
        delimiter: b';',
        encoding: CsvEncoding::Utf8Bom,
        float_precision: Some(1),
        date_format: "%d/%m/%Y".to_string(),
        null_repr: "NULL".to_string(),
        quoting: CsvQuoting::Always,
    };

    let encoded = export_csv(&[answered_call(), sparse_chat()], &options)
        .expect("export should encode");
    assert!(encoded.starts_with(b"\xEF\xBB\xBF"));

    let text = String::from_utf8(encoded[3..].to_vec()).expect("export should be utf-8");
    let lines = text.lines().collect::<Vec<_>>();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("\"contactid\";\"channel\";"));
    assert!(lines[1].contains("\"2.0\";\"45\";\"0\";\"240.0\";\"01/03/2024\""));
    assert!(lines[2].ends_with("\"NULL\";\"NULL\";\"NULL\";\"NULL\";\"NULL\""));
}

#[test]
fn empty_export_still_has_header() {
    let encoded = export_csv(&[], &CsvWriteOptions::default()).expect("export should encode");
    let text = String::from_utf8(encoded).expect("export should be utf-8");
    assert_eq!(text.trim_end(), METRIC_COLUMNS.join(","));
}

#[test]
fn file_names_follow_the_threshold() {
    assert_eq!(export_file_name(None), "contact_delay_analysis.csv");
    assert_eq!(
        export_file_name(Some(5.0)),
        "contacts_with_delay_over_5.0s.csv"
    );
    assert_eq!(
        export_file_name(Some(0.25)),
        "contacts_with_delay_over_0.25s.csv"
    );
}

#[test]
fn download_keeps_full_float_precision() {
    let mut record = answered_call();
    record.delay_seconds = Some(0.125);

    let encoded = export_csv(&[record], &download_options()).expect("export should encode");
    let text = String::from_utf8(encoded).expect("export should be utf-8");
    let row = text.lines().nth(1).expect("export should have a data row");

    assert!(row.contains(",0.125,45,0,240.0,"), "{row}");
}
