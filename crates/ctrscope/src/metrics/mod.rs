//! Malformed values never abort a run. A row whose initiation, connection or
//! last-update timestamp cannot be parsed is left out of the derived set; an
//! unparseable disconnect timestamp or agent value only blanks the metrics
//! that depend on it. Every such case is reported as a [`RowIssue`].

use std::collections::BTreeMap;

use schemars::JsonSchema;
use serde::{Serialize, Serializer};
use time::{Date, OffsetDateTime};

use crate::extract::{AgentMetric, extract_agent_metric};
use crate::models::{
    AGENT_COLUMN, CHANNEL_COLUMN, CONNECTED_COLUMN, CONTACT_ID_COLUMN, DISCONNECT_COLUMN,
    INITIATION_COLUMN, LAST_UPDATE_COLUMN, RecordTable, SOURCE_FILE_COLUMN,
};
use crate::storage::CsvValue;
use crate::utils::time::{format_date, parse_timestamp};

pub const METRIC_COLUMNS: &[&str] = &[
    "contactid",
    "channel",
    "initiationtimestamp",
    "connectedtosystemtimestamp",
    "disconnecttimestamp",
    "lastupdatetimestamp",
    "delay_seconds",
    "agentinteractionduration_seconds",
    "aftercontactworkduration_seconds",
    "contactduration_seconds",
    "date",
    "sourcefile",
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DateBasis {
    #[default]
    Disconnect,
    Initiation,
}

impl DateBasis {
    #[must_use]
    pub const fn column(self) -> &'static str {
        match self {
            Self::Disconnect => DISCONNECT_COLUMN,
            Self::Initiation => INITIATION_COLUMN,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DerivationOptions {
    pub channel: Option<String>,
    pub date_basis: DateBasis,
}

#[derive(Debug, Clone, PartialEq, Serialize, JsonSchema)]
pub struct DerivedMetricsRecord {
    pub contactid: Option<String>,
    pub channel: Option<String>,
    pub initiationtimestamp: Option<String>,
    pub connectedtosystemtimestamp: Option<String>,
    pub disconnecttimestamp: Option<String>,
    pub lastupdatetimestamp: Option<String>,
    pub delay_seconds: Option<f64>,
    pub agentinteractionduration_seconds: Option<i64>,
    pub aftercontactworkduration_seconds: Option<i64>,
    pub contactduration_seconds: Option<f64>,
    #[serde(serialize_with = "serialize_date")]
    #[schemars(with = "Option<String>")]
    pub date: Option<Date>,
    pub sourcefile: Option<String>,
}

impl DerivedMetricsRecord {
    #[must_use]
    pub fn csv_values(&self) -> Vec<CsvValue> {
        vec![
            CsvValue::from(self.contactid.as_deref()),
            CsvValue::from(self.channel.as_deref()),
            CsvValue::from(self.initiationtimestamp.as_deref()),
            CsvValue::from(self.connectedtosystemtimestamp.as_deref()),
            CsvValue::from(self.disconnecttimestamp.as_deref()),
            CsvValue::from(self.lastupdatetimestamp.as_deref()),
            CsvValue::from(self.delay_seconds),
            CsvValue::from(self.agentinteractionduration_seconds),
            CsvValue::from(self.aftercontactworkduration_seconds),
            CsvValue::from(self.contactduration_seconds),
            CsvValue::from(self.date),
            CsvValue::from(self.sourcefile.as_deref()),
        ]
    }
}

fn serialize_date<S: Serializer>(date: &Option<Date>, serializer: S) -> Result<S::Ok, S::Error> {
    match date {
        Some(date) => serializer.serialize_some(&format_date(*date)),
        None => serializer.serialize_none(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RowIssue {
    pub row: usize,
    pub contactid: Option<String>,
    pub field: String,
    pub reason: String,
    pub excluded: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DerivationOutcome {
    pub records: Vec<DerivedMetricsRecord>,
    pub issues: Vec<RowIssue>,
    pub warnings: Vec<String>,
    pub input_rows: usize,
    pub excluded_rows: usize,
    pub collapsed_rows: usize,
    pub channel_filtered_rows: usize,
}

#[derive(Debug, Clone)]
struct ParsedRow {
    index: usize,
    initiation: Option<OffsetDateTime>,
    disconnect: Option<OffsetDateTime>,
    last_update: Option<OffsetDateTime>,
    delay_seconds: Option<f64>,
}

pub fn derive_metrics(table: &RecordTable, options: &DerivationOptions) -> DerivationOutcome {
    let mut outcome = DerivationOutcome {
        input_rows: table.len(),
        ..DerivationOutcome::default()
    };
    if table.is_empty() {
        return outcome;
    }

    let has_contact_id = table.has_column(CONTACT_ID_COLUMN);
    if !has_contact_id {
        outcome.warnings.push(format!(
            "column `{CONTACT_ID_COLUMN}` not found; rows are not collapsed per contact"
        ));
    }
    for column in [INITIATION_COLUMN, CONNECTED_COLUMN, LAST_UPDATE_COLUMN] {
        if !table.has_column(column) {
            outcome
                .warnings
                .push(format!("column `{column}` not found; dependent metrics are empty"));
        }
    }

    // Steps 1-2: timestamps and delay.
    let mut parsed_rows = Vec::with_capacity(table.len());
    for index in 0..table.len() {
        let contact_id = table.value(index, CONTACT_ID_COLUMN);
        if has_contact_id && contact_id.is_none() {
            outcome.issues.push(RowIssue {
                row: index,
                contactid: None,
                field: CONTACT_ID_COLUMN.to_string(),
                reason: "contact id is empty".to_string(),
                excluded: true,
            });
            outcome.excluded_rows += 1;
            continue;
        }
        if let Some(row) = parse_row(table, index, &mut outcome.issues) {
            parsed_rows.push(row);
        } else {
            outcome.excluded_rows += 1;
        }
    }

    // Step 3: keep the most recently updated row per contact.
    let survivors = if has_contact_id {
        collapse_latest(table, parsed_rows, &mut outcome.collapsed_rows)
    } else {
        parsed_rows
    };

    // Step 4: optional channel restriction.
    let survivors = match options.channel.as_deref() {
        Some(channel) if table.has_column(CHANNEL_COLUMN) => {
            let before = survivors.len();
            let kept = survivors
                .into_iter()
                .filter(|row| table.value(row.index, CHANNEL_COLUMN) == Some(channel))
                .collect::<Vec<_>>();
            outcome.channel_filtered_rows = before - kept.len();
            kept
        }
        Some(channel) => {
            outcome.warnings.push(format!(
                "column `{CHANNEL_COLUMN}` not found; channel filter `{channel}` ignored"
            ));
            survivors
        }
        None => survivors,
    };

    // Steps 5-7.
    for row in survivors {
        let record = build_record(table, &row, options.date_basis, &mut outcome.issues);
        outcome.records.push(record);
    }

    outcome
}

fn parse_row(table: &RecordTable, index: usize, issues: &mut Vec<RowIssue>) -> Option<ParsedRow> {
    let mut failed = false;
    let mut parse_required = |column: &str| -> Option<OffsetDateTime> {
        let raw = table.value(index, column)?;
        match parse_timestamp(raw) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                issues.push(RowIssue {
                    row: index,
                    contactid: table.value(index, CONTACT_ID_COLUMN).map(str::to_string),
                    field: column.to_string(),
                    reason: error.to_string(),
                    excluded: true,
                });
                failed = true;
                None
            }
        }
    };

    let initiation = parse_required(INITIATION_COLUMN);
    let connected = parse_required(CONNECTED_COLUMN);
    let last_update = parse_required(LAST_UPDATE_COLUMN);
    if failed {
        return None;
    }

    let disconnect = match table.value(index, DISCONNECT_COLUMN) {
        None => None,
        Some(raw) => match parse_timestamp(raw) {
            Ok(parsed) => Some(parsed),
            Err(error) => {
                issues.push(RowIssue {
                    row: index,
                    contactid: table.value(index, CONTACT_ID_COLUMN).map(str::to_string),
                    field: DISCONNECT_COLUMN.to_string(),
                    reason: error.to_string(),
                    excluded: false,
                });
                None
            }
        },
    };

    let delay_seconds = match (connected, initiation) {
        (Some(connected), Some(initiation)) => Some((connected - initiation).as_seconds_f64()),
        _ => None,
    };

    Some(ParsedRow {
        index,
        initiation,
        disconnect,
        last_update,
        delay_seconds,
    })
}

/// Ties on `lastupdatetimestamp` go to the row that came later in the table;
/// a missing timestamp sorts before any present one.
fn collapse_latest(
    table: &RecordTable,
    rows: Vec<ParsedRow>,
    collapsed: &mut usize,
) -> Vec<ParsedRow> {
    let total = rows.len();
    let mut latest = BTreeMap::<String, ParsedRow>::new();
    for row in rows {
        let Some(contact_id) = table.value(row.index, CONTACT_ID_COLUMN) else {
            continue;
        };
        match latest.get_mut(contact_id) {
            Some(current) if (row.last_update, row.index) >= (current.last_update, current.index) => {
                *current = row;
            }
            Some(_) => {}
            None => {
                latest.insert(contact_id.to_string(), row);
            }
        }
    }
    *collapsed = total - latest.len();
    latest.into_values().collect()
}

fn build_record(
    table: &RecordTable,
    row: &ParsedRow,
    date_basis: DateBasis,
    issues: &mut Vec<RowIssue>,
) -> DerivedMetricsRecord {
    let text = |column: &str| table.value(row.index, column).map(str::to_string);
    let contact_id = text(CONTACT_ID_COLUMN);

    let mut agent_metric = |metric: AgentMetric| -> Option<i64> {
        let raw = table.value(row.index, AGENT_COLUMN)?;
        match extract_agent_metric(raw, metric) {
            Ok(value) => value,
            Err(error) => {
                issues.push(RowIssue {
                    row: row.index,
                    contactid: contact_id.clone(),
                    field: metric.output_column().to_string(),
                    reason: error.to_string(),
                    excluded: false,
                });
                None
            }
        }
    };
    let agent_interaction = agent_metric(AgentMetric::AgentInteractionDuration);
    let after_contact_work = agent_metric(AgentMetric::AfterContactWorkDuration);

    let contact_duration = match (row.disconnect, row.initiation) {
        (Some(disconnect), Some(initiation)) => Some((disconnect - initiation).as_seconds_f64()),
        _ => None,
    };
    let date = match date_basis {
        DateBasis::Disconnect => row.disconnect,
        DateBasis::Initiation => row.initiation,
    }
    .map(OffsetDateTime::date);

    DerivedMetricsRecord {
        contactid: contact_id.clone(),
        channel: text(CHANNEL_COLUMN),
        initiationtimestamp: text(INITIATION_COLUMN),
        connectedtosystemtimestamp: text(CONNECTED_COLUMN),
        disconnecttimestamp: text(DISCONNECT_COLUMN),
        lastupdatetimestamp: text(LAST_UPDATE_COLUMN),
        delay_seconds: row.delay_seconds,
        agentinteractionduration_seconds: agent_interaction,
        aftercontactworkduration_seconds: after_contact_work,
        contactduration_seconds: contact_duration,
        date,
        sourcefile: text(SOURCE_FILE_COLUMN),
    }
}
