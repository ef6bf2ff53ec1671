use std::time::{SystemTime, UNIX_EPOCH};

use thiserror::Error;
use time::format_description::BorrowedFormatItem;
use time::format_description::well_known::Rfc3339;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, UtcOffset};

const EPOCH_SECONDS_CUTOFF: i128 = 100_000_000_000;
const EPOCH_MILLIS_CUTOFF: i128 = 100_000_000_000_000;
const EPOCH_MICROS_CUTOFF: i128 = 100_000_000_000_000_000;
const NANOS_PER_MILLI: i128 = 1_000_000;

const NAIVE_FORMATS: [&[BorrowedFormatItem<'static>]; 3] = [
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second].[subsecond]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]:[second]"),
    format_description!("[year]-[month]-[day]T[hour]:[minute]"),
];

const DATE_FORMAT: &[BorrowedFormatItem<'static>] = format_description!("[year]-[month]-[day]");

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimestampError {
    #[error("timestamp input is empty")]
    Empty,
    #[error("unsupported timestamp format: {0}")]
    Unsupported(String),
    #[error("epoch value out of range: {0}")]
    EpochOutOfRange(i128),
}

pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, TimestampError> {
    let candidate = raw.trim();
    if candidate.is_empty() {
        return Err(TimestampError::Empty);
    }

    if let Ok(epoch_raw) = candidate.parse::<i128>() {
        return epoch_to_datetime(epoch_raw);
    }

    if let Ok(parsed) = OffsetDateTime::parse(candidate, &Rfc3339) {
        return Ok(parsed);
    }

    let normalized = normalize_separator(candidate);
    let normalized = normalize_utc_suffix(&normalized);
    if let Ok(parsed) = OffsetDateTime::parse(&normalized, &Rfc3339) {
        return Ok(parsed);
    }

    for format in NAIVE_FORMATS {
        if let Ok(parsed) = PrimitiveDateTime::parse(&normalized, format) {
            return Ok(parsed.assume_utc());
        }
    }

    Err(TimestampError::Unsupported(candidate.to_string()))
}

#[must_use]
pub fn format_date(date: Date) -> String {
    date.format(DATE_FORMAT)
        .unwrap_or_else(|_| date.to_string())
}

pub fn parse_date(raw: &str) -> Result<Date, TimestampError> {
    Date::parse(raw.trim(), DATE_FORMAT)
        .map_err(|_| TimestampError::Unsupported(raw.trim().to_string()))
}

#[must_use]
pub fn format_date_pattern(date: Date, pattern: &str) -> String {
    let mut formatted = String::with_capacity(pattern.len() + 4);
    let mut chars = pattern.chars();
    while let Some(ch) = chars.next() {
        if ch != '%' {
            formatted.push(ch);
            continue;
        }
        match chars.next() {
            Some('Y') => formatted.push_str(&format!("{:04}", date.year())),
            Some('m') => formatted.push_str(&format!("{:02}", u8::from(date.month()))),
            Some('d') => formatted.push_str(&format!("{:02}", date.day())),
            Some('%') => formatted.push('%'),
            Some(other) => {
                formatted.push('%');
                formatted.push(other);
            }
            None => formatted.push('%'),
        }
    }
    formatted
}

#[must_use]
pub fn unix_timestamp_seconds() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |duration| duration.as_secs())
}

#[must_use]
pub fn format_unix_ms(timestamp_unix_ms: u64) -> String {
    let nanos = i128::from(timestamp_unix_ms)
        .checked_mul(NANOS_PER_MILLI)
        .unwrap_or(i128::MAX);
    let dt = OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .unwrap_or(OffsetDateTime::UNIX_EPOCH)
        .to_offset(UtcOffset::UTC);
    format!(
        "{:04}-{:02}-{:02}T{:02}:{:02}:{:02}.{:03}Z",
        dt.year(),
        u8::from(dt.month()),
        dt.day(),
        dt.hour(),
        dt.minute(),
        dt.second(),
        dt.millisecond()
    )
}

#[must_use]
pub fn now_utc_string() -> String {
    let now = OffsetDateTime::now_utc();
    now.format(&Rfc3339)
        .unwrap_or_else(|_| format_unix_ms(unix_timestamp_seconds().saturating_mul(1_000)))
}

fn normalize_separator(candidate: &str) -> String {
    // `YYYY-MM-DD hh:mm...` -> `YYYY-MM-DDThh:mm...`
    let bytes = candidate.as_bytes();
    if bytes.len() > 10 && bytes[10] == b' ' {
        let mut normalized = String::with_capacity(candidate.len());
        normalized.push_str(&candidate[..10]);
        normalized.push('T');
        normalized.push_str(candidate[11..].trim_start());
        normalized
    } else {
        candidate.to_string()
    }
}

fn normalize_utc_suffix(candidate: &str) -> String {
    for suffix in [" UTC", " Z", "UTC"] {
        if let Some(stripped) = candidate.strip_suffix(suffix) {
            return format!("{}Z", stripped.trim_end());
        }
    }
    candidate.to_string()
}

fn epoch_to_datetime(epoch_raw: i128) -> Result<OffsetDateTime, TimestampError> {
    let nanos = if epoch_raw.abs() < EPOCH_SECONDS_CUTOFF {
        epoch_raw.checked_mul(1_000_000_000)
    } else if epoch_raw.abs() < EPOCH_MILLIS_CUTOFF {
        epoch_raw.checked_mul(NANOS_PER_MILLI)
    } else if epoch_raw.abs() < EPOCH_MICROS_CUTOFF {
        epoch_raw.checked_mul(1_000)
    } else {
        Some(epoch_raw)
    }
    .ok_or(TimestampError::EpochOutOfRange(epoch_raw))?;

    OffsetDateTime::from_unix_timestamp_nanos(nanos)
        .map_err(|_| TimestampError::EpochOutOfRange(epoch_raw))
}
