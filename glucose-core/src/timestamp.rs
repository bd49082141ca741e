//! Turns wire timestamps into absolute UTC instants.
//!
//! Interpretation order, first match wins:
//!
//! 1. anything that coerces to a finite number is an epoch count: seconds
//!    below `1e12`, milliseconds from there on;
//! 2. `YYYY-MM-DDTHH:mm[:ss[.SSS]]` without a zone designator is read as UTC;
//! 3. fully specified strings (RFC 3339, RFC 2822, date only) are parsed with
//!    their own offset.
//!
//! Rule 2 mirrors how the portal builds manual entries: the local date and
//! time are converted to a zone-neutral string before they reach the store,
//! so applying a local offset again would shift them twice. The store gives
//! no guarantee for this, treat it as policy.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};

use crate::{GlucoseError, RawTimestamp};

/// Epoch counts at or above this value are milliseconds.
const MILLIS_THRESHOLD: i64 = 1_000_000_000_000;

/// Largest distance from the epoch accepted, matching ECMAScript dates.
const MAX_EPOCH_MILLIS: i64 = 8_640_000_000_000_000;

/// Shape of a zone-less ISO timestamp; `d` stands for any ASCII digit.
const NAIVE_TEMPLATE: &[u8] = b"dddd-dd-ddTdd:dd:dd.ddd";

/// Normalize a wire timestamp to a UTC instant.
pub fn normalize(raw: &RawTimestamp) -> Result<DateTime<Utc>, GlucoseError> {
    match raw {
        RawTimestamp::Integer(count) => from_epoch_integer(*count),
        RawTimestamp::Float(count) => from_epoch_float(*count),
        RawTimestamp::Text(text) => normalize_text(text),
        RawTimestamp::Missing => Err(invalid(raw)),
    }
}

/// Canonical raw form of an instant.
///
/// Normalizing the result yields `instant` again, truncated to milliseconds.
/// Whole seconds before the millisecond threshold are emitted as epoch
/// seconds, later instants as epoch milliseconds, the rest as RFC 3339.
pub fn to_raw(instant: DateTime<Utc>) -> RawTimestamp {
    let millis = instant.timestamp_millis();
    if millis >= MILLIS_THRESHOLD {
        RawTimestamp::Integer(millis)
    } else if millis % 1000 == 0 {
        RawTimestamp::Integer(millis / 1000)
    } else {
        RawTimestamp::Text(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

fn normalize_text(text: &str) -> Result<DateTime<Utc>, GlucoseError> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(invalid_text(text));
    }

    if let Ok(count) = trimmed.parse::<i64>() {
        return from_epoch_integer(count);
    }
    if let Ok(count) = trimmed.parse::<f64>() {
        if count.is_finite() {
            return from_epoch_float(count);
        }
    }

    let parsed = if looks_naive_iso(trimmed) {
        parse_naive_as_utc(trimmed)
    } else {
        parse_zoned(trimmed)
    };
    // Instants carry millisecond precision whatever the fraction length.
    parsed
        .and_then(|instant| from_millis(instant.timestamp_millis()))
        .ok_or_else(|| invalid_text(text))
}

fn from_epoch_integer(count: i64) -> Result<DateTime<Utc>, GlucoseError> {
    let millis = if count < MILLIS_THRESHOLD {
        count.checked_mul(1000)
    } else {
        Some(count)
    };
    millis
        .and_then(from_millis)
        .ok_or_else(|| GlucoseError::InvalidTimestamp(count.to_string()))
}

fn from_epoch_float(count: f64) -> Result<DateTime<Utc>, GlucoseError> {
    if !count.is_finite() {
        return Err(GlucoseError::InvalidTimestamp(count.to_string()));
    }
    let millis = if count < MILLIS_THRESHOLD as f64 {
        count * 1000.0
    } else {
        count
    };
    let millis = millis.trunc();
    if millis.abs() > MAX_EPOCH_MILLIS as f64 {
        return Err(GlucoseError::InvalidTimestamp(count.to_string()));
    }
    from_millis(millis as i64).ok_or_else(|| GlucoseError::InvalidTimestamp(count.to_string()))
}

fn from_millis(millis: i64) -> Option<DateTime<Utc>> {
    if millis.abs() > MAX_EPOCH_MILLIS {
        return None;
    }
    DateTime::from_timestamp_millis(millis)
}

fn looks_naive_iso(text: &str) -> bool {
    let bytes = text.as_bytes();
    if !matches!(bytes.len(), 16 | 19 | 23) {
        return false;
    }
    bytes
        .iter()
        .zip(NAIVE_TEMPLATE)
        .all(|(&byte, &expected)| match expected {
            b'd' => byte.is_ascii_digit(),
            _ => byte == expected,
        })
}

fn parse_naive_as_utc(text: &str) -> Option<DateTime<Utc>> {
    let format = if text.len() == 16 {
        "%Y-%m-%dT%H:%M"
    } else {
        "%Y-%m-%dT%H:%M:%S%.f"
    };
    NaiveDateTime::parse_from_str(text, format)
        .ok()
        .map(|naive| naive.and_utc())
}

fn parse_zoned(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_str(text, "%Y-%m-%dT%H:%M%:z") {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(parsed) = DateTime::parse_from_rfc2822(text) {
        return Some(parsed.with_timezone(&Utc));
    }
    // Date-only strings are UTC midnight, as in ECMAScript.
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn invalid(raw: &RawTimestamp) -> GlucoseError {
    GlucoseError::InvalidTimestamp(raw.to_string())
}

fn invalid_text(text: &str) -> GlucoseError {
    GlucoseError::InvalidTimestamp(format!("{text:?}"))
}
