//! Contract of the remote measurement store and its error shape.

use std::fmt;

use async_trait::async_trait;
use chrono::{LocalResult, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use chrono_tz::Tz;
use glucose_core::{GlucoseError, Measurement, MeasurementSource};
use serde::{Deserialize, Serialize};
use serde_json::Value;

const GENERIC_SERVER_ERROR: &str = "An unexpected server error occurred.";
const NETWORK_ERROR: &str = "Network error. Please check your connection.";

/// Remote source and sink of glucose measurements.
///
/// How far back [`MeasurementStore::fetch_recent`] reaches is decided by the
/// store (typically the last 90 days), not by the chart engine.
#[async_trait]
pub trait MeasurementStore: Send + Sync {
    async fn fetch_recent(&self) -> Result<Vec<Measurement>, FeedError>;

    async fn submit(&self, input: NewMeasurement) -> Result<Measurement, FeedError>;
}

/// Payload for a new measurement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewMeasurement {
    pub value: f64,
    pub timestamp: String,
    pub source: MeasurementSource,
}

impl NewMeasurement {
    /// A manual entry typed in as a local date and time in `zone`.
    ///
    /// The timestamp is sent as UTC ISO-8601 with milliseconds. Ambiguous
    /// local times (the repeated hour when clocks go back) take the earlier
    /// instant; skipped local times are rejected.
    pub fn manual_entry(value: f64, local: NaiveDateTime, zone: Tz) -> Result<Self, GlucoseError> {
        let instant = match zone.from_local_datetime(&local) {
            LocalResult::Single(instant) | LocalResult::Ambiguous(instant, _) => instant,
            LocalResult::None => {
                return Err(GlucoseError::InvalidTimestamp(format!(
                    "{local} does not exist in {zone}"
                )))
            }
        };

        Ok(Self {
            value,
            timestamp: instant
                .with_timezone(&Utc)
                .to_rfc3339_opts(SecondsFormat::Millis, true),
            source: MeasurementSource::ManualEntry,
        })
    }
}

/// Failure reported by (or on the way to) the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorInfo {
    pub message: String,
    pub status: Option<u16>,
}

impl ErrorInfo {
    /// Build from an HTTP error response, extracting the most useful message
    /// the body offers.
    pub fn from_response(status: u16, body: Option<&Value>) -> Self {
        Self {
            message: response_message(body),
            status: Some(status),
        }
    }

    /// The request never got an answer.
    pub fn network() -> Self {
        Self {
            message: NETWORK_ERROR.to_string(),
            status: None,
        }
    }
}

impl fmt::Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "{} (HTTP {status})", self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Message precedence: a `message` string, the first string value of an
/// object body, a plain string body, a generic fallback.
fn response_message(body: Option<&Value>) -> String {
    match body {
        Some(Value::Object(fields)) => fields
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.is_empty())
            .or_else(|| fields.values().next().and_then(Value::as_str))
            .unwrap_or(GENERIC_SERVER_ERROR)
            .to_string(),
        Some(Value::String(text)) if !text.is_empty() => text.clone(),
        _ => GENERIC_SERVER_ERROR.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FeedError {
    #[error("measurement store error: {0}")]
    Api(ErrorInfo),
    #[error("could not decode measurements: {0}")]
    Decode(String),
    #[error("measurements cannot be submitted in a delegated view")]
    ReadOnly,
    #[error(transparent)]
    Chart(#[from] GlucoseError),
}

impl From<ErrorInfo> for FeedError {
    fn from(info: ErrorInfo) -> Self {
        FeedError::Api(info)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use serde_json::json;

    fn local(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn manual_entry_converts_local_time_to_utc() {
        let entry =
            NewMeasurement::manual_entry(6.5, local(2024, 1, 15, 8, 30), chrono_tz::Europe::Amsterdam)
                .unwrap();
        assert_eq!(entry.timestamp, "2024-01-15T07:30:00.000Z");
        assert_eq!(entry.source, MeasurementSource::ManualEntry);

        let summer =
            NewMeasurement::manual_entry(6.5, local(2024, 7, 15, 8, 30), chrono_tz::Europe::Amsterdam)
                .unwrap();
        assert_eq!(summer.timestamp, "2024-07-15T06:30:00.000Z");
    }

    #[test]
    fn manual_entry_rejects_skipped_local_time() {
        // Clocks jump from 02:00 to 03:00 on the last Sunday of March.
        let err =
            NewMeasurement::manual_entry(6.5, local(2024, 3, 31, 2, 30), chrono_tz::Europe::Amsterdam)
                .unwrap_err();
        assert!(matches!(err, GlucoseError::InvalidTimestamp(_)));
    }

    #[test]
    fn manual_entry_takes_earlier_of_repeated_local_time() {
        // Clocks fall back from 03:00 to 02:00 on the last Sunday of October.
        let entry =
            NewMeasurement::manual_entry(6.5, local(2024, 10, 27, 2, 30), chrono_tz::Europe::Amsterdam)
                .unwrap();
        assert_eq!(entry.timestamp, "2024-10-27T00:30:00.000Z");
    }

    #[test]
    fn manual_entry_wire_shape() {
        let entry = NewMeasurement::manual_entry(5.0, local(2024, 1, 1, 0, 0), chrono_tz::UTC).unwrap();
        assert_eq!(
            serde_json::to_value(&entry).unwrap(),
            json!({"value": 5.0, "timestamp": "2024-01-01T00:00:00.000Z", "source": "MANUAL_ENTRY"})
        );
    }

    #[test]
    fn response_message_precedence() {
        let message = |body: Value| ErrorInfo::from_response(400, Some(&body)).message;

        assert_eq!(message(json!({"message": "Ongeldige waarde", "value": "x"})), "Ongeldige waarde");
        assert_eq!(message(json!({"value": "must be positive", "other": "y"})), "must be positive");
        assert_eq!(message(json!("plain text failure")), "plain text failure");
        assert_eq!(message(json!({"code": 12})), GENERIC_SERVER_ERROR);
        assert_eq!(message(json!([1, 2])), GENERIC_SERVER_ERROR);
        assert_eq!(ErrorInfo::from_response(500, None).message, GENERIC_SERVER_ERROR);
    }

    #[test]
    fn error_info_display() {
        let info = ErrorInfo::from_response(404, Some(&json!({"message": "Not found"})));
        assert_eq!(info.to_string(), "Not found (HTTP 404)");
        assert_eq!(ErrorInfo::network().status, None);
        assert_eq!(
            FeedError::from(ErrorInfo::network()).to_string(),
            format!("measurement store error: {NETWORK_ERROR}")
        );
    }
}
