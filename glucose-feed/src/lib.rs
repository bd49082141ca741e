//! Measurement feed: wire decoding, the store contract and periodic refresh.

use glucose_core::Measurement;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

pub mod refresh;
pub mod store;

pub use refresh::{Dashboard, RefreshHandle, ViewMode};
pub use store::{ErrorInfo, FeedError, MeasurementStore, NewMeasurement};

/// Decode measurements from a JSON string.
pub fn parse_measurements_str(json: &str) -> Result<Vec<Measurement>, FeedError> {
    let value: Value =
        serde_json::from_str(json).map_err(|err| FeedError::Decode(err.to_string()))?;
    parse_measurements_value(&value)
}

/// Decode measurements from a bare array or a `{ "data": [...] }` envelope.
///
/// Entries that do not look like a measurement at all are skipped. Entries
/// with an unreadable timestamp are kept; the series builder drops them.
pub fn parse_measurements_value(payload: &Value) -> Result<Vec<Measurement>, FeedError> {
    let entries = match payload {
        Value::Array(entries) => entries,
        Value::Object(envelope) => match envelope.get("data") {
            Some(Value::Array(entries)) => entries,
            Some(Value::Null) | None => {
                debug!("measurement envelope without data");
                return Ok(Vec::new());
            }
            Some(other) => {
                return Err(FeedError::Decode(format!(
                    "expected `data` to be an array, found {}",
                    json_kind(other)
                )))
            }
        },
        other => {
            return Err(FeedError::Decode(format!(
                "expected an array of measurements, found {}",
                json_kind(other)
            )))
        }
    };

    let mut measurements = Vec::with_capacity(entries.len());
    for (index, entry) in entries.iter().enumerate() {
        match Measurement::deserialize(entry) {
            Ok(measurement) => measurements.push(measurement),
            Err(err) => warn!(index, error = %err, "skipping undecodable measurement"),
        }
    }

    Ok(measurements)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glucose_core::RawTimestamp;

    #[test]
    fn accepts_bare_arrays_and_envelopes() {
        let bare = parse_measurements_str(r#"[{"id": 1, "value": 5.2, "timestamp": 1700000000}]"#)
            .unwrap();
        let wrapped = parse_measurements_str(
            r#"{"data": [{"id": 1, "value": 5.2, "timestamp": 1700000000}], "error": null}"#,
        )
        .unwrap();
        assert_eq!(bare, wrapped);
        assert_eq!(bare[0].timestamp, RawTimestamp::Integer(1_700_000_000));
    }

    #[test]
    fn empty_envelope_is_empty() {
        assert!(parse_measurements_str(r#"{"data": null}"#).unwrap().is_empty());
        assert!(parse_measurements_str("{}").unwrap().is_empty());
    }

    #[test]
    fn skips_entries_that_are_not_measurements() {
        let records = parse_measurements_str(
            r#"[
                {"value": 6.0, "timestamp": "2024-01-01T08:00:00"},
                "noise",
                {"value": true, "timestamp": 1},
                {"value": 7.0, "timestamp": "garbage"}
            ]"#,
        )
        .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].timestamp, RawTimestamp::Text("garbage".into()));
    }

    #[test]
    fn rejects_non_collections() {
        assert!(matches!(
            parse_measurements_str("42"),
            Err(FeedError::Decode(_))
        ));
        assert!(matches!(
            parse_measurements_str(r#"{"data": "nope"}"#),
            Err(FeedError::Decode(_))
        ));
        assert!(matches!(
            parse_measurements_str("{not json"),
            Err(FeedError::Decode(_))
        ));
    }
}
