//! Core engine turning raw glucose measurements into chart-ready series.
//!
//! The pipeline is pure and synchronous: raw records are normalized
//! ([`timestamp`]), scoped to a relative window ([`window`]), sorted into a
//! series ([`series`]) and paired with axis ticks ([`ticks`]). Values are
//! classified into clinical bands ([`band`]) and rendered into labels
//! ([`label`]). [`chart`] wires the whole thing together for one refresh.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub mod band;
pub mod chart;
pub mod label;
pub mod series;
pub mod ticks;
pub mod timestamp;
pub mod window;

pub use band::{classify, BandRegion, BandSummary, ClinicalBand};
pub use chart::{build_chart_view, window_options, ChartView, WindowOption};
pub use label::{relative_label, LabelFormatter, Locale};
pub use series::{build, build_report, NormalizedPoint, RejectedRecord, SeriesReport};
pub use ticks::generate as generate_ticks;
pub use timestamp::{normalize, to_raw};
pub use window::{resolve, Window, WindowToken};

/// Longest accepted gap between two background refreshes: one day.
pub const MAX_REFRESH_INTERVAL_SECS: u64 = 86_400;

/// Settings shared by every chart computation.
///
/// Missing fields fall back to [`ChartConfig::default`], so a partial JSON
/// object is a valid configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartConfig {
    /// Seconds between two background refreshes of the measurement feed.
    pub refresh_interval_secs: u64,
    /// Window selected when a dashboard is first opened.
    pub default_window: WindowToken,
    /// IANA zone used for every human-facing date and time label.
    pub display_timezone: String,
    pub locale: Locale,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: 60,
            default_window: WindowToken::SixHours,
            display_timezone: "Europe/Amsterdam".to_string(),
            locale: Locale::Dutch,
        }
    }
}

impl ChartConfig {
    /// Interval between refreshes, between one second and one day.
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(
            self.refresh_interval_secs
                .clamp(1, MAX_REFRESH_INTERVAL_SECS),
        )
    }

    /// Resolve [`ChartConfig::display_timezone`] to a zone.
    pub fn display_zone(&self) -> Result<chrono_tz::Tz, GlucoseError> {
        self.display_timezone
            .parse::<chrono_tz::Tz>()
            .map_err(|_| GlucoseError::UnknownTimezone(self.display_timezone.clone()))
    }
}

/// A glucose measurement as delivered by the measurement store.
///
/// Only `timestamp` drives the engine; everything else is carried through to
/// the chart points untouched.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Measurement {
    #[serde(default)]
    pub id: Option<RecordId>,
    /// Glucose value in mmol/L. Non-numeric wire values decode to NaN.
    #[serde(default = "missing_value", deserialize_with = "lenient_value")]
    pub value: f64,
    #[serde(default)]
    pub timestamp: RawTimestamp,
    #[serde(default)]
    pub source: Option<MeasurementSource>,
}

impl Measurement {
    pub fn new(value: f64, timestamp: impl Into<RawTimestamp>) -> Self {
        Self {
            id: None,
            value,
            timestamp: timestamp.into(),
            source: None,
        }
    }

    pub fn with_id(mut self, id: impl Into<RecordId>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn with_source(mut self, source: MeasurementSource) -> Self {
        self.source = Some(source);
        self
    }
}

/// Identifier assigned by the measurement store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RecordId {
    Numeric(i64),
    Text(String),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordId::Numeric(id) => write!(f, "{id}"),
            RecordId::Text(id) => f.write_str(id),
        }
    }
}

impl From<i64> for RecordId {
    fn from(id: i64) -> Self {
        RecordId::Numeric(id)
    }
}

impl From<&str> for RecordId {
    fn from(id: &str) -> Self {
        RecordId::Text(id.to_string())
    }
}

/// How a measurement entered the store.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(from = "String", into = "String")]
pub enum MeasurementSource {
    ManualEntry,
    Imported,
    DeviceSynced,
    /// A source label this engine does not know about, kept verbatim.
    Other(String),
}

impl MeasurementSource {
    pub fn as_str(&self) -> &str {
        match self {
            MeasurementSource::ManualEntry => "MANUAL_ENTRY",
            MeasurementSource::Imported => "IMPORTED",
            MeasurementSource::DeviceSynced => "DEVICE_SYNCED",
            MeasurementSource::Other(other) => other,
        }
    }
}

impl From<String> for MeasurementSource {
    fn from(value: String) -> Self {
        match value.as_str() {
            "MANUAL_ENTRY" => MeasurementSource::ManualEntry,
            "IMPORTED" => MeasurementSource::Imported,
            "DEVICE_SYNCED" => MeasurementSource::DeviceSynced,
            _ => MeasurementSource::Other(value),
        }
    }
}

impl From<MeasurementSource> for String {
    fn from(source: MeasurementSource) -> Self {
        match source {
            MeasurementSource::Other(other) => other,
            known => known.as_str().to_string(),
        }
    }
}

/// Timestamp exactly as it appeared on the wire.
///
/// Stores mix epoch seconds, epoch milliseconds and ISO-8601 strings with or
/// without a zone; [`timestamp::normalize`] decides what each one means.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(untagged)]
pub enum RawTimestamp {
    Integer(i64),
    Float(f64),
    Text(String),
    #[default]
    Missing,
}

impl From<i64> for RawTimestamp {
    fn from(value: i64) -> Self {
        RawTimestamp::Integer(value)
    }
}

impl From<f64> for RawTimestamp {
    fn from(value: f64) -> Self {
        RawTimestamp::Float(value)
    }
}

impl From<&str> for RawTimestamp {
    fn from(value: &str) -> Self {
        RawTimestamp::Text(value.to_string())
    }
}

impl From<String> for RawTimestamp {
    fn from(value: String) -> Self {
        RawTimestamp::Text(value)
    }
}

impl fmt::Display for RawTimestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawTimestamp::Integer(value) => write!(f, "{value}"),
            RawTimestamp::Float(value) => write!(f, "{value}"),
            RawTimestamp::Text(value) => write!(f, "{value:?}"),
            RawTimestamp::Missing => f.write_str("<missing>"),
        }
    }
}

fn missing_value() -> f64 {
    f64::NAN
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LooseNumber {
    Number(f64),
    Text(String),
    Null,
}

fn lenient_value<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match LooseNumber::deserialize(deserializer)? {
        LooseNumber::Number(value) => value,
        LooseNumber::Text(text) => text.trim().parse().unwrap_or(f64::NAN),
        LooseNumber::Null => f64::NAN,
    })
}

/// Errors raised by the chart engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GlucoseError {
    #[error("invalid timestamp {0}")]
    InvalidTimestamp(String),
    #[error("unknown window `{0}`")]
    UnknownWindow(String),
    #[error("cannot classify non-finite value {0}")]
    InvalidValue(f64),
    #[error("window start {start} lies after its end {end}")]
    InvertedWindow {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
    #[error("window `{0}` reaches outside the representable time range")]
    OutOfRange(WindowToken),
    #[error("unknown display timezone `{0}`")]
    UnknownTimezone(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measurement_decodes_loose_wire_shapes() {
        let json = r#"[
            {"id": 7, "value": 5.4, "timestamp": 1700000000, "source": "DEVICE_SYNCED"},
            {"id": "abc", "value": "6.1", "timestamp": "2024-01-01T00:00:00"},
            {"value": null, "timestamp": null, "source": "HEALTH_CONNECT"},
            {"value": 4.2}
        ]"#;
        let records: Vec<Measurement> = serde_json::from_str(json).unwrap();

        assert_eq!(records[0].id, Some(RecordId::Numeric(7)));
        assert_eq!(records[0].timestamp, RawTimestamp::Integer(1_700_000_000));
        assert_eq!(records[0].source, Some(MeasurementSource::DeviceSynced));

        assert_eq!(records[1].id, Some(RecordId::Text("abc".into())));
        assert!((records[1].value - 6.1).abs() < f64::EPSILON);
        assert_eq!(
            records[1].timestamp,
            RawTimestamp::Text("2024-01-01T00:00:00".into())
        );

        assert!(records[2].value.is_nan());
        assert_eq!(records[2].timestamp, RawTimestamp::Missing);
        assert_eq!(
            records[2].source,
            Some(MeasurementSource::Other("HEALTH_CONNECT".into()))
        );

        assert_eq!(records[3].timestamp, RawTimestamp::Missing);
        assert_eq!(records[3].source, None);
    }

    #[test]
    fn source_serializes_with_wire_spelling() {
        let json = serde_json::to_string(&MeasurementSource::ManualEntry).unwrap();
        assert_eq!(json, "\"MANUAL_ENTRY\"");
    }

    #[test]
    fn partial_config_keeps_defaults() {
        let config: ChartConfig = serde_json::from_str(r#"{"locale": "en"}"#).unwrap();
        assert_eq!(config.locale, Locale::English);
        assert_eq!(config.refresh_interval(), Duration::from_secs(60));
        assert_eq!(config.default_window, WindowToken::SixHours);
        assert!(config.display_zone().is_ok());
    }

    #[test]
    fn refresh_interval_is_clamped() {
        let interval = |secs| {
            ChartConfig {
                refresh_interval_secs: secs,
                ..ChartConfig::default()
            }
            .refresh_interval()
        };
        assert_eq!(interval(0), Duration::from_secs(1));
        assert_eq!(interval(300), Duration::from_secs(300));
        assert_eq!(interval(u64::MAX), Duration::from_secs(MAX_REFRESH_INTERVAL_SECS));
    }

    #[test]
    fn unknown_zone_is_reported() {
        let config = ChartConfig {
            display_timezone: "Mars/Olympus".into(),
            ..ChartConfig::default()
        };
        assert_eq!(
            config.display_zone(),
            Err(GlucoseError::UnknownTimezone("Mars/Olympus".into()))
        );
    }
}
