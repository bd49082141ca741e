//! Builds the chart series for one window from raw measurements.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::timestamp::normalize;
use crate::window::Window;
use crate::{GlucoseError, Measurement, RecordId};

/// A measurement placed on the time axis.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NormalizedPoint {
    pub value: f64,
    pub instant: DateTime<Utc>,
    pub source: Measurement,
}

/// A record left out of the series because its timestamp did not normalize.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RejectedRecord {
    /// Position of the record in the input slice.
    pub index: usize,
    pub id: Option<RecordId>,
    #[serde(serialize_with = "serialize_error")]
    pub error: GlucoseError,
}

/// Outcome of a series build, including what had to be skipped.
#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct SeriesReport {
    pub points: Vec<NormalizedPoint>,
    pub rejected: Vec<RejectedRecord>,
}

/// Place a single record on the time axis.
pub fn normalize_record(record: &Measurement) -> Result<NormalizedPoint, GlucoseError> {
    let instant = normalize(&record.timestamp)?;
    Ok(NormalizedPoint {
        value: record.value,
        instant,
        source: record.clone(),
    })
}

/// Points of `records` that fall inside `window`, ordered by instant.
///
/// Records whose timestamp cannot be normalized are logged and skipped.
pub fn build(records: &[Measurement], window: &Window) -> Vec<NormalizedPoint> {
    build_report(records, window).points
}

/// Same as [`build`], also returning the rejected records.
///
/// The sort is stable: records sharing an instant keep their input order.
pub fn build_report(records: &[Measurement], window: &Window) -> SeriesReport {
    let mut report = SeriesReport::default();

    for (index, record) in records.iter().enumerate() {
        match normalize_record(record) {
            Ok(point) if window.contains(point.instant) => report.points.push(point),
            Ok(_) => {}
            Err(error) => {
                warn!(
                    index,
                    id = ?record.id,
                    error = %error,
                    "skipping measurement with unusable timestamp"
                );
                report.rejected.push(RejectedRecord {
                    index,
                    id: record.id.clone(),
                    error,
                });
            }
        }
    }

    report.points.sort_by_key(|point| point.instant);

    debug!(
        total = records.len(),
        kept = report.points.len(),
        rejected = report.rejected.len(),
        start = %window.start,
        end = %window.end,
        "built glucose series"
    );

    report
}

fn serialize_error<S>(error: &GlucoseError, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.collect_str(error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::{resolve, WindowToken};
    use chrono::{Duration, TimeZone};

    fn window() -> Window {
        let now = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        resolve(WindowToken::SixHours, now).unwrap()
    }

    #[test]
    fn keeps_only_points_inside_the_window() {
        let w = window();
        let records = vec![
            Measurement::new(5.0, w.start.timestamp_millis()),
            Measurement::new(6.0, (w.start - Duration::milliseconds(1)).timestamp_millis()),
            Measurement::new(7.0, w.end.timestamp_millis()),
            Measurement::new(8.0, (w.end + Duration::seconds(1)).timestamp()),
        ];
        let points = build(&records, &w);
        let values: Vec<f64> = points.iter().map(|p| p.value).collect();
        assert_eq!(values, vec![5.0, 7.0]);
        assert!(points.iter().all(|p| w.contains(p.instant)));
    }

    #[test]
    fn sorts_ascending_and_keeps_tie_order() {
        let w = window();
        let records = vec![
            Measurement::new(9.0, "2024-01-01T11:00:00Z").with_id(1),
            Measurement::new(4.0, "2024-01-01T08:00:00").with_id(2),
            Measurement::new(5.0, "2024-01-01T09:00:00+01:00").with_id(3),
            Measurement::new(6.0, "2024-01-01T08:00:00Z").with_id(4),
        ];
        let ids: Vec<_> = build(&records, &w)
            .into_iter()
            .filter_map(|p| p.source.id)
            .collect();
        assert_eq!(
            ids,
            vec![
                RecordId::Numeric(2),
                RecordId::Numeric(3),
                RecordId::Numeric(4),
                RecordId::Numeric(1)
            ]
        );
    }

    #[test]
    fn malformed_records_are_reported_not_fatal() {
        let w = window();
        let records = vec![
            Measurement::new(5.5, "2024-01-01T10:00:00Z").with_id("ok"),
            Measurement::new(2.0, "bad-date").with_id("broken"),
            Measurement::new(3.0, crate::RawTimestamp::Missing),
        ];
        let report = build_report(&records, &w);
        assert_eq!(report.points.len(), 1);
        assert_eq!(report.rejected.len(), 2);
        assert_eq!(report.rejected[0].index, 1);
        assert_eq!(report.rejected[0].id, Some(RecordId::Text("broken".into())));
        assert!(matches!(
            report.rejected[1].error,
            GlucoseError::InvalidTimestamp(_)
        ));
    }

    #[test]
    fn empty_input_gives_empty_series() {
        assert!(build(&[], &window()).is_empty());
    }
}
