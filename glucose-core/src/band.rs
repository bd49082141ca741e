//! Clinical bands for glucose values in mmol/L.

use serde::{Deserialize, Serialize};

use crate::series::NormalizedPoint;
use crate::GlucoseError;

/// Lowest value that is still in target.
pub const TARGET_LOWER: f64 = 3.9;
/// Lowest value that counts as high.
pub const HIGH_LOWER: f64 = 10.0;
/// Top of the overlay area; values above are clipped visually only.
pub const DISPLAY_CEILING: f64 = 20.0;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClinicalBand {
    Low,
    Target,
    High,
}

/// Classify a glucose value. Target is the half-open range `[3.9, 10.0)`.
pub fn classify(value: f64) -> Result<ClinicalBand, GlucoseError> {
    if !value.is_finite() {
        return Err(GlucoseError::InvalidValue(value));
    }
    Ok(if value < TARGET_LOWER {
        ClinicalBand::Low
    } else if value < HIGH_LOWER {
        ClinicalBand::Target
    } else {
        ClinicalBand::High
    })
}

/// A static overlay rectangle spanning the vertical extent of one band.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct BandRegion {
    pub band: ClinicalBand,
    pub lower: f64,
    pub upper: f64,
}

/// Overlay regions from the axis floor up to [`DISPLAY_CEILING`].
pub fn overlay_regions() -> [BandRegion; 3] {
    [
        BandRegion {
            band: ClinicalBand::Low,
            lower: 0.0,
            upper: TARGET_LOWER,
        },
        BandRegion {
            band: ClinicalBand::Target,
            lower: TARGET_LOWER,
            upper: HIGH_LOWER,
        },
        BandRegion {
            band: ClinicalBand::High,
            lower: HIGH_LOWER,
            upper: DISPLAY_CEILING,
        },
    ]
}

/// Clip a value to the overlay ceiling for drawing.
pub fn display_value(value: f64) -> f64 {
    value.min(DISPLAY_CEILING)
}

/// How the points of a series spread over the bands.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BandSummary {
    pub low: usize,
    pub target: usize,
    pub high: usize,
    /// Points whose value is not a finite number.
    pub invalid: usize,
}

impl BandSummary {
    /// Number of classified points.
    pub fn classified(&self) -> usize {
        self.low + self.target + self.high
    }

    pub fn count(&self, band: ClinicalBand) -> usize {
        match band {
            ClinicalBand::Low => self.low,
            ClinicalBand::Target => self.target,
            ClinicalBand::High => self.high,
        }
    }

    /// Share of classified points in `band`, in percent.
    pub fn percentage(&self, band: ClinicalBand) -> Option<f64> {
        match self.classified() {
            0 => None,
            total => Some(self.count(band) as f64 * 100.0 / total as f64),
        }
    }

    /// Share of points in target, the "time in range" figure.
    pub fn time_in_range(&self) -> Option<f64> {
        self.percentage(ClinicalBand::Target)
    }
}

pub fn summarize(points: &[NormalizedPoint]) -> BandSummary {
    points
        .iter()
        .fold(BandSummary::default(), |mut summary, point| {
            match classify(point.value) {
                Ok(ClinicalBand::Low) => summary.low += 1,
                Ok(ClinicalBand::Target) => summary.target += 1,
                Ok(ClinicalBand::High) => summary.high += 1,
                Err(_) => summary.invalid += 1,
            }
            summary
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Measurement;
    use chrono::Utc;

    #[test]
    fn boundaries() {
        assert_eq!(classify(3.9).unwrap(), ClinicalBand::Target);
        assert_eq!(classify(3.89).unwrap(), ClinicalBand::Low);
        assert_eq!(classify(10.0).unwrap(), ClinicalBand::High);
        assert_eq!(classify(9.99).unwrap(), ClinicalBand::Target);
    }

    #[test]
    fn extremes_are_not_reclassified() {
        assert_eq!(classify(-1.0).unwrap(), ClinicalBand::Low);
        assert_eq!(classify(35.0).unwrap(), ClinicalBand::High);
        assert_eq!(display_value(35.0), DISPLAY_CEILING);
        assert_eq!(display_value(12.5), 12.5);
    }

    #[test]
    fn non_finite_values_fail() {
        assert!(matches!(classify(f64::NAN), Err(GlucoseError::InvalidValue(_))));
        assert_eq!(
            classify(f64::INFINITY),
            Err(GlucoseError::InvalidValue(f64::INFINITY))
        );
    }

    #[test]
    fn overlay_regions_tile_up_to_the_ceiling() {
        let regions = overlay_regions();
        assert_eq!(regions[0].lower, 0.0);
        assert!(regions.windows(2).all(|pair| pair[0].upper == pair[1].lower));
        assert_eq!(regions[2].upper, DISPLAY_CEILING);
    }

    #[test]
    fn summary_counts_and_percentages() {
        let point = |value: f64| NormalizedPoint {
            value,
            instant: Utc::now(),
            source: Measurement::new(value, 0_i64),
        };
        let points = vec![point(3.0), point(5.0), point(6.0), point(12.0), point(f64::NAN)];
        let summary = summarize(&points);
        assert_eq!(
            summary,
            BandSummary {
                low: 1,
                target: 2,
                high: 1,
                invalid: 1
            }
        );
        assert_eq!(summary.time_in_range(), Some(50.0));
        assert_eq!(summarize(&[]).time_in_range(), None);
    }
}
