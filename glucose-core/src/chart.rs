//! One full recomputation of the chart for the selected window.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::band::{overlay_regions, summarize, BandRegion, BandSummary};
use crate::label::LabelFormatter;
use crate::series::{build_report, NormalizedPoint};
use crate::ticks::generate;
use crate::window::{resolve, Window, WindowToken};
use crate::{ChartConfig, GlucoseError, Measurement};

/// Everything the view layer needs to draw the glucose chart.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChartView {
    pub generated_at: DateTime<Utc>,
    pub token: WindowToken,
    pub title: String,
    /// Selector buttons, one per window, in display order.
    pub windows: Vec<WindowOption>,
    pub window: Window,
    pub points: Vec<NormalizedPoint>,
    pub ticks: Vec<DateTime<Utc>>,
    pub tick_labels: Vec<String>,
    pub overlays: Vec<BandRegion>,
    pub bands: BandSummary,
    /// Records dropped because their timestamp could not be read.
    pub skipped: usize,
}

impl ChartView {
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct WindowOption {
    pub token: WindowToken,
    pub caption: &'static str,
    pub selected: bool,
}

/// Captions for the window selector with `selected` marked.
pub fn window_options(selected: WindowToken) -> Vec<WindowOption> {
    WindowToken::ALL
        .into_iter()
        .map(|token| WindowOption {
            token,
            caption: token.label(),
            selected: token == selected,
        })
        .collect()
}

/// Resolve the window, build the series and lay out the axis.
///
/// Bad records are skipped; a window or tick failure aborts the whole view.
pub fn build_chart_view(
    records: &[Measurement],
    token: WindowToken,
    now: DateTime<Utc>,
    config: &ChartConfig,
) -> Result<ChartView, GlucoseError> {
    let formatter = LabelFormatter::from_config(config)?;
    let window = resolve(token, now)?;
    let ticks = generate(window.start, window.end, token)?;
    let report = build_report(records, &window);

    Ok(ChartView {
        generated_at: now,
        token,
        title: formatter.chart_title(token),
        windows: window_options(token),
        window,
        tick_labels: formatter.ticks(&ticks, token),
        ticks,
        overlays: overlay_regions().to_vec(),
        bands: summarize(&report.points),
        skipped: report.rejected.len(),
        points: report.points,
    })
}
