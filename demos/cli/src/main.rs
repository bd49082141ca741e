use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::Utc;
use clap::Parser;
use glucose_core::band::classify;
use glucose_core::label::{relative_label_or_never, value_label};
use glucose_core::{ChartConfig, ChartView, LabelFormatter, Measurement, RawTimestamp, WindowToken};
use glucose_feed::{
    parse_measurements_str, Dashboard, ErrorInfo, FeedError, MeasurementStore, NewMeasurement,
    ViewMode,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "glucose-cli",
    about = "Build a glucose chart view from a JSON measurement dump."
)]
struct Args {
    /// Path to the measurements (an array or a `{ "data": [...] }` envelope).
    #[arg(short, long)]
    input: PathBuf,

    /// Chart window: 6h, 24h, 7d, 30d or 180d.
    #[arg(short, long)]
    window: Option<String>,

    /// Evaluation instant, any timestamp the engine understands. Defaults to now.
    #[arg(long)]
    now: Option<String>,

    /// JSON file with chart settings; missing keys keep their defaults.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Print the full chart view as JSON.
    #[arg(long)]
    json: bool,

    /// Re-read the input on the refresh interval until interrupted.
    #[arg(long)]
    watch: bool,
}

/// Serves measurements from a file on disk. Read only.
struct FileStore {
    path: PathBuf,
}

#[async_trait]
impl MeasurementStore for FileStore {
    async fn fetch_recent(&self) -> Result<Vec<Measurement>, FeedError> {
        let data = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|err| {
                FeedError::Api(ErrorInfo {
                    message: format!("could not read {}: {err}", self.path.display()),
                    status: None,
                })
            })?;
        parse_measurements_str(&data)
    }

    async fn submit(&self, _input: NewMeasurement) -> Result<Measurement, FeedError> {
        Err(FeedError::ReadOnly)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => {
            let data = std::fs::read_to_string(path)
                .with_context(|| format!("Could not read config {path:?}"))?;
            serde_json::from_str::<ChartConfig>(&data)
                .with_context(|| format!("Invalid config {path:?}"))?
        }
        None => ChartConfig::default(),
    };
    let formatter = LabelFormatter::from_config(&config)?;

    let token = match args.window.as_deref() {
        Some(token) => token.parse::<WindowToken>()?,
        None => config.default_window,
    };
    let fixed_now = args
        .now
        .as_deref()
        .map(|now| glucose_core::normalize(&RawTimestamp::from(now)))
        .transpose()
        .context("Could not read --now")?;

    let store = Arc::new(FileStore {
        path: args.input.clone(),
    });
    let dashboard = Dashboard::new(store, config.clone(), ViewMode::Owner);
    dashboard.select_window(token);
    tracing::info!(
        window = %token,
        mode = ?dashboard.mode(),
        input = ?args.input,
        watch = args.watch,
        "loading measurements"
    );

    if !args.watch {
        dashboard
            .refresh()
            .await
            .with_context(|| format!("Could not load measurements from {:?}", args.input))?;
        let view = dashboard.view(fixed_now.unwrap_or_else(Utc::now))?;
        print_view(&view, &formatter, args.json)?;
        return Ok(());
    }

    let handle = dashboard.open();
    let start = tokio::time::Instant::now() + Duration::from_millis(250);
    let mut ticker = tokio::time::interval_at(start, dashboard.config().refresh_interval());
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                if let Some(err) = dashboard.last_error() {
                    eprintln!("Refresh failed, showing previous data: {err}");
                }
                let view = dashboard.view(fixed_now.unwrap_or_else(Utc::now))?;
                print_view(&view, &formatter, args.json)?;
                eprintln!(
                    "Last refresh: {}",
                    relative_label_or_never(dashboard.refreshed_at(), Utc::now(), formatter.locale())
                );
            }
            _ = tokio::signal::ctrl_c() => break,
        }
    }
    handle.shutdown().await;

    Ok(())
}

fn print_view(view: &ChartView, formatter: &LabelFormatter, json: bool) -> anyhow::Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(view)?);
        return Ok(());
    }

    println!("{}", view.title);
    let selector: Vec<String> = view
        .windows
        .iter()
        .map(|option| {
            if option.selected {
                format!("[{}]", option.caption)
            } else {
                option.caption.to_string()
            }
        })
        .collect();
    println!("{}", selector.join(" "));
    println!(
        "Window: {} .. {}",
        formatter.tooltip(view.window.start),
        formatter.tooltip(view.window.end)
    );
    println!("Points: {} (skipped {})", view.points.len(), view.skipped);
    if let Some(tir) = view.bands.time_in_range() {
        println!("Time in range: {tir:.0}%");
    }
    println!("Ticks: {}", view.tick_labels.join(" | "));

    if view.is_empty() {
        println!("  No measurements in this window.");
    }

    for point in &view.points {
        let band = classify(point.value)
            .map(|band| format!("{band:?}"))
            .unwrap_or_else(|_| "-".to_string());
        println!(
            "  {:<24} {:>12}  {}",
            formatter.tooltip(point.instant),
            value_label(point.value),
            band
        );
    }

    Ok(())
}
