//! Keeps a dashboard's measurements fresh and recomputes its chart on demand.
//!
//! A refresh always replaces the cached records as a whole. When a fetch
//! fails the previous records stay in place until the next successful cycle,
//! so the chart is stale at worst, never half updated. Switching windows only
//! reruns the pure pipeline against the cache.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use glucose_core::{build_chart_view, ChartConfig, ChartView, Measurement, WindowToken};
use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::store::{FeedError, MeasurementStore, NewMeasurement};

/// Who is looking at the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewMode {
    /// The account holder: refreshed periodically, may submit measurements.
    Owner,
    /// A caregiver viewing someone else's data: fetched once, read only.
    Delegated,
}

#[derive(Debug, Default)]
struct DashboardState {
    records: Vec<Measurement>,
    token: WindowToken,
    refreshed_at: Option<DateTime<Utc>>,
    last_error: Option<FeedError>,
}

/// Cached measurements plus the selected window for one dashboard.
pub struct Dashboard<S> {
    store: Arc<S>,
    state: Arc<RwLock<DashboardState>>,
    /// Held for the whole fetch so results are applied in request order.
    refresh_gate: Arc<Mutex<()>>,
    config: ChartConfig,
    mode: ViewMode,
}

impl<S: MeasurementStore + 'static> Dashboard<S> {
    pub fn new(store: Arc<S>, config: ChartConfig, mode: ViewMode) -> Self {
        let state = DashboardState {
            token: config.default_window,
            ..DashboardState::default()
        };
        Self {
            store,
            state: Arc::new(RwLock::new(state)),
            refresh_gate: Arc::new(Mutex::new(())),
            config,
            mode,
        }
    }

    pub fn mode(&self) -> ViewMode {
        self.mode
    }

    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Fetch once and replace the cached records.
    pub async fn refresh(&self) -> Result<usize, FeedError> {
        refresh_once(self.store.as_ref(), &self.state, &self.refresh_gate).await
    }

    /// Load the dashboard and, for owners, keep refreshing it.
    ///
    /// The first fetch happens right away. Owners then refetch every
    /// [`ChartConfig::refresh_interval`]; delegated views stop after the
    /// first fetch. Dropping the returned handle cancels the schedule.
    pub fn open(&self) -> RefreshHandle {
        let (stop_tx, mut stop_rx) = watch::channel(false);
        let store = Arc::clone(&self.store);
        let state = Arc::clone(&self.state);
        let gate = Arc::clone(&self.refresh_gate);
        let interval = self.config.refresh_interval();
        let mode = self.mode;

        let task = tokio::spawn(async move {
            let mut timer = tokio::time::interval(interval);
            loop {
                tokio::select! {
                    _ = timer.tick() => {}
                    _ = stop_rx.changed() => break,
                }
                tokio::select! {
                    _ = refresh_once(store.as_ref(), &state, &gate) => {}
                    _ = stop_rx.changed() => break,
                }
                if mode == ViewMode::Delegated {
                    break;
                }
            }
            debug!(?mode, "dashboard refresh stopped");
        });

        info!(?mode, interval_secs = interval.as_secs(), "dashboard opened");
        RefreshHandle {
            stop_tx,
            task: Some(task),
        }
    }

    /// Select another window. Never triggers a fetch.
    pub fn select_window(&self, token: WindowToken) {
        self.state.write().token = token;
    }

    pub fn window(&self) -> WindowToken {
        self.state.read().token
    }

    /// Recompute the chart for the selected window from the cached records.
    pub fn view(&self, now: DateTime<Utc>) -> Result<ChartView, FeedError> {
        let state = self.state.read();
        Ok(build_chart_view(&state.records, state.token, now, &self.config)?)
    }

    pub fn records(&self) -> Vec<Measurement> {
        self.state.read().records.clone()
    }

    pub fn refreshed_at(&self) -> Option<DateTime<Utc>> {
        self.state.read().refreshed_at
    }

    pub fn last_error(&self) -> Option<FeedError> {
        self.state.read().last_error.clone()
    }

    /// Submit a new measurement and refresh right after it was accepted.
    pub async fn submit(&self, input: NewMeasurement) -> Result<Measurement, FeedError> {
        if self.mode == ViewMode::Delegated {
            return Err(FeedError::ReadOnly);
        }
        let stored = self.store.submit(input).await?;
        // A failed refresh is already recorded in the state.
        let _ = self.refresh().await;
        Ok(stored)
    }
}

async fn refresh_once<S: MeasurementStore + ?Sized>(
    store: &S,
    state: &RwLock<DashboardState>,
    gate: &Mutex<()>,
) -> Result<usize, FeedError> {
    let _turn = gate.lock().await;
    match store.fetch_recent().await {
        Ok(records) => {
            let count = records.len();
            let mut state = state.write();
            state.records = records;
            state.refreshed_at = Some(Utc::now());
            state.last_error = None;
            debug!(count, "measurements refreshed");
            Ok(count)
        }
        Err(err) => {
            warn!(error = %err, "refresh failed, keeping previous measurements");
            state.write().last_error = Some(err.clone());
            Err(err)
        }
    }
}

/// Cancels a dashboard's refresh schedule when stopped or dropped.
pub struct RefreshHandle {
    stop_tx: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl RefreshHandle {
    /// Stop refreshing and wait for an in-flight cycle to wind down.
    pub async fn shutdown(mut self) {
        let _ = self.stop_tx.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        let _ = self.stop_tx.send(true);
    }
}
