//! WASM <-> JavaScript bridge for the glucose chart engine.

use chrono::{DateTime, Utc};
use glucose_core::{ChartConfig, GlucoseError, Locale, RawTimestamp, WindowToken};
use serde::Deserialize;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct JsChartConfig {
    #[serde(default)]
    refresh_interval_secs: Option<u64>,
    #[serde(default)]
    default_window: Option<WindowToken>,
    #[serde(default)]
    display_timezone: Option<String>,
    #[serde(default)]
    locale: Option<Locale>,
}

impl From<JsChartConfig> for ChartConfig {
    fn from(cfg: JsChartConfig) -> Self {
        let mut base = ChartConfig::default();
        if let Some(secs) = cfg.refresh_interval_secs {
            base.refresh_interval_secs = secs;
        }
        if let Some(window) = cfg.default_window {
            base.default_window = window;
        }
        if let Some(zone) = cfg.display_timezone {
            base.display_timezone = zone;
        }
        if let Some(locale) = cfg.locale {
            base.locale = locale;
        }
        base
    }
}

/// Build the chart payload for `window` from the raw store response.
///
/// `records` may be a bare array or the `{ data: [...] }` envelope returned
/// by the store; `now_ms` is the evaluation instant in epoch milliseconds.
#[wasm_bindgen(js_name = buildChart)]
pub fn build_chart(
    records: JsValue,
    window: &str,
    now_ms: f64,
    config: Option<JsValue>,
) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    console_error_panic_hook::set_once();

    let payload = from_value::<serde_json::Value>(records)
        .map_err(|err| JsValue::from_str(&format!("Could not read measurements: {err}")))?;
    let records = glucose_feed::parse_measurements_value(&payload)
        .map_err(|err| JsValue::from_str(&err.to_string()))?;

    let cfg = read_config(config)?;
    let token: WindowToken = window.parse().map_err(to_js_error)?;
    let now = instant_from_millis(now_ms)?;

    let view = glucose_core::build_chart_view(&records, token, now, &cfg).map_err(to_js_error)?;

    to_value(&view).map_err(|err| JsValue::from_str(&format!("Could not serialize chart: {err}")))
}

/// Normalize one raw timestamp to epoch milliseconds.
#[wasm_bindgen(js_name = normalizeTimestamp)]
pub fn normalize_timestamp(raw: JsValue) -> Result<f64, JsValue> {
    let raw: RawTimestamp = if raw.is_null() || raw.is_undefined() {
        RawTimestamp::Missing
    } else {
        from_value(raw)
            .map_err(|err| JsValue::from_str(&format!("Could not read timestamp: {err}")))?
    };
    let instant = glucose_core::normalize(&raw).map_err(to_js_error)?;
    Ok(instant.timestamp_millis() as f64)
}

/// Clinical band of a value: `"LOW"`, `"TARGET"` or `"HIGH"`.
#[wasm_bindgen(js_name = classifyValue)]
pub fn classify_value(value: f64) -> Result<JsValue, JsValue> {
    let band = glucose_core::classify(value).map_err(to_js_error)?;
    to_value(&band).map_err(|err| JsValue::from_str(&err.to_string()))
}

/// Relative age label such as "3 dagen geleden".
#[wasm_bindgen(js_name = relativeLabel)]
pub fn relative_label(
    instant_ms: f64,
    now_ms: f64,
    locale: Option<String>,
) -> Result<String, JsValue> {
    let locale = match locale.as_deref() {
        None | Some("nl") => Locale::Dutch,
        Some("en") => Locale::English,
        Some(other) => return Err(JsValue::from_str(&format!("Unsupported locale `{other}`"))),
    };
    let instant = instant_from_millis(instant_ms)?;
    let now = instant_from_millis(now_ms)?;
    Ok(glucose_core::relative_label(instant, now, locale))
}

fn read_config(config: Option<JsValue>) -> Result<ChartConfig, JsValue> {
    match config {
        Some(js_cfg) if !js_cfg.is_undefined() && !js_cfg.is_null() => {
            let cfg: JsChartConfig = from_value(js_cfg)
                .map_err(|err| JsValue::from_str(&format!("Could not read config: {err}")))?;
            Ok(ChartConfig::from(cfg))
        }
        _ => Ok(ChartConfig::default()),
    }
}

fn instant_from_millis(millis: f64) -> Result<DateTime<Utc>, JsValue> {
    if !millis.is_finite() {
        return Err(JsValue::from_str(&format!("Invalid instant {millis}")));
    }
    DateTime::from_timestamp_millis(millis as i64)
        .ok_or_else(|| JsValue::from_str(&format!("Invalid instant {millis}")))
}

fn to_js_error(err: GlucoseError) -> JsValue {
    JsValue::from_str(&format!("Chart error: {err}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn js_config_overrides_defaults() {
        let cfg = ChartConfig::from(JsChartConfig {
            refresh_interval_secs: None,
            default_window: Some(WindowToken::Week),
            display_timezone: None,
            locale: Some(Locale::English),
        });
        assert_eq!(cfg.default_window, WindowToken::Week);
        assert_eq!(cfg.locale, Locale::English);
        assert_eq!(cfg.refresh_interval_secs, 60);
        assert_eq!(cfg.display_timezone, "Europe/Amsterdam");
    }

    #[test]
    fn relative_label_parses_locale() {
        let now = 1_704_110_400_000.0;
        let label = relative_label(now - 3.0 * 3_600_000.0, now, Some("en".into())).unwrap();
        assert_eq!(label, "3 hours ago");
    }
}
