//! Human-facing labels: relative ages, axis and tooltip dates, titles.
//!
//! Nothing here feeds back into computation.

use chrono::{DateTime, Datelike, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use crate::timestamp::normalize;
use crate::window::WindowToken;
use crate::{ChartConfig, GlucoseError, RawTimestamp};

/// Language of the generated labels.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Locale {
    #[default]
    #[serde(rename = "nl")]
    Dutch,
    #[serde(rename = "en")]
    English,
}

const PLACEHOLDER: &str = "—";

const MONTHS_SHORT_NL: [&str; 12] = [
    "jan", "feb", "mrt", "apr", "mei", "jun", "jul", "aug", "sep", "okt", "nov", "dec",
];
const MONTHS_LONG_NL: [&str; 12] = [
    "januari", "februari", "maart", "april", "mei", "juni", "juli", "augustus", "september",
    "oktober", "november", "december",
];
const MONTHS_SHORT_EN: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];
const MONTHS_LONG_EN: [&str; 12] = [
    "January", "February", "March", "April", "May", "June", "July", "August", "September",
    "October", "November", "December",
];

#[derive(Debug, Clone, Copy)]
enum AgeUnit {
    Year,
    Month,
    Day,
    Hour,
    Minute,
}

/// Seconds per unit; months are 30 days and years 365.
const AGE_UNITS: [(i64, AgeUnit); 5] = [
    (31_536_000, AgeUnit::Year),
    (2_592_000, AgeUnit::Month),
    (86_400, AgeUnit::Day),
    (3_600, AgeUnit::Hour),
    (60, AgeUnit::Minute),
];

/// Age of `instant` relative to `now`, e.g. "3 dagen geleden".
///
/// The largest unit that fits more than once wins; anything up to one
/// minute old, or in the future, is "just now".
pub fn relative_label(instant: DateTime<Utc>, now: DateTime<Utc>, locale: Locale) -> String {
    let seconds = (now - instant).num_milliseconds().div_euclid(1000);
    AGE_UNITS
        .iter()
        .find(|(unit_seconds, _)| seconds > *unit_seconds)
        .map(|(unit_seconds, unit)| age_phrase(*unit, seconds / unit_seconds, locale))
        .unwrap_or_else(|| just_now(locale).to_string())
}

/// [`relative_label`] for an optional instant; `None` reads as "never".
pub fn relative_label_or_never(
    instant: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
    locale: Locale,
) -> String {
    match instant {
        Some(instant) => relative_label(instant, now, locale),
        None => match locale {
            Locale::Dutch => "Nooit".to_string(),
            Locale::English => "Never".to_string(),
        },
    }
}

fn just_now(locale: Locale) -> &'static str {
    match locale {
        Locale::Dutch => "Zojuist",
        Locale::English => "Just now",
    }
}

fn age_phrase(unit: AgeUnit, count: i64, locale: Locale) -> String {
    let one = count == 1;
    let noun = match (locale, unit) {
        (Locale::Dutch, AgeUnit::Year) => "jaar",
        (Locale::Dutch, AgeUnit::Month) if one => "maand",
        (Locale::Dutch, AgeUnit::Month) => "maanden",
        (Locale::Dutch, AgeUnit::Day) if one => "dag",
        (Locale::Dutch, AgeUnit::Day) => "dagen",
        (Locale::Dutch, AgeUnit::Hour) => "uur",
        (Locale::Dutch, AgeUnit::Minute) if one => "minuut",
        (Locale::Dutch, AgeUnit::Minute) => "minuten",
        (Locale::English, AgeUnit::Year) if one => "year",
        (Locale::English, AgeUnit::Year) => "years",
        (Locale::English, AgeUnit::Month) if one => "month",
        (Locale::English, AgeUnit::Month) => "months",
        (Locale::English, AgeUnit::Day) if one => "day",
        (Locale::English, AgeUnit::Day) => "days",
        (Locale::English, AgeUnit::Hour) if one => "hour",
        (Locale::English, AgeUnit::Hour) => "hours",
        (Locale::English, AgeUnit::Minute) if one => "minute",
        (Locale::English, AgeUnit::Minute) => "minutes",
    };
    match locale {
        Locale::Dutch => format!("{count} {noun} geleden"),
        Locale::English => format!("{count} {noun} ago"),
    }
}

/// Glucose value with its unit, one decimal.
pub fn value_label(value: f64) -> String {
    if value.is_finite() {
        format!("{value:.1} mmol/L")
    } else {
        PLACEHOLDER.to_string()
    }
}

/// Renders dates and times in one display zone and language.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelFormatter {
    zone: Tz,
    locale: Locale,
}

impl LabelFormatter {
    pub fn new(zone: Tz, locale: Locale) -> Self {
        Self { zone, locale }
    }

    pub fn from_config(config: &ChartConfig) -> Result<Self, GlucoseError> {
        Ok(Self::new(config.display_zone()?, config.locale))
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    pub fn relative(&self, instant: DateTime<Utc>, now: DateTime<Utc>) -> String {
        relative_label(instant, now, self.locale)
    }

    /// Axis label, coarser for longer windows.
    pub fn tick(&self, instant: DateTime<Utc>, token: WindowToken) -> String {
        let local = instant.with_timezone(&self.zone);
        match token {
            WindowToken::SixHours | WindowToken::Day => local.format("%H:%M").to_string(),
            WindowToken::Week => format!("{} {}", local.day(), self.month_short(local.month0())),
            WindowToken::Month | WindowToken::HalfYear => match self.locale {
                Locale::Dutch => format!("{}-{}", local.day(), local.month()),
                Locale::English => format!("{}/{}", local.day(), local.month()),
            },
        }
    }

    pub fn ticks(&self, ticks: &[DateTime<Utc>], token: WindowToken) -> Vec<String> {
        ticks.iter().map(|tick| self.tick(*tick, token)).collect()
    }

    /// Tooltip caption, e.g. "1 januari, 12:00".
    pub fn tooltip(&self, instant: DateTime<Utc>) -> String {
        let local = instant.with_timezone(&self.zone);
        format!(
            "{} {}, {}",
            local.day(),
            self.month_long(local.month0()),
            local.format("%H:%M")
        )
    }

    /// Timestamp column of the measurement table; unparseable input gives "—".
    pub fn table_timestamp(&self, raw: &RawTimestamp) -> String {
        let Ok(instant) = normalize(raw) else {
            return PLACEHOLDER.to_string();
        };
        let local = instant.with_timezone(&self.zone);
        match self.locale {
            Locale::Dutch => local.format("%d-%m-%Y %H:%M").to_string(),
            Locale::English => local.format("%d/%m/%Y, %H:%M").to_string(),
        }
    }

    pub fn chart_title(&self, token: WindowToken) -> String {
        let span = match (self.locale, token) {
            (Locale::Dutch, WindowToken::SixHours) => "laatste 6 uur",
            (Locale::Dutch, WindowToken::Day) => "laatste 24 uur",
            (Locale::Dutch, WindowToken::Week) => "laatste 7 dagen",
            (Locale::Dutch, WindowToken::Month) => "laatste 30 dagen",
            (Locale::Dutch, WindowToken::HalfYear) => "laatste 6 maanden",
            (Locale::English, WindowToken::SixHours) => "last 6 hours",
            (Locale::English, WindowToken::Day) => "last 24 hours",
            (Locale::English, WindowToken::Week) => "last 7 days",
            (Locale::English, WindowToken::Month) => "last 30 days",
            (Locale::English, WindowToken::HalfYear) => "last 6 months",
        };
        match self.locale {
            Locale::Dutch => format!("Glucoseverloop ({span})"),
            Locale::English => format!("Glucose trend ({span})"),
        }
    }

    fn month_short(&self, month0: u32) -> &'static str {
        match self.locale {
            Locale::Dutch => MONTHS_SHORT_NL[month0 as usize],
            Locale::English => MONTHS_SHORT_EN[month0 as usize],
        }
    }

    fn month_long(&self, month0: u32) -> &'static str {
        match self.locale {
            Locale::Dutch => MONTHS_LONG_NL[month0 as usize],
            Locale::English => MONTHS_LONG_EN[month0 as usize],
        }
    }
}

impl Default for LabelFormatter {
    fn default() -> Self {
        Self::new(chrono_tz::Europe::Amsterdam, Locale::Dutch)
    }
}
