//! Relative chart windows and their resolution against "now".

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};

use crate::GlucoseError;

/// Named span ending at the moment the chart is evaluated.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default,
)]
pub enum WindowToken {
    #[default]
    #[serde(rename = "6h")]
    SixHours,
    #[serde(rename = "24h")]
    Day,
    #[serde(rename = "7d")]
    Week,
    #[serde(rename = "30d")]
    Month,
    #[serde(rename = "180d")]
    HalfYear,
}

impl WindowToken {
    pub const ALL: [WindowToken; 5] = [
        WindowToken::SixHours,
        WindowToken::Day,
        WindowToken::Week,
        WindowToken::Month,
        WindowToken::HalfYear,
    ];

    /// Wire spelling of the token.
    pub fn as_str(self) -> &'static str {
        match self {
            WindowToken::SixHours => "6h",
            WindowToken::Day => "24h",
            WindowToken::Week => "7d",
            WindowToken::Month => "30d",
            WindowToken::HalfYear => "180d",
        }
    }

    /// Short caption for the window selector buttons.
    pub fn label(self) -> &'static str {
        match self {
            WindowToken::SixHours => "6U",
            WindowToken::Day => "24U",
            WindowToken::Week => "7D",
            WindowToken::Month => "1M",
            WindowToken::HalfYear => "6M",
        }
    }

    /// Distance between two axis ticks.
    pub fn tick_step(self) -> Duration {
        match self {
            WindowToken::SixHours => Duration::hours(2),
            WindowToken::Day => Duration::hours(4),
            WindowToken::Week => Duration::days(1),
            WindowToken::Month => Duration::days(7),
            WindowToken::HalfYear => Duration::days(30),
        }
    }
}

impl fmt::Display for WindowToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WindowToken {
    type Err = GlucoseError;

    fn from_str(token: &str) -> Result<Self, Self::Err> {
        WindowToken::ALL
            .into_iter()
            .find(|candidate| candidate.as_str() == token)
            .ok_or_else(|| GlucoseError::UnknownWindow(token.to_string()))
    }
}

/// Absolute bounds of a resolved window, both inclusive.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Window {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Window {
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        self.start <= instant && instant <= self.end
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }
}

/// Resolve `token` to the window ending at `now`.
///
/// Hour and day windows subtract a fixed duration. The month windows use
/// calendar arithmetic; a day missing from the target month clamps to that
/// month's last day (31 March minus one month is 29 February in a leap year).
pub fn resolve(token: WindowToken, now: DateTime<Utc>) -> Result<Window, GlucoseError> {
    let start = match token {
        WindowToken::SixHours => now.checked_sub_signed(Duration::hours(6)),
        WindowToken::Day => now.checked_sub_signed(Duration::hours(24)),
        WindowToken::Week => now.checked_sub_signed(Duration::days(7)),
        WindowToken::Month => now.checked_sub_months(Months::new(1)),
        WindowToken::HalfYear => now.checked_sub_months(Months::new(6)),
    }
    .ok_or(GlucoseError::OutOfRange(token))?;

    Ok(Window { start, end: now })
}

/// Like [`resolve`], for a token still in its wire form.
pub fn resolve_str(token: &str, now: DateTime<Utc>) -> Result<Window, GlucoseError> {
    resolve(token.parse()?, now)
}
