//! Axis ticks anchored to the live end of a window.
//!
//! Ticks are laid out backwards from `end` rather than on a calendar grid, so
//! they move with every refresh.

use chrono::{DateTime, Utc};

use crate::window::{Window, WindowToken};
use crate::GlucoseError;

/// Generate strictly ascending ticks from `start` to `end`, both included.
pub fn generate(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    token: WindowToken,
) -> Result<Vec<DateTime<Utc>>, GlucoseError> {
    if start > end {
        return Err(GlucoseError::InvertedWindow { start, end });
    }

    let step = token.tick_step();
    let mut ticks = vec![end];
    let mut cursor = end;
    while let Some(next) = cursor
        .checked_sub_signed(step)
        .filter(|next| *next >= start)
    {
        ticks.push(next);
        cursor = next;
    }

    if cursor > start {
        ticks.push(start);
    }

    ticks.reverse();
    Ok(ticks)
}

impl Window {
    /// Ticks for this window at the resolution of `token`.
    pub fn ticks(&self, token: WindowToken) -> Result<Vec<DateTime<Utc>>, GlucoseError> {
        generate(self.start, self.end, token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::window::resolve;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 20, 9, 17, 42).unwrap()
    }

    fn assert_well_formed(ticks: &[DateTime<Utc>], window: &Window) {
        assert_eq!(ticks.first(), Some(&window.start));
        assert_eq!(ticks.last(), Some(&window.end));
        assert!(ticks.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn every_token_yields_bounded_ascending_ticks() {
        for token in WindowToken::ALL {
            let window = resolve(token, now()).unwrap();
            let ticks = window.ticks(token).unwrap();
            assert_well_formed(&ticks, &window);
        }
    }

    #[test]
    fn six_hours_divides_evenly() {
        let window = resolve(WindowToken::SixHours, now()).unwrap();
        let ticks = window.ticks(WindowToken::SixHours).unwrap();
        let expected: Vec<_> = (0..=3)
            .rev()
            .map(|n| now() - Duration::hours(2 * n))
            .collect();
        assert_eq!(ticks, expected);
    }

    #[test]
    fn start_is_synthesized_when_steps_overshoot() {
        // A 31-day month with 7-day steps leaves a 3-day gap before start.
        let now = Utc.with_ymd_and_hms(2024, 8, 31, 12, 0, 0).unwrap();
        let window = resolve(WindowToken::Month, now).unwrap();
        let ticks = window.ticks(WindowToken::Month).unwrap();
        assert_well_formed(&ticks, &window);
        assert_eq!(ticks.len(), 6);
        assert_eq!(ticks[1] - ticks[0], Duration::days(3));
        assert!(ticks[1..].windows(2).all(|pair| pair[1] - pair[0] == Duration::days(7)));
    }

    #[test]
    fn ticks_follow_the_live_end() {
        let first = generate(now() - Duration::hours(24), now(), WindowToken::Day).unwrap();
        let later = now() + Duration::minutes(1);
        let second = generate(later - Duration::hours(24), later, WindowToken::Day).unwrap();
        assert_eq!(first.len(), second.len());
        assert!(first
            .iter()
            .zip(&second)
            .all(|(a, b)| *b - *a == Duration::minutes(1)));
    }

    #[test]
    fn degenerate_window_is_a_single_tick() {
        assert_eq!(generate(now(), now(), WindowToken::Week).unwrap(), vec![now()]);
    }

    #[test]
    fn inverted_window_fails() {
        let err = generate(now(), now() - Duration::seconds(1), WindowToken::Day).unwrap_err();
        assert!(matches!(err, GlucoseError::InvertedWindow { .. }));
    }
}
