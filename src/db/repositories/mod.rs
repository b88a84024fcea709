pub mod activity;
pub mod report;
pub mod result;
pub mod sequence;
pub mod user;

use chrono::{Days, NaiveDate, SecondsFormat, TimeDelta, Utc};

/// Timestamps are stored as fixed-width RFC 3339 strings so that string
/// comparison orders them chronologically.
#[must_use]
pub fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// `days` before now, or `None` when that falls outside the calendar range.
#[must_use]
pub fn timestamp_days_ago(days: i64) -> Option<String> {
    let delta = TimeDelta::try_days(days)?;
    Utc::now()
        .checked_sub_signed(delta)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Inclusive lower bound for a calendar day.
#[must_use]
pub fn day_start(date: NaiveDate) -> String {
    format!("{}T00:00:00.000Z", date.format("%Y-%m-%d"))
}

/// Exclusive upper bound covering the whole of `date`.
#[must_use]
pub fn day_end_exclusive(date: NaiveDate) -> String {
    let next = date.checked_add_days(Days::new(1)).unwrap_or(date);
    day_start(next)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_bounds_cover_the_date() {
        let date = NaiveDate::from_ymd_opt(2026, 2, 28).unwrap();
        assert_eq!(day_start(date), "2026-02-28T00:00:00.000Z");
        assert_eq!(day_end_exclusive(date), "2026-03-01T00:00:00.000Z");
    }

    #[test]
    fn timestamps_order_lexicographically() {
        let earlier = timestamp_days_ago(2).unwrap();
        let now = now_timestamp();
        assert!(earlier < now);
        assert_eq!(now.len(), "2026-01-01T00:00:00.000Z".len());
    }

    #[test]
    fn out_of_range_cutoff_is_none() {
        assert!(timestamp_days_ago(1_000_000_000_000_000).is_none());
        assert!(timestamp_days_ago(i64::MAX).is_none());
        assert!(timestamp_days_ago(36_500).is_some());
    }
}
