//! Retention window filtering.

use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};

/// Date format of daily records.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Look-back horizon in whole days.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RetentionWindow(u32);

impl RetentionWindow {
    /// The window used when none is configured.
    pub const DEFAULT_DAYS: u32 = 30;

    /// Create a window of `days` days.
    pub const fn days(days: u32) -> Self {
        Self(days)
    }

    /// Window length in days.
    pub const fn as_days(&self) -> u32 {
        self.0
    }

    /// Window length in hours.
    pub const fn as_hours(&self) -> i64 {
        self.0 as i64 * 24
    }
}

impl Default for RetentionWindow {
    fn default() -> Self {
        Self(Self::DEFAULT_DAYS)
    }
}

impl fmt::Display for RetentionWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} days", self.0)
    }
}

/// Parse a `YYYY-MM-DD` record date as midnight UTC.
pub fn parse_record_date(date: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    let day = NaiveDate::parse_from_str(date, DATE_FORMAT)?;
    Ok(Utc.from_utc_datetime(&day.and_time(NaiveTime::MIN)))
}

/// Check whether a record falls inside the window ending at `now`.
///
/// The elapsed time is truncated to whole hours and compared against
/// `days * 24`, so the boundary is inclusive. Records dated after `now`
/// always pass.
pub fn is_within_window(
    recorded_at: DateTime<Utc>,
    now: DateTime<Utc>,
    window: RetentionWindow,
) -> bool {
    (now - recorded_at).num_hours() <= window.as_hours()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 30, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_parse_record_date() {
        assert_eq!(
            parse_record_date("2024-06-20").unwrap(),
            Utc.with_ymd_and_hms(2024, 6, 20, 0, 0, 0).unwrap()
        );
        assert!(parse_record_date("2024/06/20").is_err());
        assert!(parse_record_date("20-06-2024").is_err());
        assert!(parse_record_date("2024-13-01").is_err());
        assert!(parse_record_date("").is_err());
    }

    #[test]
    fn test_boundary_is_inclusive() {
        let window = RetentionWindow::days(30);
        let edge = now() - Duration::hours(30 * 24);
        assert!(is_within_window(edge, now(), window));
        assert!(!is_within_window(edge - Duration::hours(1), now(), window));
    }

    #[test]
    fn test_partial_hours_truncate() {
        let window = RetentionWindow::days(1);
        let just_over = now() - Duration::hours(24) - Duration::minutes(59);
        assert!(is_within_window(just_over, now(), window));
    }

    #[test]
    fn test_future_records_always_pass() {
        let tomorrow = now() + Duration::days(1);
        for days in [0, 1, 7, 30, 365] {
            assert!(is_within_window(tomorrow, now(), RetentionWindow::days(days)));
        }
    }

    #[test]
    fn test_zero_window() {
        let window = RetentionWindow::days(0);
        assert!(is_within_window(now(), now(), window));
        assert!(is_within_window(now() - Duration::minutes(30), now(), window));
        assert!(!is_within_window(now() - Duration::hours(1), now(), window));
    }

    #[test]
    fn test_filter_is_repeatable() {
        let window = RetentionWindow::days(7);
        let recorded = parse_record_date("2024-06-20").unwrap();
        let first = is_within_window(recorded, now(), window);
        let second = is_within_window(recorded, now(), window);
        assert_eq!(first, second);
        assert!(!first);
    }

    #[test]
    fn test_window_defaults() {
        let window = RetentionWindow::default();
        assert_eq!(window.as_days(), 30);
        assert_eq!(window.as_hours(), 720);
        assert_eq!(window.to_string(), "30 days");
    }
}
