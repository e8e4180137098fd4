//! Calendar window of past dates to backfill.
//!
//! All dates are UTC calendar days. "Today" is never part of the window since
//! the upstream API may not have published it yet.

use chrono::{Days, NaiveDate, Utc};

/// Returns `days` dates counting back from the day before `today`, newest first.
pub fn past_dates(today: NaiveDate, days: u32) -> Vec<NaiveDate> {
    (1..=u64::from(days))
        .map_while(|offset| today.checked_sub_days(Days::new(offset)))
        .collect()
}

/// The current UTC calendar date.
pub fn today_utc() -> NaiveDate {
    Utc::now().date_naive()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn day(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_zero_days_is_empty() {
        assert!(past_dates(day("2024-03-01"), 0).is_empty());
    }

    #[test]
    fn test_starts_yesterday_and_crosses_month_and_leap_day() {
        let dates = past_dates(day("2024-03-02"), 3);
        assert_eq!(
            dates,
            vec![day("2024-03-01"), day("2024-02-29"), day("2024-02-28")]
        );
        assert_eq!(dates[0].to_string(), "2024-03-01");
    }

    #[test]
    fn test_full_year_is_distinct_and_strictly_decreasing() {
        let today = day("2025-01-10");
        let dates = past_dates(today, 365);

        assert_eq!(dates.len(), 365);
        assert!(!dates.contains(&today));
        assert!(dates.windows(2).all(|w| w[0] > w[1]));
        assert_eq!(dates.iter().collect::<HashSet<_>>().len(), 365);
        assert_eq!(dates.last(), Some(&day("2024-01-11")));
    }

    #[test]
    fn test_utc_window_ends_before_today() {
        let today = today_utc();
        let dates = past_dates(today, 2);
        assert_eq!(dates.len(), 2);
        assert!(dates[0] > dates[1]);
        assert!(dates[0] < today);
    }
}
