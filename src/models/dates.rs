//! Calendar-month date arithmetic
//!
//! Installment windows and monthly bucketing are defined in calendar months,
//! not fixed 30-day increments: a 3-month window starting Jan 15 ends Apr 15.
//! Day-of-month is clamped when the target month is shorter (Jan 31 + 1 month
//! = Feb 28/29).

use chrono::{Datelike, Duration, NaiveDate};

/// Add a number of calendar months to a date, clamping the day when needed
///
/// Saturates at `NaiveDate::MAX` if the target month falls outside chrono's
/// representable range.
pub fn add_months(date: NaiveDate, months: u32) -> NaiveDate {
    let total = i64::from(date.year()) * 12 + i64::from(date.month()) - 1 + i64::from(months);
    let month = (total.rem_euclid(12) + 1) as u32;
    let year = match i32::try_from(total.div_euclid(12)) {
        Ok(year) => year,
        Err(_) => return NaiveDate::MAX,
    };
    let day = date.day().min(days_in_month(year, month));
    NaiveDate::from_ymd_opt(year, month, day).unwrap_or(NaiveDate::MAX)
}

/// First day of the month containing `date`
pub fn month_start(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), 1).unwrap_or(date)
}

/// Whether two dates fall in the same calendar month
pub fn same_month(a: NaiveDate, b: NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

fn days_in_month(year: i32, month: u32) -> u32 {
    let (next_year, next_month) = if month == 12 {
        (year.saturating_add(1), 1)
    } else {
        (year, month + 1)
    };
    match NaiveDate::from_ymd_opt(next_year, next_month, 1) {
        Some(first_of_next) => (first_of_next - Duration::days(1)).day(),
        // Beyond chrono's range; 28 is always a safe clamp
        None => 28,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_add_months_plain() {
        assert_eq!(add_months(d(2025, 1, 15), 3), d(2025, 4, 15));
        assert_eq!(add_months(d(2025, 1, 15), 0), d(2025, 1, 15));
    }

    #[test]
    fn test_add_months_year_rollover() {
        assert_eq!(add_months(d(2024, 11, 10), 3), d(2025, 2, 10));
        assert_eq!(add_months(d(2024, 12, 31), 12), d(2025, 12, 31));
    }

    #[test]
    fn test_add_months_clamps_day() {
        assert_eq!(add_months(d(2025, 1, 31), 1), d(2025, 2, 28));
        assert_eq!(add_months(d(2024, 1, 31), 1), d(2024, 2, 29)); // leap year
        assert_eq!(add_months(d(2025, 3, 31), 1), d(2025, 4, 30));
    }

    #[test]
    fn test_month_start() {
        assert_eq!(month_start(d(2025, 6, 23)), d(2025, 6, 1));
        assert_eq!(month_start(d(2025, 6, 1)), d(2025, 6, 1));
    }

    #[test]
    fn test_same_month() {
        assert!(same_month(d(2025, 6, 1), d(2025, 6, 30)));
        assert!(!same_month(d(2025, 6, 30), d(2025, 7, 1)));
        assert!(!same_month(d(2024, 6, 15), d(2025, 6, 15)));
    }
}
