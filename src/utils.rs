use crate::error::{AllocationError, Result};
use chrono::{Datelike, NaiveDate};

pub fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

pub fn next_month(date: NaiveDate) -> NaiveDate {
    let year = if date.month() == 12 {
        date.year() + 1
    } else {
        date.year()
    };

    let month = if date.month() == 12 {
        1
    } else {
        date.month() + 1
    };

    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

pub fn prev_month(date: NaiveDate) -> NaiveDate {
    let year = if date.month() == 1 {
        date.year() - 1
    } else {
        date.year()
    };

    let month = if date.month() == 1 {
        12
    } else {
        date.month() - 1
    };

    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(date)
}

/// Parses "YYYY-MM" into the first day of that month.
pub fn parse_month(month: &str) -> Result<NaiveDate> {
    let with_day = format!("{}-01", month.trim());
    NaiveDate::parse_from_str(&with_day, "%Y-%m-%d").map_err(|_| {
        AllocationError::DateError(format!(
            "Invalid month format: {}. Expected YYYY-MM",
            month
        ))
    })
}

/// Parses "YYYY-MM:YYYY-MM" into a half-open `[from, to)` pair where `to` is
/// the month after the second component.
pub fn parse_month_range(range: &str) -> Result<(NaiveDate, NaiveDate)> {
    let parts: Vec<&str> = range.split(':').collect();

    match parts.len() {
        1 => {
            let from = parse_month(parts[0])?;
            Ok((from, next_month(from)))
        }
        2 => {
            let from = parse_month(parts[0])?;
            let last = parse_month(parts[1])?;
            Ok((from, next_month(last)))
        }
        _ => Err(AllocationError::DateError(format!(
            "Invalid range format: {}. Expected 'YYYY-MM' or 'YYYY-MM:YYYY-MM'",
            range
        ))),
    }
}

pub fn format_month(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_next_month() {
        let date = NaiveDate::from_ymd_opt(2023, 1, 31).unwrap();
        assert_eq!(next_month(date), NaiveDate::from_ymd_opt(2023, 2, 1).unwrap());

        let date = NaiveDate::from_ymd_opt(2023, 12, 1).unwrap();
        assert_eq!(next_month(date), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
    }

    #[test]
    fn test_prev_month() {
        let date = NaiveDate::from_ymd_opt(2023, 2, 28).unwrap();
        assert_eq!(prev_month(date), NaiveDate::from_ymd_opt(2023, 1, 1).unwrap());

        let date = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        assert_eq!(prev_month(date), NaiveDate::from_ymd_opt(2022, 12, 1).unwrap());
    }

    #[test]
    fn test_first_of_month() {
        assert_eq!(
            first_of_month(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
        );
    }

    #[test]
    fn test_parse_month_and_range() {
        assert_eq!(
            parse_month("2024-10").unwrap(),
            NaiveDate::from_ymd_opt(2024, 10, 1).unwrap()
        );
        assert!(parse_month("2024-13").is_err());

        let (from, to) = parse_month_range("2024-01:2024-03").unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());

        let (from, to) = parse_month_range("2024-12").unwrap();
        assert_eq!(from, NaiveDate::from_ymd_opt(2024, 12, 1).unwrap());
        assert_eq!(to, NaiveDate::from_ymd_opt(2025, 1, 1).unwrap());
    }
}
