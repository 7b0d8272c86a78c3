//! Search date helpers.
//!
//! E-utilities take `mindate`/`maxdate` as `YYYY/MM/DD`, and the same format is
//! used in the digest subject line.

use chrono::{Days, NaiveDate};

const SEARCH_DATE_FORMAT: &str = "%Y/%m/%d";

/// Format a date as `YYYY/MM/DD`
pub fn to_yyyymmdd(date: NaiveDate) -> String {
    date.format(SEARCH_DATE_FORMAT).to_string()
}

/// Parse a `YYYY/MM/DD` date
pub fn parse_yyyymmdd(value: &str) -> Result<NaiveDate, chrono::ParseError> {
    NaiveDate::parse_from_str(value.trim(), SEARCH_DATE_FORMAT)
}

/// The date `lookback_days` before `today`, saturating at the minimum date
pub fn days_before(today: NaiveDate, lookback_days: u64) -> NaiveDate {
    today
        .checked_sub_days(Days::new(lookback_days))
        .unwrap_or(NaiveDate::MIN)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_format_zero_pads() {
        assert_eq!(to_yyyymmdd(date(2024, 3, 7)), "2024/03/07");
        assert_eq!(to_yyyymmdd(date(999, 12, 31)), "0999/12/31");
    }

    #[test]
    fn test_format_is_idempotent() {
        for d in [date(2024, 1, 1), date(2023, 12, 31), date(2024, 2, 29)] {
            let once = to_yyyymmdd(d);
            let twice = to_yyyymmdd(parse_yyyymmdd(&once).unwrap());
            assert_eq!(once, twice);
            assert_eq!(once.len(), 10);
        }
    }

    #[test]
    fn test_parse_rejects_other_formats() {
        assert!(parse_yyyymmdd("2024-03-07").is_err());
        assert!(parse_yyyymmdd("2024/13/01").is_err());
        assert_eq!(parse_yyyymmdd(" 2024/03/07 ").unwrap(), date(2024, 3, 7));
    }

    #[test]
    fn test_days_before_crosses_month_and_year() {
        assert_eq!(days_before(date(2024, 3, 1), 1), date(2024, 2, 29));
        assert_eq!(days_before(date(2024, 1, 1), 1), date(2023, 12, 31));
        assert_eq!(days_before(date(2024, 1, 10), 0), date(2024, 1, 10));
    }
}
