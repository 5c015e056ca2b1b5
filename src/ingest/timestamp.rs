//! Timestamp tokens as printed in the news table.
//!
//! Dates look like `Jun-18-24` (or the literal `Today`), times like `09:28PM`.
//! Everything is a naive calendar value; no timezone handling.

use chrono::{NaiveDate, NaiveTime};

use crate::error::{Result, SentimentError, TokenKind};

pub const TODAY_PLACEHOLDER: &str = "Today";
pub const DATE_FORMAT: &str = "%b-%d-%y";
pub const TIME_FORMAT: &str = "%I:%M%p";

/// Resolve a date token against `reference_today`.
///
/// `None` and `"Today"` both map to `reference_today`; anything else must
/// match `Mon-DD-YY`.
pub fn normalize(date_token: Option<&str>, reference_today: NaiveDate) -> Result<NaiveDate> {
    match date_token.map(str::trim) {
        None => Ok(reference_today),
        Some(TODAY_PLACEHOLDER) => Ok(reference_today),
        Some(tok) => NaiveDate::parse_from_str(tok, DATE_FORMAT).map_err(|_| {
            SentimentError::Parse {
                kind: TokenKind::Date,
                token: tok.to_string(),
                expected: "Mon-DD-YY, e.g. Jun-18-24",
            }
        }),
    }
}

/// Parse a 12-hour clock token such as `09:28PM`.
pub fn parse_time(time_token: &str) -> Result<NaiveTime> {
    let tok = time_token.trim();
    NaiveTime::parse_from_str(tok, TIME_FORMAT).map_err(|_| SentimentError::Parse {
        kind: TokenKind::Time,
        token: tok.to_string(),
        expected: "hh:mmAM/PM, e.g. 09:28PM",
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn explicit_dates_ignore_today() {
        for today in [d(2020, 1, 1), d(2024, 6, 30), d(2031, 12, 31)] {
            assert_eq!(normalize(Some("Jun-18-24"), today).unwrap(), d(2024, 6, 18));
            assert_eq!(normalize(Some("Dec-01-23"), today).unwrap(), d(2023, 12, 1));
        }
    }

    #[test]
    fn missing_or_today_maps_to_reference() {
        let today = d(2024, 6, 20);
        assert_eq!(normalize(None, today).unwrap(), today);
        assert_eq!(normalize(Some("Today"), today).unwrap(), today);
    }

    #[test]
    fn garbage_date_is_parse_error() {
        let err = normalize(Some("2024-06-18"), d(2024, 6, 20)).unwrap_err();
        assert!(matches!(
            err,
            SentimentError::Parse {
                kind: TokenKind::Date,
                ..
            }
        ));
        assert!(normalize(Some("Jun-31-24"), d(2024, 6, 20)).is_err());
    }

    #[test]
    fn times_parse_twelve_hour_clock() {
        assert_eq!(
            parse_time("09:28PM").unwrap(),
            NaiveTime::from_hms_opt(21, 28, 0).unwrap()
        );
        assert_eq!(
            parse_time("12:05AM").unwrap(),
            NaiveTime::from_hms_opt(0, 5, 0).unwrap()
        );
        assert!(matches!(
            parse_time("25:00XM").unwrap_err(),
            SentimentError::Parse {
                kind: TokenKind::Time,
                ..
            }
        ));
    }
}
