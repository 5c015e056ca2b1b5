//! News table -> raw rows -> dated headline records.
//!
//! Rows are read top to bottom. A row whose timestamp cell holds a single
//! token inherits the date of the nearest preceding row that stated one.

use chrono::NaiveDate;
use metrics::{counter, histogram};
use once_cell::sync::OnceCell;
use regex::Regex;

use crate::error::{Result, SentimentError, TokenKind};
use crate::ingest::timestamp;
use crate::ingest::types::{HeadlineRecord, RawHeadlineRow};
use crate::ingest::{clean_cell_text, ensure_metrics_described};

fn re(cell: &'static OnceCell<Regex>, pattern: &str) -> &'static Regex {
    cell.get_or_init(|| Regex::new(pattern).unwrap())
}

fn news_table_body(markup: &str) -> Option<&str> {
    static RE_TABLE: OnceCell<Regex> = OnceCell::new();
    re(
        &RE_TABLE,
        r#"(?is)<table\b[^>]*\bid\s*=\s*["']?news-table["']?[^>]*>(.*?)</table>"#,
    )
    .captures(markup)
    .and_then(|c| c.get(1))
    .map(|m| m.as_str())
}

/// Split the `news-table` element of `markup` into raw rows.
///
/// The first `<td>` of a row is its timestamp cell and the first `<a>` its
/// title. The timestamp cell must hold one token (time) or two (date, time).
pub fn parse_rows(ticker: &str, markup: &str) -> Result<Vec<RawHeadlineRow>> {
    static RE_ROW: OnceCell<Regex> = OnceCell::new();
    static RE_TD: OnceCell<Regex> = OnceCell::new();
    static RE_ANCHOR: OnceCell<Regex> = OnceCell::new();

    let table = news_table_body(markup).ok_or_else(|| {
        SentimentError::Markup(format!("no news-table element in markup for {ticker}"))
    })?;

    let mut rows = Vec::new();
    for (i, row) in re(&RE_ROW, r"(?is)<tr\b[^>]*>(.*?)</tr>")
        .captures_iter(table)
        .enumerate()
    {
        let inner = row.get(1).map(|m| m.as_str()).unwrap_or_default();

        let cell = re(&RE_TD, r"(?is)<td\b[^>]*>(.*?)</td>")
            .captures(inner)
            .and_then(|c| c.get(1))
            .ok_or_else(|| SentimentError::Markup(format!("row {i} has no timestamp cell")))?;
        let title = re(&RE_ANCHOR, r"(?is)<a\b[^>]*>(.*?)</a>")
            .captures(inner)
            .and_then(|c| c.get(1))
            .ok_or_else(|| SentimentError::Markup(format!("row {i} has no title link")))?;

        let stamp = clean_cell_text(cell.as_str());
        let tokens: Vec<&str> = stamp.split_whitespace().collect();
        let (date_token, time_token) = match tokens.as_slice() {
            [time] => (None, time.to_string()),
            [date, time] => (Some(date.to_string()), time.to_string()),
            _ => {
                return Err(SentimentError::Parse {
                    kind: TokenKind::Cell,
                    token: stamp,
                    expected: "one or two whitespace-separated tokens",
                })
            }
        };

        rows.push(RawHeadlineRow {
            ticker: ticker.to_string(),
            date_token,
            time_token,
            title: clean_cell_text(title.as_str()),
        });
    }

    Ok(rows)
}

/// Resolve dates and times for `rows`, carrying the last stated date forward.
///
/// Fails with `MissingDate` when a time-only row appears before any row
/// that supplied a date.
pub fn extract_rows(
    rows: &[RawHeadlineRow],
    reference_today: NaiveDate,
) -> Result<Vec<HeadlineRecord>> {
    let (_, records) = rows.iter().enumerate().try_fold(
        (None::<NaiveDate>, Vec::with_capacity(rows.len())),
        |(current, mut out), (i, row)| {
            let date = match row.date_token.as_deref() {
                Some(tok) => timestamp::normalize(Some(tok), reference_today)?,
                None => current.ok_or(SentimentError::MissingDate { row: i })?,
            };
            let time = timestamp::parse_time(&row.time_token)?;
            out.push(HeadlineRecord {
                ticker: row.ticker.clone(),
                date,
                time,
                title: row.title.clone(),
                score: None,
            });
            Ok::<_, SentimentError>((Some(date), out))
        },
    )?;
    Ok(records)
}

/// Parse `raw_markup` for `ticker` into headline records (scores unset).
pub fn extract(
    ticker: &str,
    raw_markup: &str,
    reference_today: NaiveDate,
) -> Result<Vec<HeadlineRecord>> {
    ensure_metrics_described();
    let t0 = std::time::Instant::now();

    let rows = parse_rows(ticker, raw_markup)?;
    let records = extract_rows(&rows, reference_today)?;

    histogram!("ingest_parse_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    counter!("headlines_extracted_total").increment(records.len() as u64);
    tracing::debug!(ticker, rows = rows.len(), "extracted headline records");
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(date: Option<&str>, time: &str, title: &str) -> RawHeadlineRow {
        RawHeadlineRow {
            ticker: "X".into(),
            date_token: date.map(str::to_string),
            time_token: time.into(),
            title: title.into(),
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 20).unwrap()
    }

    #[test]
    fn carries_date_forward() {
        let rows = vec![
            row(Some("Jun-18-24"), "09:00AM", "A"),
            row(None, "09:30AM", "B"),
            row(Some("Jun-19-24"), "10:00AM", "C"),
        ];
        let recs = extract_rows(&rows, today()).unwrap();
        let dates: Vec<_> = recs.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, ["2024-06-18", "2024-06-18", "2024-06-19"]);
        assert!(recs.iter().all(|r| r.score.is_none()));
    }

    #[test]
    fn first_row_without_date_fails() {
        let rows = vec![row(None, "09:30AM", "B"), row(Some("Jun-19-24"), "10:00AM", "C")];
        assert!(matches!(
            extract_rows(&rows, today()).unwrap_err(),
            SentimentError::MissingDate { row: 0 }
        ));
    }

    #[test]
    fn today_rows_use_reference_date() {
        let rows = vec![row(Some("Today"), "08:15AM", "A"), row(None, "07:00AM", "B")];
        let recs = extract_rows(&rows, today()).unwrap();
        assert!(recs.iter().all(|r| r.date == today()));
    }

    #[test]
    fn empty_table_yields_no_records() {
        let html = r#"<table id="news-table"></table>"#;
        assert!(extract("X", html, today()).unwrap().is_empty());
    }

    #[test]
    fn missing_table_is_markup_error() {
        let err = parse_rows("X", "<html><body>blocked</body></html>").unwrap_err();
        assert!(matches!(err, SentimentError::Markup(_)));
    }

    #[test]
    fn three_token_cell_is_rejected() {
        let html = r#"<table id="news-table">
            <tr><td>Jun-18-24 09:00 AM</td><td><a href="/n/1">A</a></td></tr>
        </table>"#;
        assert!(matches!(
            parse_rows("X", html).unwrap_err(),
            SentimentError::Parse {
                kind: TokenKind::Cell,
                ..
            }
        ));
    }
}
