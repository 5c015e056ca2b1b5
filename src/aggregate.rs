//! # Series Aggregator
//! Groups scored headline records by date (optionally by ticker as well) and
//! averages their scores.
//!
//! Keys with no records are simply absent, never zero-filled. Scores within a
//! key are summed in sorted order so the mean does not depend on input order.

use std::collections::BTreeMap;

use chrono::{NaiveDate, NaiveDateTime};

use crate::error::{Result, SentimentError};
use crate::ingest::HeadlineRecord;

/// Date -> mean score.
pub type SentimentSeries = BTreeMap<NaiveDate, f64>;

/// Date -> ticker -> mean score.
pub type PivotSeries = BTreeMap<NaiveDate, BTreeMap<String, f64>>;

/// Timestamp -> value (headline datetimes, price bars, resampled grids).
pub type TimeSeries = BTreeMap<NaiveDateTime, f64>;

/// Mean score per calendar date.
pub fn aggregate(records: &[HeadlineRecord]) -> Result<SentimentSeries> {
    mean_by(records, |r| r.date)
}

/// Mean score per (date, ticker), shaped as one column per ticker.
pub fn aggregate_pivot(records: &[HeadlineRecord]) -> Result<PivotSeries> {
    let flat = mean_by(records, |r| (r.date, r.ticker.clone()))?;
    let mut out = PivotSeries::new();
    for ((date, ticker), mean) in flat {
        out.entry(date).or_default().insert(ticker, mean);
    }
    Ok(out)
}

/// Mean score per exact headline datetime.
pub fn aggregate_intraday(records: &[HeadlineRecord]) -> Result<TimeSeries> {
    mean_by(records, HeadlineRecord::datetime)
}

/// Split a pivot table into one date-indexed series per ticker.
pub fn pivot_columns(pivot: &PivotSeries) -> BTreeMap<String, SentimentSeries> {
    let mut cols: BTreeMap<String, SentimentSeries> = BTreeMap::new();
    for (date, row) in pivot {
        for (ticker, v) in row {
            cols.entry(ticker.clone()).or_default().insert(*date, *v);
        }
    }
    cols
}

/// Inverse of [`pivot_columns`].
pub fn pivot_from_columns(cols: &BTreeMap<String, SentimentSeries>) -> PivotSeries {
    let mut out = PivotSeries::new();
    for (ticker, series) in cols {
        for (date, v) in series {
            out.entry(*date).or_default().insert(ticker.clone(), *v);
        }
    }
    out
}

fn mean_by<K, F>(records: &[HeadlineRecord], key: F) -> Result<BTreeMap<K, f64>>
where
    K: Ord,
    F: Fn(&HeadlineRecord) -> K,
{
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (index, r) in records.iter().enumerate() {
        let score = r.score.ok_or(SentimentError::Unscored { index })?;
        groups.entry(key(r)).or_default().push(score);
    }

    Ok(groups
        .into_iter()
        .map(|(k, mut scores)| {
            scores.sort_by(f64::total_cmp);
            let sum: f64 = scores.iter().sum();
            (k, sum / scores.len() as f64)
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveTime;
    use rand::seq::SliceRandom;
    use rand::SeedableRng;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
    }

    fn rec(ticker: &str, day: u32, hour: u32, score: f64) -> HeadlineRecord {
        HeadlineRecord {
            ticker: ticker.into(),
            date: d(day),
            time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            title: format!("{ticker} {day} {hour}"),
            score: Some(score),
        }
    }

    #[test]
    fn daily_mean() {
        let recs = vec![rec("X", 18, 9, 0.9), rec("X", 18, 10, 0.1), rec("X", 19, 9, 0.5)];
        let s = aggregate(&recs).unwrap();
        assert_eq!(s.len(), 2);
        assert!((s[&d(18)] - 0.5).abs() < 1e-12);
        assert!((s[&d(19)] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn empty_input_gives_empty_series() {
        assert!(aggregate(&[]).unwrap().is_empty());
        assert!(aggregate_pivot(&[]).unwrap().is_empty());
    }

    #[test]
    fn unscored_record_is_an_error() {
        let mut r = rec("X", 18, 9, 0.2);
        r.score = None;
        let err = aggregate(&[rec("X", 18, 8, 0.1), r]).unwrap_err();
        assert!(matches!(err, SentimentError::Unscored { index: 1 }));
    }

    #[test]
    fn reordering_does_not_change_result() {
        let mut recs: Vec<_> = (0..40)
            .map(|i| rec("X", 10 + (i % 4), i % 24, 0.013 * i as f64 + 0.1))
            .collect();
        let base = aggregate(&recs).unwrap();

        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        for _ in 0..10 {
            recs.shuffle(&mut rng);
            assert_eq!(aggregate(&recs).unwrap(), base);
        }
    }

    #[test]
    fn pivot_has_one_column_per_ticker_without_zero_fill() {
        let recs = vec![
            rec("AAPL", 18, 9, 0.8),
            rec("AAPL", 18, 11, 0.6),
            rec("AMD", 18, 9, 0.3),
            rec("AMD", 19, 9, 0.9),
        ];
        let p = aggregate_pivot(&recs).unwrap();
        assert!((p[&d(18)]["AAPL"] - 0.7).abs() < 1e-12);
        assert!((p[&d(18)]["AMD"] - 0.3).abs() < 1e-12);
        assert!(!p[&d(19)].contains_key("AAPL"));

        let cols = pivot_columns(&p);
        assert_eq!(cols.keys().collect::<Vec<_>>(), ["AAPL", "AMD"]);
        assert_eq!(cols["AMD"].len(), 2);
        assert_eq!(pivot_from_columns(&cols), p);
    }

    #[test]
    fn intraday_groups_by_exact_datetime() {
        let recs = vec![rec("X", 18, 9, 0.2), rec("X", 18, 9, 0.4), rec("X", 18, 10, 1.0)];
        let s = aggregate_intraday(&recs).unwrap();
        assert_eq!(s.len(), 2);
        assert!((s.values().next().unwrap() - 0.3).abs() < 1e-12);
    }
}
