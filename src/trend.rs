//! # Trend Smoother
//! Exponential moving averages and ordinary least-squares trend lines over
//! chronologically ordered series.

use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SentimentError};
use crate::ingest::HeadlineRecord;

/// EMA with `alpha = 2 / (span + 1)`, seeded with the first value.
///
/// The map is already ordered by key, so the recurrence runs chronologically.
pub fn ema<K: Ord + Clone>(series: &BTreeMap<K, f64>, span: usize) -> Result<BTreeMap<K, f64>> {
    if span == 0 {
        return Err(SentimentError::InvalidSpan(span));
    }
    let alpha = 2.0 / (span as f64 + 1.0);

    let mut out = BTreeMap::new();
    let mut prev: Option<f64> = None;
    for (k, &x) in series {
        // y + alpha * (x - y) == alpha * x + (1 - alpha) * y, exact for constant input
        let y = match prev {
            None => x,
            Some(p) => p + alpha * (x - p),
        };
        out.insert(k.clone(), y);
        prev = Some(y);
    }
    Ok(out)
}

/// Fitted line `y = slope * x + intercept` over `[x_start, x_end]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub slope: f64,
    pub intercept: f64,
    pub x_start: f64,
    pub x_end: f64,
    /// Coefficient of determination of the fit.
    pub r_squared: f64,
}

impl TrendLine {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// The two points used to draw the line.
    pub fn endpoints(&self) -> [(f64, f64); 2] {
        [
            (self.x_start, self.predict(self.x_start)),
            (self.x_end, self.predict(self.x_end)),
        ]
    }
}

/// Ordinary least squares over `(x, y)` points.
///
/// Needs at least two points and at least two distinct x values.
pub fn fit_trend(points: &[(f64, f64)]) -> Result<TrendLine> {
    let n = points.len();
    let insufficient = SentimentError::InsufficientData { points: n };
    let Some(&(x0, _)) = points.first() else {
        return Err(insufficient);
    };
    if n < 2 || points.iter().all(|&(x, _)| x == x0) {
        return Err(insufficient);
    }

    let nf = n as f64;
    let mean_x = points.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = points.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxx, mut sxy) = (0.0, 0.0);
    for &(x, y) in points {
        sxx += (x - mean_x) * (x - mean_x);
        sxy += (x - mean_x) * (y - mean_y);
    }
    let slope = sxy / sxx;
    let intercept = mean_y - slope * mean_x;

    let (mut ss_res, mut ss_tot) = (0.0, 0.0);
    for &(x, y) in points {
        let fitted = slope * x + intercept;
        ss_res += (y - fitted) * (y - fitted);
        ss_tot += (y - mean_y) * (y - mean_y);
    }
    // constant y is fitted perfectly by a flat line
    let r_squared = if ss_tot == 0.0 { 1.0 } else { 1.0 - ss_res / ss_tot };

    let (x_start, x_end) = points.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
        (lo.min(p.0), hi.max(p.0))
    });

    Ok(TrendLine {
        slope,
        intercept,
        x_start,
        x_end,
        r_squared,
    })
}

/// Records as `(seconds since the earliest headline, score)`, sorted by
/// headline datetime. Returns the origin alongside the points.
pub fn time_points(records: &[HeadlineRecord]) -> Result<Option<(NaiveDateTime, Vec<(f64, f64)>)>> {
    let mut timed = Vec::with_capacity(records.len());
    for (index, r) in records.iter().enumerate() {
        let score = r.score.ok_or(SentimentError::Unscored { index })?;
        timed.push((r.datetime(), score));
    }
    timed.sort_by_key(|(dt, _)| *dt);

    let Some(&(origin, _)) = timed.first() else {
        return Ok(None);
    };
    let points = timed
        .into_iter()
        .map(|(dt, s)| ((dt - origin).num_seconds() as f64, s))
        .collect();
    Ok(Some((origin, points)))
}
