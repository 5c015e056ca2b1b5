//! # Alignment and Correlation
//! Puts two independently sampled series on a common time axis and measures
//! how they move together.
//!
//! - Alignment is an inner join on keys: points present in only one series
//!   are dropped, never treated as zero.
//! - Resampling buckets a series onto a regular grid (bucket mean) and can
//!   fill empty buckets by interpolation, strictly between the first and
//!   last known buckets.

use std::collections::BTreeMap;

use chrono::{Duration, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::aggregate::TimeSeries;
use crate::error::{Result, SentimentError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Interpolation {
    Linear,
    /// Natural cubic spline through the known buckets.
    Cubic,
}

/// Values of `a` and `b` at the keys present in both, in key order.
pub fn inner_join<K: Ord>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Vec<(f64, f64)> {
    a.iter()
        .filter_map(|(k, &va)| b.get(k).map(|&vb| (va, vb)))
        .collect()
}

/// Pearson correlation of `a` and `b` over their shared keys.
pub fn correlate<K: Ord>(a: &BTreeMap<K, f64>, b: &BTreeMap<K, f64>) -> Result<f64> {
    pearson(&inner_join(a, b))
}

/// Pearson correlation coefficient of paired samples.
pub fn pearson(pairs: &[(f64, f64)]) -> Result<f64> {
    let n = pairs.len();
    if n < 2 {
        return Err(SentimentError::InsufficientOverlap { overlap: n });
    }
    let (x0, y0) = pairs[0];
    if pairs.iter().all(|p| p.0 == x0) {
        return Err(SentimentError::DegenerateVariance { which: "first" });
    }
    if pairs.iter().all(|p| p.1 == y0) {
        return Err(SentimentError::DegenerateVariance { which: "second" });
    }

    let nf = n as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / nf;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for &(x, y) in pairs {
        let (dx, dy) = (x - mean_x, y - mean_y);
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }
    Ok((sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0))
}

/// Midnight of the earliest first timestamp across `series`. Resampling
/// every series from this origin puts them on the same grid.
pub fn grid_origin<'a>(
    series: impl IntoIterator<Item = &'a TimeSeries>,
) -> Option<NaiveDateTime> {
    series
        .into_iter()
        .filter_map(|s| s.keys().next())
        .min()
        .map(|first| first.date().and_time(NaiveTime::MIN))
}

/// Bucket `series` onto a grid of width `freq` starting at `origin`. Each
/// bucket holds the mean of its samples; samples before `origin` land in
/// negative buckets.
///
/// With `method = Some(..)` empty buckets between the first and last
/// non-empty bucket are interpolated; without it they are omitted.
pub fn resample(
    series: &TimeSeries,
    freq: Duration,
    origin: NaiveDateTime,
    method: Option<Interpolation>,
) -> Result<TimeSeries> {
    let step = freq.num_seconds();
    if step <= 0 {
        return Err(SentimentError::InvalidFrequency { seconds: step });
    }
    if series.is_empty() {
        return Ok(TimeSeries::new());
    }

    // bucket index -> (sum, count)
    let mut buckets: BTreeMap<i64, (f64, usize)> = BTreeMap::new();
    for (ts, v) in series {
        let idx = (*ts - origin).num_seconds().div_euclid(step);
        let slot = buckets.entry(idx).or_insert((0.0, 0));
        slot.0 += v;
        slot.1 += 1;
    }
    let known: Vec<(i64, f64)> = buckets
        .into_iter()
        .map(|(i, (sum, count))| (i, sum / count as f64))
        .collect();

    let at = |idx: i64| origin + Duration::seconds(idx * step);
    let Some(method) = method else {
        return Ok(known.into_iter().map(|(i, v)| (at(i), v)).collect());
    };

    let xs: Vec<f64> = known.iter().map(|(i, _)| *i as f64).collect();
    let ys: Vec<f64> = known.iter().map(|(_, v)| *v).collect();
    let curve = Curve::new(method, &xs, &ys);

    let (lo, hi) = (known[0].0, known[known.len() - 1].0);
    let known_map: BTreeMap<i64, f64> = known.into_iter().collect();
    Ok((lo..=hi)
        .map(|i| {
            let v = known_map
                .get(&i)
                .copied()
                .unwrap_or_else(|| curve.eval(i as f64));
            (at(i), v)
        })
        .collect())
}

/// Piecewise interpolant through sorted knots.
struct Curve<'a> {
    xs: &'a [f64],
    ys: &'a [f64],
    /// Second derivatives at the knots; all zero for linear.
    m: Vec<f64>,
}

impl<'a> Curve<'a> {
    fn new(method: Interpolation, xs: &'a [f64], ys: &'a [f64]) -> Self {
        let m = match method {
            Interpolation::Linear => vec![0.0; xs.len()],
            Interpolation::Cubic => natural_spline_second_derivatives(xs, ys),
        };
        Self { xs, ys, m }
    }

    /// Only called for x strictly inside [xs[0], xs[last]].
    fn eval(&self, x: f64) -> f64 {
        let xs = self.xs;
        let i = match xs.partition_point(|&k| k <= x) {
            0 => 0,
            p => (p - 1).min(xs.len().saturating_sub(2)),
        };
        if xs.len() < 2 {
            return self.ys[0];
        }
        let (x0, x1) = (xs[i], xs[i + 1]);
        let (y0, y1) = (self.ys[i], self.ys[i + 1]);
        let (m0, m1) = (self.m[i], self.m[i + 1]);
        let h = x1 - x0;
        let (a, b) = (x1 - x, x - x0);
        m0 * a.powi(3) / (6.0 * h)
            + m1 * b.powi(3) / (6.0 * h)
            + (y0 / h - m0 * h / 6.0) * a
            + (y1 / h - m1 * h / 6.0) * b
    }
}

/// Natural boundary conditions (zero curvature at both ends), solved with the
/// Thomas algorithm. Fewer than three knots degrade to a straight line.
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let k = xs.len();
    let mut m = vec![0.0; k];
    if k < 3 {
        return m;
    }

    let n = k - 2;
    let mut sub = vec![0.0; n];
    let mut diag = vec![0.0; n];
    let mut sup = vec![0.0; n];
    let mut rhs = vec![0.0; n];
    for j in 0..n {
        let i = j + 1;
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        sub[j] = h0;
        diag[j] = 2.0 * (h0 + h1);
        sup[j] = h1;
        rhs[j] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
    }

    for j in 1..n {
        let w = sub[j] / diag[j - 1];
        diag[j] -= w * sup[j - 1];
        rhs[j] -= w * rhs[j - 1];
    }
    let mut sol = vec![0.0; n];
    sol[n - 1] = rhs[n - 1] / diag[n - 1];
    for j in (0..n - 1).rev() {
        sol[j] = (rhs[j] - sup[j] * sol[j + 1]) / diag[j];
    }

    m[1..k - 1].copy_from_slice(&sol);
    m
}
