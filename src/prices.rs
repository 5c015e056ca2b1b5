//! Price history: the series type, the collaborator trait and a Yahoo Finance
//! chart-API client.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::aggregate::TimeSeries;

pub const DEFAULT_CHART_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

/// Bar size requested from the price collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Interval {
    #[serde(rename = "5m")]
    M5,
    #[serde(rename = "15m")]
    M15,
    #[serde(rename = "30m")]
    M30,
    #[serde(rename = "1h")]
    H1,
    #[serde(rename = "1d")]
    D1,
}

impl Interval {
    pub fn as_str(&self) -> &'static str {
        match self {
            Interval::M5 => "5m",
            Interval::M15 => "15m",
            Interval::M30 => "30m",
            Interval::H1 => "1h",
            Interval::D1 => "1d",
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Interval {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "5m" => Ok(Interval::M5),
            "15m" => Ok(Interval::M15),
            "30m" => Ok(Interval::M30),
            "1h" | "60m" => Ok(Interval::H1),
            "1d" => Ok(Interval::D1),
            other => Err(anyhow!("unsupported price interval {other:?}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: NaiveDateTime,
    pub close: f64,
}

/// Chronologically ascending closing prices. Holes (market closures) are
/// simply missing points.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries(Vec<PricePoint>);

impl PriceSeries {
    /// Sorts by timestamp; a later duplicate timestamp replaces an earlier one.
    pub fn new(points: impl IntoIterator<Item = PricePoint>) -> Self {
        let by_ts: BTreeMap<NaiveDateTime, f64> =
            points.into_iter().map(|p| (p.timestamp, p.close)).collect();
        Self(
            by_ts
                .into_iter()
                .map(|(timestamp, close)| PricePoint { timestamp, close })
                .collect(),
        )
    }

    pub fn points(&self) -> &[PricePoint] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn closes(&self) -> TimeSeries {
        self.0.iter().map(|p| (p.timestamp, p.close)).collect()
    }

    /// Last close of each calendar date.
    pub fn daily_closes(&self) -> BTreeMap<NaiveDate, f64> {
        self.0
            .iter()
            .map(|p| (p.timestamp.date(), p.close))
            .collect()
    }

    /// Points with `start <= timestamp < end`.
    pub fn window(&self, start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self(
            self.0
                .iter()
                .filter(|p| p.timestamp >= start && p.timestamp < end)
                .copied()
                .collect(),
        )
    }
}

/// Historical price collaborator.
#[async_trait]
pub trait PriceSource: Send + Sync {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Option<Interval>,
    ) -> Result<PriceSeries>;
    fn name(&self) -> &'static str;
}

/// Serves fixed series from memory, windowed to the requested range.
/// The interval argument is ignored.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceSource {
    series: HashMap<String, PriceSeries>,
}

impl StaticPriceSource {
    pub fn new<I, K>(series: I) -> Self
    where
        I: IntoIterator<Item = (K, PriceSeries)>,
        K: AsRef<str>,
    {
        Self {
            series: series
                .into_iter()
                .map(|(k, v)| (k.as_ref().to_ascii_uppercase(), v))
                .collect(),
        }
    }
}

#[async_trait]
impl PriceSource for StaticPriceSource {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        _interval: Option<Interval>,
    ) -> Result<PriceSeries> {
        self.series
            .get(&ticker.to_ascii_uppercase())
            .map(|s| s.window(start, end))
            .ok_or_else(|| anyhow!("no static price series for {ticker}"))
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

// ------------------------------------------------------------
// Yahoo Finance chart API
// ------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct YahooResponse {
    chart: ChartResult,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    result: Option<Vec<ChartData>>,
    error: Option<YahooError>,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    meta: ChartMeta,
    timestamp: Option<Vec<i64>>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct ChartMeta {
    /// Exchange offset from UTC in seconds.
    gmtoffset: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    quote: Vec<Quote>,
}

#[derive(Debug, Deserialize)]
struct Quote {
    close: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct YahooError {
    code: String,
    description: String,
}

pub struct YahooPriceSource {
    client: reqwest::Client,
    base_url: String,
}

impl YahooPriceSource {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building yahoo http client")?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Chart request for exchange-local `start..end`. The exchange offset is
    /// only known from the response, so the query is widened by a day on
    /// each side and the bars are trimmed after shifting.
    fn chart_url(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Interval,
    ) -> String {
        // covers any exchange's distance from UTC
        let pad = chrono::Duration::days(1);
        format!(
            "{}/{}?period1={}&period2={}&interval={}",
            self.base_url,
            ticker,
            (start - pad).and_utc().timestamp(),
            (end + pad).and_utc().timestamp(),
            interval
        )
    }
}

#[async_trait]
impl PriceSource for YahooPriceSource {
    async fn fetch_price_history(
        &self,
        ticker: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        interval: Option<Interval>,
    ) -> Result<PriceSeries> {
        let interval = interval.unwrap_or(Interval::D1);
        let url = self.chart_url(ticker, start, end, interval);

        let resp: YahooResponse = self
            .client
            .get(&url)
            .send()
            .await
            .context("yahoo http get()")?
            .json()
            .await
            .context("parsing yahoo chart json")?;

        let series = series_from_chart(resp)?.window(start, end);
        tracing::debug!(ticker, %interval, points = series.len(), "fetched price history");
        Ok(series)
    }

    fn name(&self) -> &'static str {
        "yahoo"
    }
}

/// Timestamps are shifted into exchange-local naive time; null closes are
/// dropped.
fn series_from_chart(resp: YahooResponse) -> Result<PriceSeries> {
    if let Some(error) = resp.chart.error {
        return Err(anyhow!(
            "Yahoo Finance error: {} - {}",
            error.code,
            error.description
        ));
    }
    let data = resp
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(|| anyhow!("yahoo chart returned no result"))?;

    let offset = data.meta.gmtoffset.unwrap_or(0);
    let timestamps = data.timestamp.unwrap_or_default();
    let closes = data
        .indicators
        .quote
        .into_iter()
        .next()
        .map(|q| q.close)
        .unwrap_or_default();

    let mut points = Vec::with_capacity(timestamps.len());
    for (ts, close) in timestamps.iter().zip(closes) {
        let Some(close) = close else { continue };
        let local = DateTime::from_timestamp(ts + offset, 0)
            .ok_or_else(|| anyhow!("timestamp {ts} out of range"))?
            .naive_utc();
        points.push(PricePoint {
            timestamp: local,
            close,
        });
    }
    Ok(PriceSeries::new(points))
}
