//! # Sentiment Pipeline
//! fetch -> extract -> score -> aggregate -> smooth / align + correlate.
//!
//! One parameterised pipeline covers the single-ticker daily view, the
//! multi-ticker comparison and the intraday trend view. Each stage consumes
//! the previous stage's output by reference and builds its own; nothing is
//! mutated in place, so a run is replayable from the same raw inputs.

use std::time::Instant;

use anyhow::Context;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use metrics::{describe_gauge, describe_histogram, gauge, histogram};
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::aggregate::{self, PivotSeries, SentimentSeries, TimeSeries};
use crate::align::{self, Interpolation};
use crate::analyze::{score_all, Classifier};
use crate::error::{Result, SentimentError};
use crate::ingest::{self, HeadlineRecord, NewsSource};
use crate::prices::{Interval, PriceSeries, PriceSource};
use crate::trend::{self, TrendLine};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Grouping {
    #[default]
    ByDate,
    ByDateAndTicker,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Smoothing {
    None,
    Ema { span: usize },
    OlsTrend,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Alignment {
    /// Join sentiment and closing prices by calendar date.
    None,
    /// Bucket both series on a `minutes` grid; empty price buckets are
    /// interpolated with `method`.
    Resample { minutes: i64, method: Interpolation },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub grouping: Grouping,
    /// Absent means the price source's own default, not the daily preset's.
    #[serde(default)]
    pub price_interval: Option<Interval>,
    /// Fetch prices and correlate (single-ticker, by-date runs only).
    pub with_prices: bool,
    pub smoothing: Smoothing,
    pub alignment: Alignment,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::daily()
    }
}

/// Named configurations matching the three ways the tool is used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Preset {
    Daily,
    Intraday,
    Compare,
}

impl PipelineConfig {
    /// Daily mean sentiment, 3-day EMA, joined with daily closes.
    pub fn daily() -> Self {
        Self {
            grouping: Grouping::ByDate,
            smoothing: Smoothing::Ema { span: 3 },
            alignment: Alignment::None,
            price_interval: Some(Interval::D1),
            with_prices: true,
        }
    }

    /// Per-headline trend line, 30-minute bars resampled hourly.
    pub fn intraday() -> Self {
        Self {
            grouping: Grouping::ByDate,
            smoothing: Smoothing::OlsTrend,
            alignment: Alignment::Resample {
                minutes: 60,
                method: Interpolation::Cubic,
            },
            price_interval: Some(Interval::M30),
            with_prices: true,
        }
    }

    /// One sentiment column per ticker, no prices.
    pub fn compare() -> Self {
        Self {
            grouping: Grouping::ByDateAndTicker,
            smoothing: Smoothing::None,
            alignment: Alignment::None,
            price_interval: None,
            with_prices: false,
        }
    }

    pub fn preset(p: Preset) -> Self {
        match p {
            Preset::Daily => Self::daily(),
            Preset::Intraday => Self::intraday(),
            Preset::Compare => Self::compare(),
        }
    }
}

/// Aggregated sentiment in either output shape.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "shape", content = "series", rename_all = "snake_case")]
pub enum SentimentView {
    Daily(SentimentSeries),
    Pivot(PivotSeries),
}

impl SentimentView {
    /// EMA per series; pivot tables are smoothed column by column.
    pub fn ema(&self, span: usize) -> Result<Self> {
        match self {
            SentimentView::Daily(s) => Ok(SentimentView::Daily(trend::ema(s, span)?)),
            SentimentView::Pivot(p) => {
                let cols = aggregate::pivot_columns(p)
                    .into_iter()
                    .map(|(t, s)| trend::ema(&s, span).map(|e| (t, e)))
                    .collect::<Result<_>>()?;
                Ok(SentimentView::Pivot(aggregate::pivot_from_columns(&cols)))
            }
        }
    }

    pub fn as_daily(&self) -> Option<&SentimentSeries> {
        match self {
            SentimentView::Daily(s) => Some(s),
            SentimentView::Pivot(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            SentimentView::Daily(s) => s.len(),
            SentimentView::Pivot(p) => p.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Trend line over headline scores with its endpoints mapped back to time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TrendOverlay {
    pub line: TrendLine,
    /// x = 0 of the fit (earliest headline).
    pub origin: NaiveDateTime,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl TrendOverlay {
    fn new(line: TrendLine, origin: NaiveDateTime) -> Self {
        let at = |x: f64| origin + Duration::seconds(x.round() as i64);
        Self {
            start: at(line.x_start),
            end: at(line.x_end),
            line,
            origin,
        }
    }
}

/// Everything a rendering layer needs, as plain data.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub tickers: Vec<String>,
    pub reference_date: NaiveDate,
    /// Scored records sorted by headline datetime.
    pub records: Vec<HeadlineRecord>,
    pub sentiment: SentimentView,
    pub smoothed_sentiment: Option<SentimentView>,
    pub trend: Option<TrendOverlay>,
    /// Pearson correlation between headline score and time.
    pub score_time_correlation: Option<f64>,
    pub prices: Option<PriceSeries>,
    pub smoothed_prices: Option<TimeSeries>,
    pub aligned_sentiment: Option<TimeSeries>,
    pub aligned_prices: Option<TimeSeries>,
    /// Sentiment vs. price.
    pub correlation: Option<f64>,
}

/// External collaborators used by a run.
pub struct Collaborators<'a> {
    pub news: &'a dyn NewsSource,
    pub classifier: &'a dyn Classifier,
    pub prices: &'a dyn PriceSource,
}

fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_histogram!("pipeline_run_ms", "End-to-end pipeline run time in milliseconds.");
        describe_gauge!(
            "sentiment_correlation",
            "Last sentiment/price correlation coefficient."
        );
    });
}

/// Run the pipeline for `tickers`. `reference_today` resolves "Today" dates.
pub async fn run(
    tickers: &[String],
    config: &PipelineConfig,
    collab: &Collaborators<'_>,
    reference_today: NaiveDate,
) -> Result<AnalysisReport> {
    ensure_metrics_described();
    let t0 = Instant::now();

    // 1) fetch + extract
    let mut records = Vec::new();
    for ticker in tickers {
        let markup = collab
            .news
            .fetch_news_markup(ticker)
            .await
            .with_context(|| {
                format!(
                    "fetching news markup for {ticker} from {}",
                    collab.news.name()
                )
            })?;
        records.extend(ingest::extract(ticker, &markup, reference_today)?);
    }
    info!(tickers = tickers.len(), records = records.len(), "headlines extracted");

    // 2) score (extraction order), then order chronologically
    let mut scored = score_all(&records, collab.classifier).await?;
    scored.sort_by(|a, b| {
        a.datetime()
            .cmp(&b.datetime())
            .then_with(|| a.ticker.cmp(&b.ticker))
    });

    // 3) aggregate
    let sentiment = match config.grouping {
        Grouping::ByDate => SentimentView::Daily(aggregate::aggregate(&scored)?),
        Grouping::ByDateAndTicker => SentimentView::Pivot(aggregate::aggregate_pivot(&scored)?),
    };
    debug!(keys = sentiment.len(), grouping = ?config.grouping, "sentiment aggregated");

    // 4) smoothing
    let mut smoothed_sentiment = None;
    let mut trend_overlay = None;
    let mut score_time_correlation = None;
    match config.smoothing {
        Smoothing::None => {}
        Smoothing::Ema { span } => smoothed_sentiment = Some(sentiment.ema(span)?),
        Smoothing::OlsTrend => {
            let (origin, points) = trend::time_points(&scored)?
                .ok_or(SentimentError::InsufficientData { points: 0 })?;
            let line = trend::fit_trend(&points)?;
            score_time_correlation = align::pearson(&points)
                .inspect_err(|e| debug!(error = %e, "score/time correlation undefined"))
                .ok();
            info!(slope = line.slope, r_squared = line.r_squared, "trend fitted");
            trend_overlay = Some(TrendOverlay::new(line, origin));
        }
    }

    let mut report = AnalysisReport {
        tickers: tickers.to_vec(),
        reference_date: reference_today,
        records: Vec::new(),
        sentiment,
        smoothed_sentiment,
        trend: trend_overlay,
        score_time_correlation,
        prices: None,
        smoothed_prices: None,
        aligned_sentiment: None,
        aligned_prices: None,
        correlation: None,
    };

    // 5) prices + correlation
    let wants_prices = config.with_prices && config.grouping == Grouping::ByDate;
    match tickers {
        [ticker] if wants_prices => {
            attach_prices(&mut report, ticker, &scored, config, collab.prices).await?
        }
        _ if wants_prices => warn!(
            tickers = tickers.len(),
            "price correlation needs exactly one ticker; skipped"
        ),
        _ => {}
    }

    report.records = scored;
    histogram!("pipeline_run_ms").record(t0.elapsed().as_secs_f64() * 1_000.0);
    Ok(report)
}

async fn attach_prices(
    report: &mut AnalysisReport,
    ticker: &str,
    scored: &[HeadlineRecord],
    config: &PipelineConfig,
    prices: &dyn PriceSource,
) -> Result<()> {
    let (Some(first), Some(last)) = (scored.first(), scored.last()) else {
        return Err(SentimentError::InsufficientOverlap { overlap: 0 });
    };

    let (start, end) = match config.alignment {
        Alignment::None => (
            first.date.and_time(chrono::NaiveTime::MIN),
            (last.date + Duration::days(1)).and_time(chrono::NaiveTime::MIN),
        ),
        Alignment::Resample { .. } => (first.datetime(), last.datetime()),
    };

    let series = prices
        .fetch_price_history(ticker, start, end, config.price_interval)
        .await
        .with_context(|| format!("fetching {ticker} prices from {}", prices.name()))?;
    debug!(ticker, points = series.len(), %start, %end, "price history fetched");

    if let Smoothing::Ema { span } = config.smoothing {
        report.smoothed_prices = Some(trend::ema(&series.closes(), span)?);
    }

    let correlation = match config.alignment {
        Alignment::None => {
            let daily = report
                .sentiment
                .as_daily()
                .ok_or(SentimentError::InsufficientOverlap { overlap: 0 })?;
            align::correlate(daily, &series.daily_closes())?
        }
        Alignment::Resample { minutes, method } => {
            let freq = Duration::minutes(minutes);
            let closes = series.closes();
            let intraday = aggregate::aggregate_intraday(scored)?;
            let origin = align::grid_origin([&intraday, &closes])
                .ok_or(SentimentError::InsufficientOverlap { overlap: 0 })?;
            let aligned_prices = align::resample(&closes, freq, origin, Some(method))?;
            let aligned_sentiment = align::resample(&intraday, freq, origin, None)?;
            let c = align::correlate(&aligned_sentiment, &aligned_prices)?;
            report.aligned_prices = Some(aligned_prices);
            report.aligned_sentiment = Some(aligned_sentiment);
            c
        }
    };

    gauge!("sentiment_correlation").set(correlation);
    info!(ticker, correlation, "sentiment/price correlation");
    report.prices = Some(series);
    report.correlation = Some(correlation);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_round_trip_through_toml() {
        for p in [Preset::Daily, Preset::Intraday, Preset::Compare] {
            let cfg = PipelineConfig::preset(p);
            let s = toml::to_string(&cfg).unwrap();
            let back: PipelineConfig = toml::from_str(&s).unwrap();
            assert_eq!(back, cfg, "{s}");
        }
    }

    #[test]
    fn missing_fields_fall_back_to_daily() {
        let cfg: PipelineConfig = toml::from_str(r#"smoothing = { kind = "none" }"#).unwrap();
        assert_eq!(cfg.smoothing, Smoothing::None);
        assert_eq!(cfg.grouping, Grouping::ByDate);
        assert!(cfg.with_prices);
    }

    #[test]
    fn omitted_price_interval_stays_unset() {
        let cfg: PipelineConfig = toml::from_str(
            r#"
            alignment = { kind = "resample", minutes = 30, method = "linear" }
            "#,
        )
        .unwrap();
        assert_eq!(cfg.price_interval, None);
        assert_eq!(cfg.smoothing, PipelineConfig::daily().smoothing);

        let cfg: PipelineConfig = toml::from_str(r#"price_interval = "5m""#).unwrap();
        assert_eq!(cfg.price_interval, Some(Interval::M5));
    }

    #[test]
    fn pivot_ema_is_per_column() {
        let d = |day| NaiveDate::from_ymd_opt(2024, 6, day).unwrap();
        let mut p = PivotSeries::new();
        p.entry(d(1)).or_default().insert("A".to_string(), 0.0);
        p.entry(d(2)).or_default().insert("A".to_string(), 1.0);
        p.entry(d(2)).or_default().insert("B".to_string(), 0.8);
        let SentimentView::Pivot(s) = SentimentView::Pivot(p).ema(3).unwrap() else {
            panic!("shape changed");
        };
        assert!((s[&d(2)]["A"] - 0.5).abs() < 1e-12);
        // B starts its own recurrence
        assert!((s[&d(2)]["B"] - 0.8).abs() < 1e-12);
    }
}
