//! Runs the pipeline once and prints the series, trend and correlation.
//!
//! Usage: `sentiment_report [daily|intraday|compare] [TICKER...]`
//! Without arguments the configured pipeline and tickers are used.

use anyhow::{anyhow, Context};
use chrono::Local;
use headline_sentiment::config::{clean_tickers, load_config_default};
use headline_sentiment::pipeline::{SentimentView, TrendOverlay};
use headline_sentiment::{AnalysisReport, AppState, PipelineConfig, Preset};
use tracing_subscriber::EnvFilter;

fn parse_preset(arg: &str) -> Option<Preset> {
    match arg.to_ascii_lowercase().as_str() {
        "daily" => Some(Preset::Daily),
        "intraday" => Some(Preset::Intraday),
        "compare" => Some(Preset::Compare),
        _ => None,
    }
}

fn print_view(label: &str, view: &SentimentView) {
    println!("{label}:");
    match view {
        SentimentView::Daily(s) => {
            for (d, v) in s {
                println!("  {d}  {v:+.4}");
            }
        }
        SentimentView::Pivot(p) => {
            for (d, row) in p {
                let cells: Vec<String> = row.iter().map(|(t, v)| format!("{t}={v:+.4}")).collect();
                println!("  {d}  {}", cells.join("  "));
            }
        }
    }
}

fn print_trend(t: &TrendOverlay) {
    println!(
        "trend: slope {:+.3e}/s  intercept {:.4}  R^2 {:.4}",
        t.line.slope, t.line.intercept, t.line.r_squared
    );
    let [(_, y0), (_, y1)] = t.line.endpoints();
    println!("  {}  {y0:.4}", t.start);
    println!("  {}  {y1:.4}", t.end);
}

fn print_report(r: &AnalysisReport) {
    println!(
        "{} headline(s) for {} as of {}",
        r.records.len(),
        r.tickers.join(","),
        r.reference_date
    );
    print_view("sentiment", &r.sentiment);
    if let Some(s) = &r.smoothed_sentiment {
        print_view("sentiment (EMA)", s);
    }
    if let Some(t) = &r.trend {
        print_trend(t);
    }
    if let Some(c) = r.score_time_correlation {
        println!("score/time correlation: {c:.4}");
    }
    if let Some(p) = &r.prices {
        println!("prices: {} point(s)", p.len());
    }
    if let Some(c) = r.correlation {
        println!("correlation between sentiment and price: {c:.4}");
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_env_filter(filter)
        .init();

    let config = load_config_default().context("loading config")?;

    let mut args = std::env::args().skip(1).peekable();
    let pipeline = match args.peek().and_then(|a| parse_preset(a)) {
        Some(p) => {
            args.next();
            PipelineConfig::preset(p)
        }
        None => config.pipeline,
    };
    let mut tickers = clean_tickers(args);
    if tickers.is_empty() {
        tickers = config.tickers.clone();
    }
    if tickers.is_empty() {
        return Err(anyhow!("no tickers to analyse"));
    }

    let state = AppState::from_config(&config)?;
    let report = state
        .run_report(&tickers, &pipeline, Local::now().date_naive())
        .await?;
    print_report(&report);
    Ok(())
}
