// tests/common/mod.rs
// Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::anyhow;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use headline_sentiment::analyze::{Classification, Classifier};
use headline_sentiment::ingest::providers::FinvizNewsSource;
use headline_sentiment::prices::{PricePoint, PriceSeries, StaticPriceSource};

pub const AMD_PAGE: &str = include_str!("../fixtures/finviz_amd.html");
pub const AAPL_PAGE: &str = include_str!("../fixtures/finviz_aapl.html");

/// "Today" in the AMD fixture resolves to this date.
pub fn reference_today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, 19).unwrap()
}

pub fn d(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 6, day).unwrap()
}

pub fn dt(day: u32, h: u32, m: u32) -> NaiveDateTime {
    d(day).and_hms_opt(h, m, 0).unwrap()
}

pub fn news() -> FinvizNewsSource {
    FinvizNewsSource::from_fixtures([("AMD", AMD_PAGE), ("AAPL", AAPL_PAGE)])
}

/// Fixed score per headline title; unknown titles are an error.
pub struct ScriptedClassifier {
    scores: HashMap<&'static str, f64>,
    pub calls: AtomicUsize,
}

impl ScriptedClassifier {
    pub fn new() -> Self {
        let scores = [
            ("AMD unveils new Instinct accelerators", 0.9),
            ("Analysts lift AMD price targets & see upside", 0.7),
            ("AMD shares slip after hours", 0.2),
            ("Chipmakers rally as AI demand 'surges'", 0.8),
            ("AMD opens higher", 0.5),
            ("AMD faces export curbs", 0.1),
            ("Apple expands AI features", 0.6),
            ("Apple supplier warns on margins", 0.3),
        ]
        .into_iter()
        .collect();
        Self {
            scores,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_scores(scores: &[(&'static str, f64)]) -> Self {
        Self {
            scores: scores.iter().copied().collect(),
            calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl Classifier for ScriptedClassifier {
    async fn classify(&self, text: &str) -> anyhow::Result<Classification> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let score = *self
            .scores
            .get(text)
            .ok_or_else(|| anyhow!("unscripted headline {text:?}"))?;
        Ok(Classification {
            label: "positive".into(),
            score,
        })
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}

/// Daily closes at 16:00, 2024-06-16..=2024-06-20.
pub fn daily_prices() -> StaticPriceSource {
    let closes = [(16, 149.0), (17, 150.0), (18, 155.0), (19, 160.0), (20, 120.0)];
    let series = PriceSeries::new(closes.into_iter().map(|(day, close)| PricePoint {
        timestamp: dt(day, 16, 0),
        close,
    }));
    StaticPriceSource::new([("AMD", series)])
}

/// 30-minute bars 09:30..=16:00 on 2024-06-17..=2024-06-19, drifting upward.
pub fn intraday_prices() -> StaticPriceSource {
    let mut points = Vec::new();
    let mut close = 150.0;
    for day in 17..=19 {
        for slot in 0..14 {
            let minutes = 9 * 60 + 30 + slot * 30;
            points.push(PricePoint {
                timestamp: dt(day, minutes / 60, minutes % 60),
                close,
            });
            close += 0.25;
        }
    }
    StaticPriceSource::new([("AMD", PriceSeries::new(points))])
}
