// src/ingest/types.rs
use anyhow::Result;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

/// One row as read from the news table, before any date normalization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawHeadlineRow {
    pub ticker: String,
    /// Absent when the row inherits the previous row's date.
    pub date_token: Option<String>,
    pub time_token: String,
    pub title: String,
}

/// Normalized headline. `score` stays `None` until the scorer fills it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeadlineRecord {
    pub ticker: String,
    pub date: NaiveDate,
    pub time: NaiveTime,
    pub title: String,
    pub score: Option<f64>,
}

impl HeadlineRecord {
    pub fn datetime(&self) -> NaiveDateTime {
        self.date.and_time(self.time)
    }

    /// Copy of this record carrying `score`.
    pub fn with_score(&self, score: f64) -> Self {
        Self {
            score: Some(score),
            ..self.clone()
        }
    }
}

/// Supplies the raw news markup for a ticker.
#[async_trait::async_trait]
pub trait NewsSource: Send + Sync {
    async fn fetch_news_markup(&self, ticker: &str) -> Result<String>;
    fn name(&self) -> &'static str;
}
