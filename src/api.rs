use std::sync::Arc;

use chrono::{Local, NaiveDate};
use serde::Deserialize;
use shuttle_axum::axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use tower_http::cors::CorsLayer;

use crate::analyze::{build_classifier, DynClassifier};
use crate::config::{clean_tickers, AppConfig};
use crate::error::SentimentError;
use crate::ingest::providers::FinvizNewsSource;
use crate::ingest::NewsSource;
use crate::pipeline::{self, AnalysisReport, Collaborators, PipelineConfig, Preset};
use crate::prices::{PriceSource, YahooPriceSource};

#[derive(Clone)]
pub struct AppState {
    tickers: Arc<Vec<String>>,
    pipeline: PipelineConfig,
    news: Arc<dyn NewsSource>,
    classifier: DynClassifier,
    prices: Arc<dyn PriceSource>,
}

impl AppState {
    pub fn new(
        tickers: Vec<String>,
        pipeline: PipelineConfig,
        news: Arc<dyn NewsSource>,
        classifier: DynClassifier,
        prices: Arc<dyn PriceSource>,
    ) -> Self {
        Self {
            tickers: Arc::new(clean_tickers(tickers)),
            pipeline,
            news,
            classifier,
            prices,
        }
    }

    /// Live collaborators built from configuration.
    pub fn from_config(config: &AppConfig) -> anyhow::Result<Self> {
        let news = FinvizNewsSource::from_url(&config.news.base_url, &config.news.user_agent)?;
        let classifier = build_classifier(&config.classifier)?;
        let prices = YahooPriceSource::new(&config.prices.base_url)?;
        Ok(Self::new(
            config.tickers.clone(),
            config.pipeline,
            Arc::new(news),
            classifier,
            Arc::new(prices),
        ))
    }

    /// Run the pipeline against this state's collaborators.
    pub async fn run_report(
        &self,
        tickers: &[String],
        config: &PipelineConfig,
        today: NaiveDate,
    ) -> crate::Result<AnalysisReport> {
        let collab = Collaborators {
            news: self.news.as_ref(),
            classifier: self.classifier.as_ref(),
            prices: self.prices.as_ref(),
        };
        pipeline::run(tickers, config, &collab, today).await
    }
}

fn today_or_local(today: Option<NaiveDate>) -> NaiveDate {
    today.unwrap_or_else(|| Local::now().date_naive())
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/tickers", get(list_tickers))
        .route("/sentiment/{ticker}", get(sentiment))
        .route("/compare", get(compare))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Error body is always `{"error": "<message>"}`.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    Pipeline(SentimentError),
}

impl From<SentimentError> for ApiError {
    fn from(e: SentimentError) -> Self {
        ApiError::Pipeline(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, msg) = match self {
            ApiError::BadRequest(m) => (StatusCode::BAD_REQUEST, m),
            ApiError::Pipeline(e) if e.is_upstream() => {
                tracing::warn!(error = %e, "pipeline failed upstream");
                (StatusCode::BAD_GATEWAY, e.to_string())
            }
            ApiError::Pipeline(e) => (StatusCode::UNPROCESSABLE_ENTITY, e.to_string()),
        };
        (status, Json(serde_json::json!({ "error": msg }))).into_response()
    }
}

async fn list_tickers(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.tickers.as_ref().clone())
}

#[derive(Debug, Deserialize)]
struct SentimentQuery {
    /// Falls back to the configured pipeline when absent.
    mode: Option<Preset>,
    /// Reference date for "Today" rows; defaults to the local date.
    today: Option<NaiveDate>,
}

async fn sentiment(
    State(state): State<AppState>,
    Path(ticker): Path<String>,
    Query(q): Query<SentimentQuery>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let tickers = clean_tickers([ticker]);
    if tickers.is_empty() {
        return Err(ApiError::BadRequest("empty ticker".into()));
    }
    let config = q.mode.map(PipelineConfig::preset).unwrap_or(state.pipeline);
    let report = state
        .run_report(&tickers, &config, today_or_local(q.today))
        .await?;
    Ok(Json(report))
}

#[derive(Debug, Deserialize)]
struct CompareQuery {
    /// Comma-separated; the configured tickers when absent.
    tickers: Option<String>,
    today: Option<NaiveDate>,
}

async fn compare(
    State(state): State<AppState>,
    Query(q): Query<CompareQuery>,
) -> Result<Json<AnalysisReport>, ApiError> {
    let tickers = match q.tickers.as_deref() {
        Some(list) => clean_tickers(list.split(',')),
        None => state.tickers.as_ref().clone(),
    };
    if tickers.is_empty() {
        return Err(ApiError::BadRequest("no tickers given".into()));
    }
    let report = state
        .run_report(&tickers, &PipelineConfig::compare(), today_or_local(q.today))
        .await?;
    Ok(Json(report))
}
