//! Headline Sentiment Service: binary entrypoint.
//! Boots the Axum HTTP server with live collaborators and `/metrics`.

use headline_sentiment::config::load_config_default;
use headline_sentiment::metrics::Metrics;
use headline_sentiment::{create_router, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `SENTIMENT_DEV_LOG=1` asks for local pipeline logs. It is honoured only
/// in a debug build or when Shuttle reports a local/dev environment.
fn dev_logging_requested(flag: Option<&str>, shuttle_env: Option<&str>, debug_build: bool) -> bool {
    let local = debug_build
        || shuttle_env.is_some_and(|env| {
            ["local", "development", "dev"]
                .iter()
                .any(|name| env.eq_ignore_ascii_case(name))
        });
    flag == Some("1") && local
}

fn init_dev_tracing() {
    let flag = std::env::var("SENTIMENT_DEV_LOG").ok();
    let shuttle_env = std::env::var("SHUTTLE_ENV").ok();
    if !dev_logging_requested(
        flag.as_deref(),
        shuttle_env.as_deref(),
        cfg!(debug_assertions),
    ) {
        return;
    }

    // pipeline stages at info, everything else (reqwest, hyper) at warn
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("headline_sentiment=info,warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // .env supplies HF_API_TOKEN / SENTIMENT_CONFIG_PATH locally; no-op in prod.
    let _ = dotenvy::dotenv();

    init_dev_tracing();

    let config = load_config_default()?;
    tracing::info!(tickers = ?config.tickers, pipeline = ?config.pipeline, "config loaded");

    let metrics = Metrics::init(config.tickers.len())?;
    let state = AppState::from_config(&config)?;
    let router = create_router(state).merge(metrics.router());

    Ok(router.into())
}
