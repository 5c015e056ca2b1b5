// tests/metrics.rs
mod common;

use axum::body::{self, Body};
use axum::http::{Request, StatusCode};
use common::{reference_today, ScriptedClassifier};
use headline_sentiment::metrics::Metrics;
use headline_sentiment::pipeline::{run, Collaborators, PipelineConfig};
use tower::ServiceExt;

#[tokio::test]
async fn metrics_endpoint_reports_pipeline_series() {
    let metrics = Metrics::init(1).expect("recorder");
    // a second init reuses the installed recorder
    let again = Metrics::init(1).expect("recorder reuse");

    let news = common::news();
    let classifier = ScriptedClassifier::new();
    let prices = common::daily_prices();
    let collab = Collaborators {
        news: &news,
        classifier: &classifier,
        prices: &prices,
    };
    run(&["AMD".to_string()], &PipelineConfig::daily(), &collab, reference_today())
        .await
        .expect("daily run");

    let resp = again
        .router()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    // axum::body::to_bytes requires an explicit limit
    let body = body::to_bytes(resp.into_body(), 1_048_576).await.unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();

    for needle in [
        "headlines_extracted_total",
        "headlines_scored_total",
        "pipeline_run_ms",
        "sentiment_correlation",
        "configured_tickers",
    ] {
        assert!(text.contains(needle), "missing {needle} in:\n{text}");
    }
    assert!(!metrics.handle.render().is_empty());
}
