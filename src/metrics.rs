//! Prometheus recorder for the pipeline's counters, histograms and gauges.
//! The server binary installs it once; `/metrics` renders the current values.

use anyhow::Context;
use axum::{extract::State, routing::get, Router};
use metrics::gauge;
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use once_cell::sync::OnceCell;

static HANDLE: OnceCell<PrometheusHandle> = OnceCell::new();

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder (once per process) and publish the
    /// number of configured tickers as a static gauge.
    pub fn init(configured_tickers: usize) -> anyhow::Result<Self> {
        let handle = HANDLE
            .get_or_try_init(|| {
                PrometheusBuilder::new()
                    .install_recorder()
                    .context("prometheus: install recorder")
            })?
            .clone();

        gauge!("configured_tickers").set(configured_tickers as f64);

        Ok(Self { handle })
    }

    /// `GET /metrics`, merged into the service router by the server binary.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/metrics", get(exposition))
            .with_state(self.handle.clone())
    }
}

async fn exposition(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
