use std::collections::HashMap;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use metrics::counter;

use crate::ingest::types::NewsSource;

pub const DEFAULT_BASE_URL: &str = "https://finviz.com/quote.ashx?t=";
pub const DEFAULT_USER_AGENT: &str = concat!(
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) ",
    "AppleWebKit/537.36 (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36"
);

/// Quote-page news collaborator. The page is served either over HTTP or from
/// an in-memory fixture map keyed by ticker.
pub struct FinvizNewsSource {
    mode: Mode,
}

enum Mode {
    Fixture(HashMap<String, String>),
    Http {
        base_url: String,
        client: reqwest::Client,
    },
}

impl FinvizNewsSource {
    pub fn from_url(base_url: &str, user_agent: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(15))
            .build()
            .context("building finviz http client")?;
        Ok(Self {
            mode: Mode::Http {
                base_url: base_url.to_string(),
                client,
            },
        })
    }

    /// Serve markup from memory; tickers are matched case-insensitively.
    pub fn from_fixtures<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let map = pages
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_ascii_uppercase(), v.into()))
            .collect();
        Self {
            mode: Mode::Fixture(map),
        }
    }
}

#[async_trait]
impl NewsSource for FinvizNewsSource {
    async fn fetch_news_markup(&self, ticker: &str) -> Result<String> {
        match &self.mode {
            Mode::Fixture(pages) => pages
                .get(&ticker.to_ascii_uppercase())
                .cloned()
                .ok_or_else(|| anyhow!("no fixture markup for ticker {ticker}")),

            Mode::Http { base_url, client } => {
                let url = format!("{base_url}{ticker}");
                let resp = match client.get(&url).send().await {
                    Ok(resp) => resp,
                    Err(e) => {
                        tracing::warn!(error = ?e, ticker, "finviz http error");
                        counter!("news_fetch_errors_total").increment(1);
                        return Err(e).context("finviz http get()");
                    }
                };
                let status = resp.status();
                if !status.is_success() {
                    counter!("news_fetch_errors_total").increment(1);
                    return Err(anyhow!("finviz returned {status} for {ticker}"));
                }
                resp.text().await.context("finviz http .text()")
            }
        }
    }

    fn name(&self) -> &'static str {
        "Finviz"
    }
}
