//! Hugging Face inference API text classifier (default model: FinBERT).

use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::{Classification, Classifier};
use crate::config::ClassifierConfig;

pub struct HuggingFaceClassifier {
    http: reqwest::Client,
    url: String,
    api_key: String,
}

#[derive(Debug, Clone, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

/// The endpoint answers `[[{label,score},..]]` for a single input, some
/// deployments flatten it to `[{label,score},..]`, and errors come back as
/// `{"error": ".."}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum InferenceResponse {
    Nested(Vec<Vec<LabelScore>>),
    Flat(Vec<LabelScore>),
    Error { error: String },
}

impl HuggingFaceClassifier {
    pub fn new(config: &ClassifierConfig) -> Result<Self> {
        let api_key = config.resolve_api_key()?;
        let http = reqwest::Client::builder()
            .user_agent("headline-sentiment/0.1")
            .connect_timeout(Duration::from_secs(4))
            .timeout(Duration::from_secs(30))
            .build()
            .context("building inference http client")?;
        Ok(Self {
            http,
            url: config.model_url(),
            api_key,
        })
    }
}

#[async_trait]
impl Classifier for HuggingFaceClassifier {
    async fn classify(&self, text: &str) -> Result<Classification> {
        #[derive(Serialize)]
        struct Req<'a> {
            inputs: &'a str,
        }

        let resp = self
            .http
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&Req { inputs: text })
            .send()
            .await
            .context("inference http post()")?;

        let status = resp.status();
        let body = resp.text().await.context("inference http .text()")?;
        if !status.is_success() {
            return Err(anyhow!("inference endpoint returned {status}: {}", body.trim()));
        }
        let parsed: InferenceResponse =
            serde_json::from_str(&body).context("parsing inference response json")?;
        top_label(parsed)
    }

    fn provider_name(&self) -> &'static str {
        "huggingface"
    }
}

/// Keep only the winning label and its confidence.
fn top_label(resp: InferenceResponse) -> Result<Classification> {
    let labels = match resp {
        InferenceResponse::Nested(mut outer) => {
            if outer.is_empty() {
                Vec::new()
            } else {
                outer.swap_remove(0)
            }
        }
        InferenceResponse::Flat(v) => v,
        InferenceResponse::Error { error } => return Err(anyhow!("inference error: {error}")),
    };
    labels
        .into_iter()
        .max_by(|a, b| a.score.total_cmp(&b.score))
        .map(|ls| Classification {
            label: ls.label,
            score: ls.score,
        })
        .ok_or_else(|| anyhow!("inference response carried no labels"))
}
