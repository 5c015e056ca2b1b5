// src/analyze/mod.rs
//! Headline classification: collaborator abstraction, concrete providers and
//! the scorer that attaches classifier scores to headline records.

pub mod huggingface;
pub mod scoring;

use std::sync::Arc;

use async_trait::async_trait;
use metrics::describe_counter;
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::config::ClassifierConfig;

pub use huggingface::HuggingFaceClassifier;
pub use scoring::score_all;

pub const ENV_TEST_MODE: &str = "CLASSIFIER_TEST_MODE";

/// Output of a text classifier. `score` is the confidence of `label`, not a
/// signed sentiment value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub label: String,
    pub score: f64,
}

/// Text-classification collaborator.
#[async_trait]
pub trait Classifier: Send + Sync {
    async fn classify(&self, text: &str) -> anyhow::Result<Classification>;
    /// Provider name for diagnostics/logs.
    fn provider_name(&self) -> &'static str;
}

pub type DynClassifier = Arc<dyn Classifier>;

/// Returns the same classification for every input; used for mock mode.
#[derive(Debug, Clone)]
pub struct FixedClassifier {
    pub fixed: Classification,
}

impl FixedClassifier {
    pub fn neutral() -> Self {
        Self {
            fixed: Classification {
                label: "neutral".to_string(),
                score: 0.5,
            },
        }
    }
}

#[async_trait]
impl Classifier for FixedClassifier {
    async fn classify(&self, _text: &str) -> anyhow::Result<Classification> {
        Ok(self.fixed.clone())
    }
    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

/// Factory: build a classifier according to config and environment.
///
/// * If `CLASSIFIER_TEST_MODE=mock`, returns a fixed neutral classifier.
/// * Else `provider = "mock"` does the same and `"huggingface"` builds the
///   inference API client.
pub fn build_classifier(config: &ClassifierConfig) -> anyhow::Result<DynClassifier> {
    if std::env::var(ENV_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Ok(Arc::new(FixedClassifier::neutral()));
    }

    match config.provider_normalized().as_str() {
        "mock" => Ok(Arc::new(FixedClassifier::neutral())),
        "huggingface" | "hf" => Ok(Arc::new(HuggingFaceClassifier::new(config)?)),
        other => anyhow::bail!("Unsupported classifier provider in config: {other}"),
    }
}

pub(crate) fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("headlines_scored_total", "Headlines scored by the classifier.");
        describe_counter!(
            "classifier_errors_total",
            "Classifier failures and malformed classifier results."
        );
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[serial_test::serial]
    #[test]
    fn mock_provider_builds_without_token() {
        std::env::remove_var(ENV_TEST_MODE);
        let cfg = ClassifierConfig {
            provider: "Mock".into(),
            ..Default::default()
        };
        assert_eq!(build_classifier(&cfg).unwrap().provider_name(), "mock");
    }

    #[serial_test::serial]
    #[test]
    fn unknown_provider_is_rejected() {
        std::env::remove_var(ENV_TEST_MODE);
        let cfg = ClassifierConfig {
            provider: "vader".into(),
            ..Default::default()
        };
        assert!(build_classifier(&cfg).is_err());
    }

    #[serial_test::serial]
    #[test]
    fn test_mode_env_overrides_provider() {
        std::env::set_var(ENV_TEST_MODE, "mock");
        let client = build_classifier(&ClassifierConfig::default()).unwrap();
        assert_eq!(client.provider_name(), "mock");
        std::env::remove_var(ENV_TEST_MODE);
    }
}
