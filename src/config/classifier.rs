// src/config/classifier.rs
use serde::{Deserialize, Serialize};
use std::env;

pub const ENV_API_TOKEN: &str = "HF_API_TOKEN";

fn default_provider() -> String {
    "huggingface".to_string()
}
fn default_model() -> String {
    "ProsusAI/finbert".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_endpoint() -> String {
    "https://api-inference.huggingface.co/models/".to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifierConfig {
    /// "huggingface" | "mock" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from HF_API_TOKEN at client build time
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Model id is appended to this URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            endpoint: default_endpoint(),
        }
    }
}

impl ClassifierConfig {
    pub fn provider_normalized(&self) -> String {
        self.provider.trim().to_ascii_lowercase()
    }

    /// Resolve the bearer token, honouring the "ENV" indirection.
    pub fn resolve_api_key(&self) -> anyhow::Result<String> {
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            env::var(ENV_API_TOKEN)
                .map_err(|_| anyhow::anyhow!("Missing {ENV_API_TOKEN} env var"))
        } else {
            Ok(self.api_key.trim().to_string())
        }
    }

    pub fn model_url(&self) -> String {
        format!("{}{}", self.endpoint, self.model)
    }
}
