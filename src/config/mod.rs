// src/config/mod.rs
//! Application configuration loaded from TOML.
//!
//! Lookup order:
//! 1) `$SENTIMENT_CONFIG_PATH` (must exist)
//! 2) `config/sentiment.toml`
//! 3) built-in defaults

pub mod classifier;

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use crate::ingest::providers::finviz;
use crate::pipeline::PipelineConfig;
use crate::prices;

pub use classifier::ClassifierConfig;

pub const ENV_CONFIG_PATH: &str = "SENTIMENT_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/sentiment.toml";

fn default_tickers() -> Vec<String> {
    vec!["AMD".to_string()]
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsConfig {
    pub base_url: String,
    pub user_agent: String,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            base_url: finviz::DEFAULT_BASE_URL.to_string(),
            user_agent: finviz::DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricesConfig {
    pub base_url: String,
}

impl Default for PricesConfig {
    fn default() -> Self {
        Self {
            base_url: prices::DEFAULT_CHART_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_tickers")]
    pub tickers: Vec<String>,
    #[serde(default)]
    pub news: NewsConfig,
    #[serde(default)]
    pub prices: PricesConfig,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            tickers: default_tickers(),
            news: NewsConfig::default(),
            prices: PricesConfig::default(),
            classifier: ClassifierConfig::default(),
            pipeline: PipelineConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let mut cfg: AppConfig = toml::from_str(s).context("parsing sentiment config toml")?;
        cfg.tickers = clean_tickers(cfg.tickers);
        if cfg.tickers.is_empty() {
            return Err(anyhow!("config lists no tickers"));
        }
        Ok(cfg)
    }
}

/// Load configuration from an explicit path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("reading sentiment config from {}", path.display()))?;
    AppConfig::from_toml_str(&content)
}

/// Load configuration using env var + fallbacks (see module docs).
pub fn load_config_default() -> Result<AppConfig> {
    if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return load_config_from(&pb);
        }
        return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
    }
    let default_path = PathBuf::from(DEFAULT_CONFIG_PATH);
    if default_path.exists() {
        return load_config_from(&default_path);
    }
    Ok(AppConfig::default())
}

/// Trim, upper-case and de-duplicate tickers, keeping first-seen order.
pub fn clean_tickers<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|t| t.as_ref().trim().to_ascii_uppercase())
        .filter(|t| !t.is_empty() && seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::{Alignment, Grouping, Smoothing};
    use crate::align::Interpolation;
    use std::env;

    #[test]
    fn empty_toml_gives_defaults() {
        let cfg = AppConfig::from_toml_str("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.pipeline, PipelineConfig::daily());
    }

    #[test]
    fn full_toml_parses() {
        let s = r#"
            tickers = [" aapl", "AMZN", "AAPL", ""]

            [classifier]
            provider = "mock"

            [pipeline]
            grouping = "by_date_and_ticker"
            smoothing = { kind = "ols_trend" }
            alignment = { kind = "resample", minutes = 60, method = "cubic" }
            price_interval = "30m"
        "#;
        let cfg = AppConfig::from_toml_str(s).unwrap();
        assert_eq!(cfg.tickers, vec!["AAPL", "AMZN"]);
        assert_eq!(cfg.classifier.provider_normalized(), "mock");
        assert_eq!(cfg.pipeline.grouping, Grouping::ByDateAndTicker);
        assert_eq!(cfg.pipeline.smoothing, Smoothing::OlsTrend);
        assert_eq!(
            cfg.pipeline.alignment,
            Alignment::Resample {
                minutes: 60,
                method: Interpolation::Cubic
            }
        );
        assert_eq!(cfg.pipeline.price_interval, Some(prices::Interval::M30));
    }

    #[test]
    fn no_tickers_is_rejected() {
        assert!(AppConfig::from_toml_str("tickers = []").is_err());
    }

    #[serial_test::serial]
    #[test]
    fn default_uses_env_then_fallbacks() {
        // Isolate CWD so the repo's own config/ does not interfere
        let old = env::current_dir().unwrap();
        let tmp = tempfile::tempdir().unwrap();
        env::set_current_dir(tmp.path()).unwrap();
        env::remove_var(ENV_CONFIG_PATH);

        // No files -> defaults
        assert_eq!(load_config_default().unwrap(), AppConfig::default());

        // Env wins
        let p = tmp.path().join("custom.toml");
        fs::write(&p, r#"tickers = ["NVDA"]"#).unwrap();
        env::set_var(ENV_CONFIG_PATH, p.display().to_string());
        assert_eq!(load_config_default().unwrap().tickers, vec!["NVDA"]);

        // Env pointing nowhere is an error
        env::set_var(ENV_CONFIG_PATH, tmp.path().join("missing.toml"));
        assert!(load_config_default().is_err());
        env::remove_var(ENV_CONFIG_PATH);

        env::set_current_dir(&old).unwrap();
    }
}
