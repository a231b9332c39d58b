use crate::pipeline::RetryConfig;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

/// Browser user agent sent when the config does not name one
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
(KHTML, like Gecko) Chrome/89.0.4389.82 Safari/537.36";

/// Main configuration structure for Shopfront
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub site: SiteConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub retry: RetrySettings,
    pub output: OutputConfig,
    /// Categories maintained by hand, merged over the discovered ones
    #[serde(default, rename = "extra-category")]
    pub extra_categories: Vec<CategoryEntry>,
}

/// The site being harvested and how to talk to it
#[derive(Debug, Clone, Deserialize)]
pub struct SiteConfig {
    /// Root URL of the storefront, e.g. `https://www.example.com`
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Site token used by the storefront's embedded product config
    /// (`window.<name>.pdp.config.product`)
    pub name: String,

    #[serde(rename = "user-agent", default = "default_user_agent")]
    pub user_agent: String,

    /// Extra headers sent with every request
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
}

/// Pipeline sizing
#[derive(Debug, Clone, Deserialize)]
pub struct PipelineConfig {
    /// Maximum number of work items executing at once
    #[serde(rename = "concurrency-limit", default = "default_concurrency_limit")]
    pub concurrency_limit: usize,

    /// Number of buffered records that triggers a flush
    #[serde(rename = "batch-size", default = "default_batch_size")]
    pub batch_size: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency_limit: default_concurrency_limit(),
            batch_size: default_batch_size(),
        }
    }
}

/// Per-item retry policy as written in the config file
#[derive(Debug, Clone, Deserialize)]
pub struct RetrySettings {
    #[serde(rename = "max-retries", default = "default_max_retries")]
    pub max_retries: u32,

    /// Per-attempt timeout in seconds
    #[serde(rename = "timeout-secs", default = "default_timeout_secs")]
    pub timeout_secs: f64,

    /// Base of the exponential backoff, in seconds
    #[serde(rename = "backoff-factor", default = "default_backoff_factor")]
    pub backoff_factor: f64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            timeout_secs: default_timeout_secs(),
            backoff_factor: default_backoff_factor(),
        }
    }
}

impl From<&RetrySettings> for RetryConfig {
    fn from(settings: &RetrySettings) -> Self {
        RetryConfig {
            max_retries: settings.max_retries,
            timeout: Duration::try_from_secs_f64(settings.timeout_secs).unwrap_or(Duration::MAX),
            backoff_factor: settings.backoff_factor,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// A category listed by hand in the config
#[derive(Debug, Clone, Deserialize)]
pub struct CategoryEntry {
    pub id: i64,
    pub gender: String,
    pub category: String,
    pub subcategory: String,
    #[serde(rename = "base-url")]
    pub base_url: String,
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

fn default_concurrency_limit() -> usize {
    100
}

fn default_batch_size() -> usize {
    crate::pipeline::DEFAULT_BATCH_SIZE
}

fn default_max_retries() -> u32 {
    5
}

fn default_timeout_secs() -> f64 {
    10.0
}

fn default_backoff_factor() -> f64 {
    1.0
}
