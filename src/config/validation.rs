use crate::config::types::{
    CategoryEntry, Config, OutputConfig, PipelineConfig, RetrySettings, SiteConfig,
};
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Longest accepted per-attempt timeout, one day
const MAX_TIMEOUT_SECS: f64 = 86_400.0;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_site_config(&config.site)?;
    validate_pipeline_config(&config.pipeline)?;
    validate_retry_settings(&config.retry)?;
    validate_output_config(&config.output)?;
    validate_extra_categories(&config.extra_categories)?;
    Ok(())
}

/// Validates the site section
fn validate_site_config(config: &SiteConfig) -> Result<(), ConfigError> {
    validate_http_url("base_url", &config.base_url)?;

    if config.name.is_empty() {
        return Err(ConfigError::Validation("site name cannot be empty".to_string()));
    }

    if !config
        .name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "site name must contain only ASCII letters, digits and underscores, got '{}'",
            config.name
        )));
    }

    if config.user_agent.trim().is_empty() {
        return Err(ConfigError::Validation(
            "user_agent cannot be empty".to_string(),
        ));
    }

    for name in config.headers.keys() {
        if name.is_empty() || name.chars().any(|c| c.is_whitespace() || c == ':') {
            return Err(ConfigError::Validation(format!(
                "invalid header name '{}'",
                name
            )));
        }
    }

    Ok(())
}

/// Validates pipeline sizing
fn validate_pipeline_config(config: &PipelineConfig) -> Result<(), ConfigError> {
    if config.concurrency_limit < 1 || config.concurrency_limit > 1000 {
        return Err(ConfigError::Validation(format!(
            "concurrency_limit must be between 1 and 1000, got {}",
            config.concurrency_limit
        )));
    }

    if config.batch_size < 1 {
        return Err(ConfigError::Validation(format!(
            "batch_size must be >= 1, got {}",
            config.batch_size
        )));
    }

    Ok(())
}

/// Validates the retry policy
fn validate_retry_settings(config: &RetrySettings) -> Result<(), ConfigError> {
    if config.max_retries < 1 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be >= 1, got {}",
            config.max_retries
        )));
    }

    if !config.timeout_secs.is_finite()
        || config.timeout_secs <= 0.0
        || config.timeout_secs > MAX_TIMEOUT_SECS
    {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be greater than 0 and at most {}, got {}",
            MAX_TIMEOUT_SECS, config.timeout_secs
        )));
    }

    if !config.backoff_factor.is_finite()
        || config.backoff_factor < 0.0
        || config.backoff_factor > 3600.0
    {
        return Err(ConfigError::Validation(format!(
            "backoff_factor must be between 0 and 3600, got {}",
            config.backoff_factor
        )));
    }

    if config.max_retries > 32 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 32, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}

/// Validates hand-maintained categories
fn validate_extra_categories(entries: &[CategoryEntry]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for entry in entries {
        if !seen.insert(entry.id) {
            return Err(ConfigError::Validation(format!(
                "duplicate extra category id {}",
                entry.id
            )));
        }

        validate_http_url("extra category base_url", &entry.base_url)?;
    }

    Ok(())
}

fn validate_http_url(field: &str, value: &str) -> Result<(), ConfigError> {
    let url = Url::parse(value)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid {} '{}': {}", field, value, e)))?;

    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ConfigError::Validation(format!(
            "{} '{}' must use http or https",
            field, value
        )));
    }

    Ok(())
}
