//! Shopfront: a concurrent storefront harvester
//!
//! This crate walks an e-commerce site in four stages (categories, listing
//! pages, article URLs, article data). Each stage fans work items out over a
//! bounded pool of retrying fetch tasks and persists the extracted rows to
//! SQLite in batches.

pub mod config;
pub mod extract;
pub mod pipeline;
pub mod storage;
pub mod utils;

use thiserror::Error;

/// Main error type for Shopfront operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Invalid header {name}: {message}")]
    InvalidHeader { name: String, message: String },

    #[error("Concurrency limit must be >= 1, got {0}")]
    InvalidConcurrency(usize),

    #[error("Concurrency limiter closed while tasks were pending")]
    LimiterClosed,

    /// An extractor or task broke its contract; the run cannot continue
    #[error("Contract violation: {0}")]
    Contract(String),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Shopfront operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use extract::{ExtractError, Extractor, Session};
pub use pipeline::{run_pipeline, PipelineOutcome, RetryConfig, RetryError};
