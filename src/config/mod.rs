//! Configuration module for Shopfront
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use shopfront::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("shopfront.toml")).unwrap();
//! println!("Concurrency limit: {}", config.pipeline.concurrency_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    CategoryEntry, Config, OutputConfig, PipelineConfig, RetrySettings, SiteConfig,
    DEFAULT_USER_AGENT,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
