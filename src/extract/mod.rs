//! Extractors turning fetched storefront pages into rows
//!
//! This module contains:
//! - The [`Extractor`] capability driven by the pipeline
//! - The shared HTTP [`Session`]
//! - HTML/JSON parsing of the storefront's pages
//! - One extractor per harvest stage

mod parser;
mod session;
mod stages;

pub use parser::{
    parse_article_data, parse_article_urls, parse_categories, parse_total_pages, ArticleDetails,
};
pub use session::{build_http_client, Session};
pub use stages::{
    ArticleDataExtractor, ArticleUrlExtractor, CategoryExtractor, PageUrlExtractor, SiteRoot,
};

use crate::storage::Row;
use async_trait::async_trait;
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Errors raised while extracting rows from one work item
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("Parse error for {url}: {message}")]
    Parse { url: String, message: String },

    #[error("Attempt timed out after {0:?}")]
    Timeout(Duration),

    /// The extractor was handed something it can never process
    #[error("Contract violation: {0}")]
    Contract(String),
}

impl ExtractError {
    /// Returns true if another attempt may succeed
    ///
    /// Everything except a contract violation is treated as transient.
    pub fn is_retryable(&self) -> bool {
        !matches!(self, ExtractError::Contract(_))
    }
}

/// A stage's page extractor
///
/// Implementations must not keep mutable state shared between calls: many
/// `extract` calls run concurrently against the same `&self`.
#[async_trait]
pub trait Extractor: Send + Sync + 'static {
    /// The unit of work this extractor consumes
    type Item: Clone + fmt::Debug + Send + Sync + 'static;

    /// The row type it produces
    type Output: Row + Send + 'static;

    /// Short human readable name used in logs
    fn name(&self) -> &'static str;

    /// Fetches and parses one work item into zero or more rows
    async fn extract(
        &self,
        session: &Session,
        item: &Self::Item,
    ) -> Result<Vec<Self::Output>, ExtractError>;
}
