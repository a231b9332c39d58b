//! Shared HTTP session
//!
//! One session is opened per pipeline run and shared read-only by every
//! concurrently executing extractor. `reqwest::Client` pools connections
//! internally, so clones are cheap handles onto the same pool.

use crate::config::SiteConfig;
use crate::extract::ExtractError;
use crate::HarvestError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// The transport handed to extractors
#[derive(Debug, Clone)]
pub struct Session {
    client: Client,
    site: Arc<SiteConfig>,
}

impl Session {
    /// Opens a session for the given site
    pub fn open(site: &SiteConfig) -> Result<Self, HarvestError> {
        Ok(Self {
            client: build_http_client(site)?,
            site: Arc::new(site.clone()),
        })
    }

    /// The site configuration this session was opened for
    pub fn site(&self) -> &SiteConfig {
        &self.site
    }

    /// Fetches a URL and returns its body as text
    ///
    /// Any non-success status is an error so that it gets retried.
    pub async fn get_text(&self, url: &str) -> Result<String, ExtractError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| ExtractError::Http {
                url: url.to_string(),
                source,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ExtractError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| ExtractError::Http {
            url: url.to_string(),
            source,
        })
    }
}

/// Builds an HTTP client with the site's user agent and headers
///
/// No overall request timeout is set here: each attempt is bounded by the
/// retry policy instead.
pub fn build_http_client(site: &SiteConfig) -> Result<Client, HarvestError> {
    let mut headers = HeaderMap::new();
    for (name, value) in &site.headers {
        let header_name =
            HeaderName::from_bytes(name.as_bytes()).map_err(|e| HarvestError::InvalidHeader {
                name: name.clone(),
                message: e.to_string(),
            })?;
        let header_value = HeaderValue::from_str(value).map_err(|e| HarvestError::InvalidHeader {
            name: name.clone(),
            message: e.to_string(),
        })?;
        headers.insert(header_name, header_value);
    }

    let client = Client::builder()
        .user_agent(site.user_agent.as_str())
        .default_headers(headers)
        .connect_timeout(Duration::from_secs(10))
        .gzip(true)
        .brotli(true)
        .build()?;

    Ok(client)
}
