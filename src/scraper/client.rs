//! Blocking HTTP client for the catalog host. One request per fetch, no retries.

use std::time::Duration;

use crate::scraper::{check_response, Fetch, ScraperError};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; cervantes-iiif/0.1; +https://cervantes.library.tamu.edu)";
const DEFAULT_TIMEOUT_SECS: u64 = 30;
const MAX_REDIRECTS: usize = 10;

/// Blocking HTTP client used by every crawler stage.
#[derive(Debug)]
pub struct CatalogClient {
    inner: reqwest::blocking::Client,
}

impl CatalogClient {
    /// Build a client with default User-Agent and timeout.
    pub fn new() -> Result<Self, reqwest::Error> {
        Self::builder().build()
    }

    pub fn builder() -> CatalogClientBuilder {
        CatalogClientBuilder::default()
    }

    /// Perform a GET request.
    pub fn get(&self, url: &str) -> Result<reqwest::blocking::Response, reqwest::Error> {
        self.inner.get(url).send()
    }
}

impl Fetch for CatalogClient {
    fn fetch_html(&mut self, url: &str, context: &str) -> Result<String, ScraperError> {
        tracing::debug!(url, context, "GET");
        let response = self.get(url).map_err(|e| ScraperError::Network {
            url: url.to_string(),
            source: e,
        })?;
        check_response(response, url, Some(context))
    }
}

/// Builder for CatalogClient with optional User-Agent and timeout.
#[derive(Debug)]
pub struct CatalogClientBuilder {
    user_agent: Option<String>,
    timeout_secs: u64,
}

impl Default for CatalogClientBuilder {
    fn default() -> Self {
        Self {
            user_agent: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl CatalogClientBuilder {
    /// Set a custom User-Agent.
    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    /// Set request timeout in seconds. Default 30.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn build(self) -> Result<CatalogClient, reqwest::Error> {
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| DEFAULT_USER_AGENT.to_string());
        let inner = reqwest::blocking::Client::builder()
            .cookie_store(true)
            .user_agent(user_agent)
            .timeout(Duration::from_secs(self.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()?;
        Ok(CatalogClient { inner })
    }
}
