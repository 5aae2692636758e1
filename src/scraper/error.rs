//! Shared error type for the catalog crawlers.

use thiserror::Error;

/// Scraper error for URLs, HTTP, identifier parsing, and page-structure checks.
#[derive(Debug, Error)]
pub enum ScraperError {
    #[error("Invalid URL: {input}: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("Network error: could not reach {url}: {source}")]
    Network { url: String, source: reqwest::Error },

    /// Any non-success status. Fatal for the crawl that issued the request.
    #[error("HTTP {status} when fetching: {url}")]
    HttpStatus {
        status: u16,
        url: String,
        /// Optional context (e.g. "results page 3", "detail page") for programmatic use.
        context: Option<String>,
    },

    #[error("Failed to read response body: {source}")]
    BodyRead { source: reqwest::Error },

    #[error("Malformed image identifier in {input}: expected at least 4 hyphen-separated tokens, found {tokens}")]
    MalformedIdentifier { input: String, tokens: usize },

    /// Page markup does not have the structure the crawler reads from.
    #[error("Unexpected page structure ({context}): {detail}")]
    SchemaMismatch { context: String, detail: String },

    #[error("Invalid image-service info at {url}: {reason}")]
    ImageInfo { url: String, reason: String },
}

impl ScraperError {
    pub(crate) fn schema(context: impl Into<String>, detail: impl Into<String>) -> Self {
        ScraperError::SchemaMismatch {
            context: context.into(),
            detail: detail.into(),
        }
    }
}
