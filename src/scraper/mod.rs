//! Catalog crawling: the fetch seam, shared HTML helpers, and the three crawler stages
//! (edition list -> work pages -> detail pages).

mod client;
mod error;

pub mod editions;
pub mod image_info;
pub mod page;
pub mod work;

pub use client::{CatalogClient, CatalogClientBuilder};
pub use error::ScraperError;

use reqwest::{StatusCode, Url};
use scraper::{ElementRef, Selector};

/// Every relative link on the catalog resolves against this directory.
pub const CATALOG_BASE: &str = "https://cervantes.library.tamu.edu/dqiDisplayInterface/";
/// Edition search-results page.
pub const EDITION_SEARCH_PAGE: &str = "doSearchEditions.jsp";
/// Href marker for per-image detail pages.
pub const DETAIL_PAGE_MARKER: &str = "displayMidImage.jsp?edition=";

/// Source of page bodies. The HTTP client implements this; tests serve fixtures from memory.
pub trait Fetch {
    /// GET `url` and return the body. Any status other than 200 is `ScraperError::HttpStatus`.
    /// `context` names the page kind for error messages.
    fn fetch_html(&mut self, url: &str, context: &str) -> Result<String, ScraperError>;
}

/// Progress hooks for a crawl.
#[derive(Default)]
pub struct CrawlOptions<'a> {
    /// Called as `(done, total)` while detail anchors of one results page are processed.
    pub progress: Option<&'a dyn Fn(u32, u32)>,
    /// Called once per results page as `(page_index, last_page_index)` before it is fetched.
    pub on_page: Option<&'a dyn Fn(u32, u32)>,
}

/// Parse a CSS selector or return an error (avoids panics from Selector::parse).
pub(crate) fn parse_selector(sel: &str) -> Result<Selector, ScraperError> {
    Selector::parse(sel).map_err(|e| {
        ScraperError::schema("selector", format!("invalid selector {:?}: {}", sel, e))
    })
}

/// Whitespace-trimmed text content of an element.
pub(crate) fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Only 200 counts as a fetched page; other 2xx codes are errors too.
pub(crate) fn check_status(
    status: StatusCode,
    url: &str,
    context: Option<&str>,
) -> Result<(), ScraperError> {
    if status != StatusCode::OK {
        return Err(ScraperError::HttpStatus {
            status: status.as_u16(),
            url: url.to_string(),
            context: context.map(String::from),
        });
    }
    Ok(())
}

/// Check response status and read body. Returns body or ScraperError.
pub(crate) fn check_response(
    response: reqwest::blocking::Response,
    url: &str,
    context: Option<&str>,
) -> Result<String, ScraperError> {
    check_status(response.status(), url, context)?;
    response
        .text()
        .map_err(|e| ScraperError::BodyRead { source: e })
}

fn parse_url(input: &str) -> Result<Url, ScraperError> {
    Url::parse(input).map_err(|e| ScraperError::InvalidUrl {
        input: input.to_string(),
        reason: e.to_string(),
    })
}

/// Resolve a (possibly relative) catalog href to an absolute URL.
pub fn resolve_href(href: &str) -> Result<String, ScraperError> {
    let base = parse_url(CATALOG_BASE)?;
    base.join(href.trim())
        .map(|u| u.to_string())
        .map_err(|e| ScraperError::InvalidUrl {
            input: href.to_string(),
            reason: e.to_string(),
        })
}

/// First value of query parameter `name` in `url` (absolute or catalog-relative).
pub fn query_param(url: &str, name: &str) -> Result<Option<String>, ScraperError> {
    let parsed = parse_url(&resolve_href(url)?)?;
    Ok(parsed
        .query_pairs()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned()))
}

/// Replace (or add) query parameter `name` in `url`, keeping the other pairs in order.
pub fn with_query_param(url: &str, name: &str, value: &str) -> Result<String, ScraperError> {
    let mut parsed = parse_url(&resolve_href(url)?)?;
    let pairs: Vec<(String, String)> = parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    let mut replaced = false;
    {
        let mut query = parsed.query_pairs_mut();
        query.clear();
        for (k, v) in &pairs {
            if k == name {
                if !replaced {
                    query.append_pair(k, value);
                    replaced = true;
                }
            } else {
                query.append_pair(k, v);
            }
        }
        if !replaced {
            query.append_pair(name, value);
        }
    }
    Ok(parsed.to_string())
}

/// Last path segment of a URL (the JSP page name), if any.
pub(crate) fn page_name(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|s| !s.is_empty())
        .map(String::from)
}

/// Filters for the edition search page. Unset fields are sent empty, as the search form does.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SearchQuery {
    pub ft_mode: Option<String>,
    pub ft_fields: Option<String>,
    pub free_text: Option<String>,
    pub year_from: Option<u32>,
    pub year_to: Option<u32>,
    pub places: Option<String>,
    pub languages: Option<String>,
    pub volumes: Option<String>,
    pub sizes: Option<String>,
    pub libraries: Option<String>,
    pub order_by: Option<u32>,
}

impl SearchQuery {
    /// Absolute edition-list URL for these filters.
    pub fn to_url(&self) -> Result<String, ScraperError> {
        let mut url = parse_url(&resolve_href(EDITION_SEARCH_PAGE)?)?;
        let year = |y: Option<u32>| y.map(|y| y.to_string()).unwrap_or_default();
        let text = |s: &Option<String>| s.clone().unwrap_or_default();
        url.query_pairs_mut()
            .append_pair("ftMode", &text(&self.ft_mode))
            .append_pair("ftFields", &text(&self.ft_fields))
            .append_pair("freeText", &text(&self.free_text))
            .append_pair("year1", &year(self.year_from))
            .append_pair("year2", &year(self.year_to))
            .append_pair("places", &text(&self.places))
            .append_pair("languages", &text(&self.languages))
            .append_pair("volumes", &text(&self.volumes))
            .append_pair("sizes", &text(&self.sizes))
            .append_pair("libraries", &text(&self.libraries))
            .append_pair("orderBy", &self.order_by.unwrap_or(1).to_string());
        Ok(url.to_string())
    }
}
