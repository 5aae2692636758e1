//! Image-service info documents (`<service>/info.json`), read for canvas dimensions.

use crate::manifest::ImageSize;
use crate::scraper::{Fetch, ScraperError};

pub fn info_url(service_id: &str) -> String {
    format!("{}/info.json", service_id.trim_end_matches('/'))
}

/// Width and height from an info document body.
pub fn parse_image_info(body: &str, url: &str) -> Result<ImageSize, ScraperError> {
    serde_json::from_str(body).map_err(|e| ScraperError::ImageInfo {
        url: url.to_string(),
        reason: e.to_string(),
    })
}

pub fn fetch_image_size<F: Fetch + ?Sized>(
    fetcher: &mut F,
    service_id: &str,
) -> Result<ImageSize, ScraperError> {
    let url = info_url(service_id);
    let body = fetcher.fetch_html(&url, "image info")?;
    parse_image_info(&body, &url)
}
