//! Detail-page extraction: one image plus its header/data metadata table.

use scraper::Html;

use crate::encoding::encode_url;
use crate::identifier::parse_identifier;
use crate::model::{ImagePackage, Metadata};
use crate::scraper::{element_text, parse_selector, resolve_href, Fetch, ScraperError};

/// `src` of the first `<img>` on the page.
fn first_image(doc: &Html) -> Result<Option<String>, ScraperError> {
    let img_sel = parse_selector("img")?;
    Ok(doc
        .select(&img_sel)
        .next()
        .and_then(|e| e.value().attr("src"))
        .map(String::from))
}

/// Rows holding both a `td.header` and a `td.data` cell, as trimmed text pairs.
/// A repeated header replaces the earlier value.
fn table_metadata(doc: &Html) -> Result<Metadata, ScraperError> {
    let row_sel = parse_selector("tr")?;
    let header_sel = parse_selector("td.header")?;
    let data_sel = parse_selector("td.data")?;
    let mut metadata = Metadata::new();
    for row in doc.select(&row_sel) {
        let header = row.select(&header_sel).next();
        let data = row.select(&data_sel).next();
        if let (Some(header), Some(data)) = (header, data) {
            metadata.insert(element_text(header), element_text(data));
        }
    }
    Ok(metadata)
}

/// Build the package for a detail page. `href` is the anchor target as written on the
/// results page; its `&image=` parameter supplies range and part. Resolving it first
/// would percent-encode non-ASCII identifiers.
pub fn parse_detail_page(html: &str, href: &str) -> Result<ImagePackage, ScraperError> {
    let identifier = parse_identifier(href)?;
    let doc = Html::parse_document(html);
    let metadata = table_metadata(&doc)?;
    let image_url = first_image(&doc)?;
    if image_url.is_none() {
        tracing::warn!(href, "no image found on detail page");
    }
    let image_url_encoded = image_url.as_deref().map(encode_url);
    Ok(ImagePackage {
        image_url,
        image_url_encoded,
        part: identifier.part,
        range: identifier.range,
        metadata,
    })
}

/// Fetch the detail page an anchor points at and build its package.
pub fn fetch_package<F: Fetch + ?Sized>(
    fetcher: &mut F,
    href: &str,
) -> Result<ImagePackage, ScraperError> {
    let url = resolve_href(href)?;
    let html = fetcher.fetch_html(&url, "detail page")?;
    parse_detail_page(&html, href)
}
