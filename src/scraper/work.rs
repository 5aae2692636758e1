//! Work crawler. Reads the page count from a work's result navigation, walks the result
//! pages in order, and fetches every detail page they link to.

use scraper::Html;

use crate::identifier::find_range;
use crate::model::WorkItem;
use crate::scraper::page::fetch_package;
use crate::scraper::{
    parse_selector, query_param, resolve_href, with_query_param, CrawlOptions, Fetch,
    ScraperError, DETAIL_PAGE_MARKER,
};

const PAGE_PARAM: &str = "page";

/// Result navigation of a work: the last nav link and the page count it carries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageNav {
    /// Href of the last anchor in `div#pgNav`; later pages are this href with `page` swapped.
    pub last_href: String,
    pub total_pages: u32,
}

/// Read `div#pgNav` and take the `page` parameter of its last anchor.
pub fn parse_page_nav(html: &str) -> Result<PageNav, ScraperError> {
    let doc = Html::parse_document(html);
    let nav_sel = parse_selector("div#pgNav")?;
    let anchor_sel = parse_selector("a")?;
    let nav = doc.select(&nav_sel).next().ok_or_else(|| {
        ScraperError::schema("work page", "navigation element div#pgNav not found")
    })?;
    let last_href = nav
        .select(&anchor_sel)
        .last()
        .and_then(|a| a.value().attr("href"))
        .map(|h| h.trim().to_string())
        .ok_or_else(|| ScraperError::schema("work page", "page navigation has no links"))?;
    let page = query_param(&last_href, PAGE_PARAM)?.ok_or_else(|| {
        ScraperError::schema(
            "work page",
            format!("last navigation link has no page parameter: {}", last_href),
        )
    })?;
    let total_pages = page.trim().parse::<u32>().map_err(|_| {
        ScraperError::schema(
            "work page",
            format!("page parameter is not a number: {:?}", page),
        )
    })?;
    Ok(PageNav {
        last_href,
        total_pages,
    })
}

/// Hrefs of every anchor pointing at a detail page, in document order.
pub fn detail_hrefs(html: &str) -> Result<Vec<String>, ScraperError> {
    let doc = Html::parse_document(html);
    let anchor_sel = parse_selector("a[href]")?;
    Ok(doc
        .select(&anchor_sel)
        .filter_map(|a| a.value().attr("href"))
        .filter(|href| href.contains(DETAIL_PAGE_MARKER))
        .map(|href| href.trim().to_string())
        .collect())
}

/// Crawler for one work. Holds a reference to the shared fetcher.
pub struct WorkCrawler<'a, F: Fetch + ?Sized> {
    fetcher: &'a mut F,
}

impl<'a, F: Fetch + ?Sized> WorkCrawler<'a, F> {
    pub fn new(fetcher: &'a mut F) -> Self {
        Self { fetcher }
    }

    /// Crawl the work whose first results page is `url`.
    ///
    /// Pages 1 through `total_pages - 1` are visited, where `total_pages` is the `page`
    /// parameter of the last navigation link. Items come back in anchor order within
    /// increasing page index. Any failed fetch aborts the crawl.
    pub fn crawl(
        &mut self,
        url: &str,
        options: &CrawlOptions<'_>,
    ) -> Result<Vec<WorkItem>, ScraperError> {
        let first = self.fetcher.fetch_html(url, "work page")?;
        let nav = parse_page_nav(&first)?;
        let last_index = nav.total_pages.saturating_sub(1);
        tracing::info!(url, pages = last_index, "crawling work");

        let mut items = Vec::new();
        for index in 1..nav.total_pages {
            if let Some(cb) = options.on_page {
                cb(index, last_index);
            }
            let page_url = with_query_param(&nav.last_href, PAGE_PARAM, &index.to_string())?;
            let context = format!("results page {}", index);
            let html = self.fetcher.fetch_html(&page_url, &context)?;
            let hrefs = detail_hrefs(&html)?;
            tracing::debug!(page = index, anchors = hrefs.len(), "results page parsed");

            let total = hrefs.len() as u32;
            for (done, href) in hrefs.into_iter().enumerate() {
                let detail_url = resolve_href(&href)?;
                let package = fetch_package(&mut *self.fetcher, &href)?;
                items.push(WorkItem {
                    range: find_range(&href),
                    source_href: detail_url,
                    package,
                });
                if let Some(cb) = options.progress {
                    cb(done as u32 + 1, total);
                }
            }
        }
        Ok(items)
    }
}
