//! End-to-end runs: crawl a work (or every edition in a list), assemble its manifest,
//! and write it to the output directory.

use std::path::PathBuf;

use thiserror::Error;

use crate::manifest::{
    assemble, write_manifest, ImageSize, Manifest, ManifestConfig, ManifestError, ManifestHeader,
    DEFAULT_OUTPUT_DIR,
};
use crate::model::WorkItem;
use crate::scraper::editions::fetch_edition_list;
use crate::scraper::image_info::fetch_image_size;
use crate::scraper::work::WorkCrawler;
use crate::scraper::{CrawlOptions, Fetch, ScraperError};

#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Manifest(#[from] ManifestError),
}

/// Where canvas dimensions come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CanvasSizing {
    /// Read each image's `info.json`; a failed read fails the edition.
    #[default]
    Probe,
    /// Give every canvas this size without contacting the image service.
    Fixed(ImageSize),
}

/// Settings shared by every edition of a run.
#[derive(Debug, Clone)]
pub struct HarvestSettings {
    pub manifest: ManifestConfig,
    pub output_dir: PathBuf,
    pub canvas_sizing: CanvasSizing,
    /// Stop at the first failed edition instead of moving on to the next.
    pub fail_fast: bool,
}

impl Default for HarvestSettings {
    fn default() -> Self {
        Self {
            manifest: ManifestConfig::default(),
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            canvas_sizing: CanvasSizing::default(),
            fail_fast: false,
        }
    }
}

/// One edition that could not be written.
#[derive(Debug)]
pub struct EditionFailure {
    pub id: String,
    pub error: HarvestError,
}

/// Outcome of an edition-list run.
#[derive(Debug, Default)]
pub struct HarvestReport {
    pub written: Vec<PathBuf>,
    pub failures: Vec<EditionFailure>,
}

/// Assemble a manifest, sizing canvases per `settings.canvas_sizing`.
/// With probing, the first image whose info document cannot be read fails the build.
pub fn build_manifest<F: Fetch + ?Sized>(
    fetcher: &mut F,
    header: &ManifestHeader,
    items: &[WorkItem],
    settings: &HarvestSettings,
) -> Result<Manifest, ScraperError> {
    match settings.canvas_sizing {
        CanvasSizing::Probe => {
            let mut size_of = |service: &str| -> Result<ImageSize, ScraperError> {
                fetch_image_size(&mut *fetcher, service)
            };
            assemble(header, items, &settings.manifest, &mut size_of)
        }
        CanvasSizing::Fixed(size) => {
            let config = ManifestConfig {
                blank_canvas_size: size,
                ..settings.manifest.clone()
            };
            let mut size_of = |_: &str| -> Result<ImageSize, ScraperError> { Ok(size) };
            assemble(header, items, &config, &mut size_of)
        }
    }
}

/// Crawl one work and write its manifest. Returns the path written.
pub fn harvest_work<F: Fetch + ?Sized>(
    fetcher: &mut F,
    work_url: &str,
    header: &ManifestHeader,
    settings: &HarvestSettings,
    options: &CrawlOptions<'_>,
) -> Result<PathBuf, HarvestError> {
    let items = WorkCrawler::new(&mut *fetcher).crawl(work_url, options)?;
    let manifest = build_manifest(&mut *fetcher, header, &items, settings)?;
    let path = write_manifest(&manifest, &settings.output_dir, &header.id)?;
    Ok(path)
}

/// Crawl every edition listed at `list_url`, writing one manifest per edition.
///
/// A failure to read the list itself is returned as an error. A failed edition is logged
/// and recorded in the report, and the run moves on unless `fail_fast` is set.
pub fn harvest_editions<F: Fetch + ?Sized>(
    fetcher: &mut F,
    list_url: &str,
    settings: &HarvestSettings,
    options: &CrawlOptions<'_>,
) -> Result<HarvestReport, HarvestError> {
    let editions = fetch_edition_list(&mut *fetcher, list_url)?;
    let total = editions.len();
    let mut report = HarvestReport::default();
    for (n, edition) in editions.iter().enumerate() {
        tracing::info!(
            edition = %edition.id,
            title = %edition.title,
            "edition {}/{}",
            n + 1,
            total
        );
        let header = ManifestHeader::from(edition);
        match harvest_work(&mut *fetcher, &edition.page_url, &header, settings, options) {
            Ok(path) => report.written.push(path),
            Err(error) => {
                tracing::error!(edition = %edition.id, error = %error, "edition failed");
                if settings.fail_fast {
                    return Err(error);
                }
                report.failures.push(EditionFailure {
                    id: edition.id.clone(),
                    error,
                });
            }
        }
    }
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scraper::testing::StaticFetcher;
    use crate::encoding::{encode_url, service_id};
    use crate::manifest::DEFAULT_IMAGE_SERVICE_BASE;
    use crate::scraper::image_info::info_url;
    use crate::scraper::CATALOG_BASE;

    const LIST_URL: &str =
        "https://cervantes.library.tamu.edu/dqiDisplayInterface/doSearchEditions.jsp?orderBy=1";

    fn edition_row(id: u32, title: &str) -> String {
        let mut cells = String::new();
        for value in [
            "1780", "Madrid", "Ibarra", "Cervantes", "", "RAE", "Spanish", "4", "4o", "Yes",
            "Rius 23", "Cushing",
        ] {
            cells.push_str(&format!("<td>{}</td>", value));
        }
        format!(
            r#"<tr><td><a href="doSearchImages.jsp?id={id}&amp;page=1&amp;orderBy=1"><img src="https://cervantes.library.tamu.edu/t/{id}.jpg"></a></td><td>{title}</td>{cells}</tr>"#
        )
    }

    fn list_page() -> String {
        format!(
            "<table></table><table></table><table>{}{}</table>",
            edition_row(374, "Don Quixote"),
            edition_row(99, "Broken edition")
        )
    }

    fn results_page(id: u32, hrefs: &[String]) -> String {
        let anchors: String = hrefs
            .iter()
            .map(|h| format!(r#"<a href="{}">view</a>"#, h))
            .collect();
        format!(
            r#"<div id="pgNav"><a href="doSearchImages.jsp?id={id}&amp;page=3&amp;orderBy=1">last</a></div>{anchors}"#
        )
    }

    fn detail_page(label: &str) -> String {
        format!(
            r#"<img src="https://cervantes.library.tamu.edu/img/{0}.jpg"><table><tr><td class="header">Image</td><td class="data">{0}</td></tr></table>"#,
            label
        )
    }

    /// Edition 374 has three images over two result pages and two range tokens.
    fn fixture() -> StaticFetcher {
        let ids = ["1780-0001-qui-t01-001", "1780-0001-qui-t01-002", "1780-0001-qui-t02-001"];
        let hrefs: Vec<String> = ids
            .iter()
            .map(|id| format!("displayMidImage.jsp?edition=374&image={}.jpg", id))
            .collect();
        let page =
            |n: u32| format!("{}doSearchImages.jsp?id=374&page={}&orderBy=1", CATALOG_BASE, n);
        let mut fetcher = StaticFetcher::new()
            .page(LIST_URL, &list_page())
            .page(&page(1), &results_page(374, &hrefs[..2]))
            .page(&page(2), &results_page(374, &hrefs[2..]));
        for (id, href) in ids.iter().zip(&hrefs) {
            fetcher = fetcher.page(&format!("{}{}", CATALOG_BASE, href), &detail_page(id));
        }
        fetcher
    }

    fn settings(dir: &std::path::Path) -> HarvestSettings {
        HarvestSettings {
            output_dir: dir.join("cervantes-manifests"),
            canvas_sizing: CanvasSizing::Fixed(ImageSize {
                width: 800,
                height: 1200,
            }),
            ..HarvestSettings::default()
        }
    }

    #[test]
    fn edition_run_writes_manifest_and_records_failures() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let settings = settings(dir.path());
        let mut fetcher = fixture();
        let report = harvest_editions(&mut fetcher, LIST_URL, &settings, &CrawlOptions::default())?;

        assert_eq!(report.written.len(), 1);
        assert_eq!(
            report.written[0],
            settings.output_dir.join("cervantes-374.json")
        );
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].id, "cervantes-99");
        assert!(matches!(
            report.failures[0].error,
            HarvestError::Scraper(ScraperError::HttpStatus { status: 404, .. })
        ));

        let text = std::fs::read_to_string(&report.written[0])?;
        let manifest: Manifest = serde_json::from_str(&text)?;
        assert_eq!(manifest.items.len(), 3);
        assert_eq!(manifest.structures.len(), 2);
        assert_eq!(manifest.label["none"], vec!["Don Quixote"]);
        assert_eq!(manifest.metadata.len(), 12);
        assert_eq!(manifest.thumbnail.len(), 1);
        assert!(manifest
            .items
            .iter()
            .all(|c| c.width == 800 && c.height == 1200));
        let labels: Vec<&str> = manifest
            .items
            .iter()
            .map(|c| c.label["none"][0].as_str())
            .collect();
        assert_eq!(
            labels,
            vec!["1780-0001-qui-t01-001", "1780-0001-qui-t01-002", "1780-0001-qui-t02-001"]
        );
        Ok(())
    }

    #[test]
    fn fail_fast_stops_at_first_failure() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let settings = HarvestSettings {
            fail_fast: true,
            ..settings(dir.path())
        };
        let mut fetcher = fixture();
        let result = harvest_editions(&mut fetcher, LIST_URL, &settings, &CrawlOptions::default());
        assert!(matches!(result, Err(HarvestError::Scraper(_))));
        // The edition before the failure was still written.
        assert!(settings.output_dir.join("cervantes-374.json").exists());
        Ok(())
    }

    fn work_header() -> ManifestHeader {
        ManifestHeader {
            id: "cervantes-374".to_string(),
            label: "Don Quixote".to_string(),
            metadata: Default::default(),
            thumbnail_encoded: None,
        }
    }

    fn work_url() -> String {
        format!("{}doSearchImages.jsp?id=374&page=1&orderBy=1", CATALOG_BASE)
    }

    fn info_page(label: &str) -> (String, String) {
        let image = format!("https://cervantes.library.tamu.edu/img/{}.jpg", label);
        let service = service_id(DEFAULT_IMAGE_SERVICE_BASE, &encode_url(&image));
        (
            info_url(&service),
            r#"{"@id":"x","width":2000,"height":3000}"#.to_string(),
        )
    }

    #[test]
    fn probed_sizes_reach_every_canvas() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let settings = HarvestSettings {
            canvas_sizing: CanvasSizing::Probe,
            ..settings(dir.path())
        };
        let mut fetcher = fixture();
        for label in ["1780-0001-qui-t01-001", "1780-0001-qui-t01-002", "1780-0001-qui-t02-001"] {
            let (url, body) = info_page(label);
            fetcher = fetcher.page(&url, &body);
        }
        let path = harvest_work(
            &mut fetcher,
            &work_url(),
            &work_header(),
            &settings,
            &CrawlOptions::default(),
        )?;
        let json: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(path)?)?;
        let canvases = json["items"].as_array().ok_or("no items")?;
        assert_eq!(canvases.len(), 3);
        for canvas in canvases {
            assert_eq!(canvas["width"], 2000);
            assert_eq!(canvas["height"], 3000);
        }
        Ok(())
    }

    #[test]
    fn unreadable_image_info_fails_the_edition() -> Result<(), Box<dyn std::error::Error>> {
        let dir = tempfile::tempdir()?;
        let settings = HarvestSettings {
            canvas_sizing: CanvasSizing::Probe,
            ..settings(dir.path())
        };
        // Only the first image has an info document.
        let (url, body) = info_page("1780-0001-qui-t01-001");
        let mut fetcher = fixture().page(&url, &body);
        let result = harvest_work(
            &mut fetcher,
            &work_url(),
            &work_header(),
            &settings,
            &CrawlOptions::default(),
        );
        match result {
            Err(HarvestError::Scraper(ScraperError::HttpStatus {
                status: 404,
                context,
                ..
            })) => assert_eq!(context.as_deref(), Some("image info")),
            other => panic!("expected image info failure, got {:?}", other),
        }
        assert!(!settings.output_dir.join("cervantes-374.json").exists());
        Ok(())
    }

    #[test]
    fn missing_list_is_an_error() {
        let mut fetcher = StaticFetcher::new();
        let settings = HarvestSettings::default();
        let result = harvest_editions(&mut fetcher, LIST_URL, &settings, &CrawlOptions::default());
        assert!(matches!(result, Err(HarvestError::Scraper(_))));
    }
}
