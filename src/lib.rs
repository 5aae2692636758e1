//! cervantes-iiif: CLI scraper for the Cervantes Project image catalog, outputting IIIF
//! Presentation 3 manifests.

pub mod cli;
pub mod config;
pub mod encoding;
pub mod harvest;
pub mod identifier;
pub mod manifest;
pub mod model;
pub mod scraper;

// Re-exports for CLI and consumers.
pub use harvest::{harvest_editions, harvest_work, HarvestError, HarvestReport, HarvestSettings};
pub use identifier::{find_range, parse_identifier, Identifier};
pub use manifest::{assemble, write_manifest, Manifest, ManifestConfig, ManifestError, RangeMembers};
pub use model::{EditionRow, ImagePackage, Metadata, WorkItem};
pub use scraper::{
    CatalogClient, CatalogClientBuilder, CrawlOptions, Fetch, ScraperError, SearchQuery,
};
