//! CLI parsing and orchestration. Parses args, runs the crawl -> manifest pipeline, maps
//! errors to exit codes.

use crate::config;
use crate::harvest::{harvest_editions, harvest_work, CanvasSizing, HarvestError, HarvestSettings};
use crate::manifest::{
    manifest_path, ImageSize, ManifestConfig, ManifestHeader, RangeMembers,
    DEFAULT_BLANK_CANVAS_SIZE, DEFAULT_IMAGE_SERVICE_BASE, DEFAULT_MANIFEST_BASE_URL,
    DEFAULT_OUTPUT_DIR,
};
use crate::model::Metadata;
use crate::scraper::editions::{edition_id_for, fetch_edition_list};
use crate::scraper::work::parse_page_nav;
use crate::scraper::{CatalogClient, CrawlOptions, Fetch, ScraperError, SearchQuery};
use clap::Parser;
use std::cell::{Cell, RefCell};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// CLI error carrying exit code and message.
#[derive(Debug, Error)]
pub enum CliRunError {
    #[error("{0}")]
    InvalidInput(String),

    #[error("{0}")]
    Scraper(#[from] ScraperError),

    #[error("{0}")]
    Harvest(#[from] HarvestError),

    #[error("{failed} of {total} editions failed: {ids}")]
    Editions {
        failed: usize,
        total: usize,
        ids: String,
    },
}

impl CliRunError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliRunError::InvalidInput(_) => 1,
            CliRunError::Scraper(_) | CliRunError::Harvest(HarvestError::Scraper(_)) => 2,
            CliRunError::Harvest(HarvestError::Manifest(_)) | CliRunError::Editions { .. } => 3,
        }
    }
}

#[derive(Parser, Debug)]
#[command(name = "cervantes-iiif")]
#[command(about = "Scrape Cervantes Project editions and write IIIF Presentation manifests")]
#[command(
    after_help = "Config file keys (output_dir, user_agent, timeout_secs, image_service_base, manifest_base_url, language, range_members, canvas_size) are read from ./cervantes-iiif.toml or ~/.config/cervantes-iiif/config.toml. CLI flags override config."
)]
pub struct Args {
    /// Edition search-results URL, or a work URL with --work. Default: a search built from the filter flags.
    pub url: Option<String>,

    /// Treat URL as a single work's results page and write one manifest for it.
    #[arg(long, requires = "url")]
    pub work: bool,

    /// Manifest label in --work mode. Default: the edition id.
    #[arg(long, requires = "work")]
    pub label: Option<String>,

    /// Directory for manifests (default: cervantes-manifests).
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Free-text search terms.
    #[arg(long)]
    pub free_text: Option<String>,

    /// Free-text matching mode, passed through as ftMode.
    #[arg(long)]
    pub ft_mode: Option<String>,

    /// Fields searched by the free text, passed through as ftFields.
    #[arg(long)]
    pub ft_fields: Option<String>,

    /// Earliest publication year.
    #[arg(long)]
    pub year_from: Option<u32>,

    /// Latest publication year.
    #[arg(long)]
    pub year_to: Option<u32>,

    #[arg(long)]
    pub places: Option<String>,

    #[arg(long)]
    pub languages: Option<String>,

    #[arg(long)]
    pub volumes: Option<String>,

    #[arg(long)]
    pub sizes: Option<String>,

    #[arg(long)]
    pub libraries: Option<String>,

    /// Result ordering, passed through as orderBy (default 1).
    #[arg(long)]
    pub order_by: Option<u32>,

    /// Range membership: first (only the first canvas of each range, default) or all.
    #[arg(long, value_parser = parse_range_members)]
    pub range_members: Option<RangeMembers>,

    /// Language tag for labels and metadata (e.g. en). Default: none.
    #[arg(long)]
    pub language: Option<String>,

    /// Image server base URL (overrides config).
    #[arg(long)]
    pub image_service_base: Option<String>,

    /// Prefix for manifest, canvas, and range ids (overrides config).
    #[arg(long)]
    pub manifest_base_url: Option<String>,

    /// Give every canvas this size (e.g. 1000x1500) instead of reading info.json from the image server.
    #[arg(long, value_parser = parse_canvas_size)]
    pub canvas_size: Option<ImageSize>,

    /// Stop at the first edition that fails instead of continuing with the next.
    #[arg(long)]
    pub fail_fast: bool,

    /// List editions (or the work's page count) and output paths without crawling or writing.
    #[arg(long)]
    pub dry_run: bool,

    /// HTTP User-Agent (overrides config).
    #[arg(long)]
    pub user_agent: Option<String>,

    /// Request timeout in seconds (overrides config; default 30).
    #[arg(long)]
    pub timeout: Option<u64>,

    /// Suppress progress output (errors only).
    #[arg(short, long)]
    pub quiet: bool,

    /// Debug logging and verbose error chain.
    #[arg(long)]
    pub verbose: bool,
}

fn parse_range_members(s: &str) -> Result<RangeMembers, String> {
    match s.to_lowercase().as_str() {
        "first" | "first-seen" => Ok(RangeMembers::FirstSeenOnly),
        "all" => Ok(RangeMembers::All),
        _ => Err(format!(
            "Invalid --range-members value: '{}'. Use first or all.",
            s
        )),
    }
}

fn parse_canvas_size(s: &str) -> Result<ImageSize, String> {
    let invalid = || {
        format!(
            "Invalid --canvas-size value: '{}'. Use WIDTHxHEIGHT, e.g. 1000x1500.",
            s
        )
    };
    let (w, h) = s.trim().split_once(['x', 'X']).ok_or_else(invalid)?;
    let width: u32 = w.trim().parse().map_err(|_| invalid())?;
    let height: u32 = h.trim().parse().map_err(|_| invalid())?;
    if width == 0 || height == 0 {
        return Err(invalid());
    }
    Ok(ImageSize { width, height })
}

impl Args {
    fn search_query(&self) -> SearchQuery {
        SearchQuery {
            ft_mode: self.ft_mode.clone(),
            ft_fields: self.ft_fields.clone(),
            free_text: self.free_text.clone(),
            year_from: self.year_from,
            year_to: self.year_to,
            places: self.places.clone(),
            languages: self.languages.clone(),
            volumes: self.volumes.clone(),
            sizes: self.sizes.clone(),
            libraries: self.libraries.clone(),
            order_by: self.order_by,
        }
    }

    /// Log filter implied by --quiet / --verbose, used when RUST_LOG is unset.
    pub fn default_log_filter(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }
}

/// Merge CLI flags over config over defaults.
fn resolve_settings(
    args: &Args,
    config: Option<&config::Config>,
) -> Result<HarvestSettings, CliRunError> {
    let range_members = match args.range_members {
        Some(r) => r,
        None => match config.and_then(|c| c.range_members.as_deref()) {
            Some(s) => parse_range_members(s)
                .map_err(|e| CliRunError::InvalidInput(format!("Config: {}", e)))?,
            None => RangeMembers::default(),
        },
    };
    let manifest = ManifestConfig {
        base_url: args
            .manifest_base_url
            .clone()
            .or_else(|| config.and_then(|c| c.manifest_base_url.clone()))
            .unwrap_or_else(|| DEFAULT_MANIFEST_BASE_URL.to_string()),
        image_service_base: args
            .image_service_base
            .clone()
            .or_else(|| config.and_then(|c| c.image_service_base.clone()))
            .unwrap_or_else(|| DEFAULT_IMAGE_SERVICE_BASE.to_string()),
        language: args
            .language
            .clone()
            .or_else(|| config.and_then(|c| c.language.clone())),
        range_members,
        blank_canvas_size: DEFAULT_BLANK_CANVAS_SIZE,
    };
    let canvas_size = match args.canvas_size {
        Some(size) => Some(size),
        None => match config.and_then(|c| c.canvas_size.as_deref()) {
            Some(s) => Some(
                parse_canvas_size(s)
                    .map_err(|e| CliRunError::InvalidInput(format!("Config: {}", e)))?,
            ),
            None => None,
        },
    };
    let canvas_sizing = canvas_size.map_or(CanvasSizing::Probe, CanvasSizing::Fixed);
    Ok(HarvestSettings {
        manifest,
        output_dir: args
            .output_dir
            .clone()
            .or_else(|| config.and_then(|c| c.output_dir.clone()))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
        canvas_sizing,
        fail_fast: args.fail_fast,
    })
}

/// Progress bar for the detail anchors of one results page. The bar is cleared once the
/// page's last anchor is done, before any logging that follows the page.
struct PageProgress {
    bar: RefCell<Option<indicatif::ProgressBar>>,
    page: Cell<(u32, u32)>,
    draw: bool,
}

impl PageProgress {
    fn new(draw: bool) -> Self {
        Self {
            bar: RefCell::new(None),
            page: Cell::new((0, 0)),
            draw,
        }
    }

    fn new_bar(&self, total: u32) -> indicatif::ProgressBar {
        if !self.draw {
            let bar = indicatif::ProgressBar::hidden();
            bar.set_length(total as u64);
            return bar;
        }
        let bar = indicatif::ProgressBar::new(total as u64);
        if let Ok(style) = indicatif::ProgressStyle::default_bar()
            .template("{spinner} {msg} [{bar:40}] {pos}/{len} ({elapsed})")
        {
            bar.set_style(
                style
                    .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
                    .progress_chars("█▉▊▋▌▍▎▏ "),
            );
        }
        bar.enable_steady_tick(Duration::from_millis(80));
        bar
    }

    fn start_page(&self, page: u32, last: u32) {
        self.finish();
        self.page.set((page, last));
    }

    fn advance(&self, done: u32, total: u32) {
        if total == 0 {
            return;
        }
        {
            let mut state = self.bar.borrow_mut();
            let bar = state.get_or_insert_with(|| self.new_bar(total));
            let (page, last) = self.page.get();
            bar.set_position(done as u64);
            bar.set_message(format!("Getting items from page {}/{}", page, last));
        }
        if done >= total {
            self.finish();
        }
    }

    fn finish(&self) {
        if let Some(bar) = self.bar.borrow_mut().take() {
            bar.disable_steady_tick();
            bar.finish_and_clear();
        }
    }
}

/// Print what a run would do without crawling works.
fn dry_run<F: Fetch>(
    fetcher: &mut F,
    args: &Args,
    url: &str,
    settings: &HarvestSettings,
) -> Result<(), CliRunError> {
    if args.work {
        let id = edition_id_for(url)?;
        let html = fetcher.fetch_html(url, "work page")?;
        let nav = parse_page_nav(&html)?;
        eprintln!("Edition: {}", id);
        eprintln!("Result pages: {}", nav.total_pages.saturating_sub(1));
        eprintln!("Output: {}", manifest_path(&settings.output_dir, &id).display());
        return Ok(());
    }
    let editions = fetch_edition_list(fetcher, url)?;
    eprintln!("Editions: {}", editions.len());
    for edition in &editions {
        eprintln!(
            "{}\t{}\t{}\t{}",
            edition.id,
            edition.title,
            edition.page_url,
            manifest_path(&settings.output_dir, &edition.id).display()
        );
    }
    Ok(())
}

/// Entry point for the CLI. Returns Ok(()) on success; Err with exit code and message on failure.
pub fn run(args: &Args) -> Result<(), CliRunError> {
    let url = match &args.url {
        Some(u) => u.clone(),
        None => args.search_query().to_url()?,
    };

    let config = config::load_config().map_err(CliRunError::InvalidInput)?;
    let settings = resolve_settings(args, config.as_ref())?;

    let timeout_secs = args
        .timeout
        .or_else(|| config.as_ref().and_then(|c| c.timeout_secs));
    let user_agent = args
        .user_agent
        .clone()
        .or_else(|| config.as_ref().and_then(|c| c.user_agent.clone()));
    let mut builder = CatalogClient::builder();
    if let Some(secs) = timeout_secs {
        builder = builder.timeout_secs(secs);
    }
    if let Some(ua) = user_agent {
        builder = builder.user_agent(ua);
    }
    let mut client = builder
        .build()
        .map_err(|e| CliRunError::InvalidInput(format!("Failed to create HTTP client: {}", e)))?;

    if args.dry_run {
        return dry_run(&mut client, args, &url, &settings);
    }

    let progress = PageProgress::new(true);
    let page_cb = |page: u32, last: u32| progress.start_page(page, last);
    let progress_cb = |n: u32, total: u32| progress.advance(n, total);
    let options = if args.quiet {
        CrawlOptions::default()
    } else {
        CrawlOptions {
            progress: Some(&progress_cb),
            on_page: Some(&page_cb),
        }
    };

    if args.work {
        let id = edition_id_for(&url)?;
        let header = ManifestHeader {
            label: args.label.clone().unwrap_or_else(|| id.clone()),
            id,
            metadata: Metadata::new(),
            thumbnail_encoded: None,
        };
        let result = harvest_work(&mut client, &url, &header, &settings, &options);
        progress.finish();
        let path = result?;
        if !args.quiet {
            eprintln!("Wrote {}", path.display());
        }
        return Ok(());
    }

    let report = harvest_editions(&mut client, &url, &settings, &options);
    progress.finish();
    let report = report?;
    if !args.quiet {
        for path in &report.written {
            eprintln!("Wrote {}", path.display());
        }
    }
    if !report.failures.is_empty() {
        let total = report.written.len() + report.failures.len();
        return Err(CliRunError::Editions {
            failed: report.failures.len(),
            total,
            ids: report
                .failures
                .iter()
                .map(|f| f.id.as_str())
                .collect::<Vec<_>>()
                .join(", "),
        });
    }
    Ok(())
}
