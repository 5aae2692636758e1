//! Edition-list crawler. Reads one row per edition from the search-results table.
//!
//! The results table is the third `<table>` on the page. Columns are located by header
//! label when the table has a header row, otherwise by the default positional layout.
//! Every data row is checked against the layout before any cell is read.

use scraper::{ElementRef, Html};

use crate::encoding::encode_url;
use crate::model::{EditionRow, Metadata};
use crate::scraper::{
    element_text, page_name, parse_selector, query_param, resolve_href, Fetch, ScraperError,
};

/// Zero-based position of the results table among the page's tables.
const RESULTS_TABLE_INDEX: usize = 2;
const EDITION_ID_PREFIX: &str = "cervantes-";

/// Bibliographic columns copied into manifest metadata, in output order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditionField {
    Year,
    Place,
    Publisher,
    Author,
    Translator,
    Editor,
    Language,
    Volumes,
    Size,
    Index,
    References,
    Library,
}

impl EditionField {
    pub const ALL: [EditionField; 12] = [
        EditionField::Year,
        EditionField::Place,
        EditionField::Publisher,
        EditionField::Author,
        EditionField::Translator,
        EditionField::Editor,
        EditionField::Language,
        EditionField::Volumes,
        EditionField::Size,
        EditionField::Index,
        EditionField::References,
        EditionField::Library,
    ];

    /// Metadata label written to the manifest.
    pub fn label(self) -> &'static str {
        match self {
            EditionField::Year => "Year",
            EditionField::Place => "Place",
            EditionField::Publisher => "Publisher",
            EditionField::Author => "Author",
            EditionField::Translator => "Translator",
            EditionField::Editor => "Editor",
            EditionField::Language => "Language",
            EditionField::Volumes => "Volumes",
            EditionField::Size => "Size",
            EditionField::Index => "Index",
            EditionField::References => "References",
            EditionField::Library => "Library",
        }
    }

    fn matches_header(self, header: &str) -> bool {
        let header = header.trim().to_lowercase();
        let aliases: &[&str] = match self {
            EditionField::Year => &["year", "date"],
            EditionField::Place => &["place", "city"],
            EditionField::Publisher => &["publisher", "printer"],
            EditionField::Author => &["author"],
            EditionField::Translator => &["translator"],
            EditionField::Editor => &["editor"],
            EditionField::Language => &["language"],
            EditionField::Volumes => &["volumes", "vols", "vols.", "volume"],
            EditionField::Size => &["size", "format"],
            EditionField::Index => &["index"],
            EditionField::References => &["references", "refs"],
            EditionField::Library => &["library", "holding library"],
        };
        aliases.contains(&header.as_str())
    }
}

/// Where each value lives in a data row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnLayout {
    pub title: usize,
    pub fields: Vec<(EditionField, usize)>,
}

impl Default for ColumnLayout {
    /// Thumbnail in column 0, title in 1, then the twelve fields in `EditionField::ALL` order.
    fn default() -> Self {
        Self {
            title: 1,
            fields: EditionField::ALL
                .iter()
                .enumerate()
                .map(|(i, f)| (*f, i + 2))
                .collect(),
        }
    }
}

impl ColumnLayout {
    /// Resolve every column from header labels. Fails naming the first label not found.
    pub fn from_headers(headers: &[String]) -> Result<Self, ScraperError> {
        let title = header_position(headers, |h| h.eq_ignore_ascii_case("title")).ok_or_else(
            || ScraperError::schema("edition table header", "no \"Title\" column"),
        )?;
        let mut fields = Vec::with_capacity(EditionField::ALL.len());
        for field in EditionField::ALL {
            let index = header_position(headers, |h| field.matches_header(h)).ok_or_else(|| {
                ScraperError::schema(
                    "edition table header",
                    format!("no {:?} column", field.label()),
                )
            })?;
            fields.push((field, index));
        }
        Ok(Self { title, fields })
    }

    /// Smallest cell count a row needs for this layout.
    pub fn width(&self) -> usize {
        self.fields
            .iter()
            .map(|(_, i)| *i)
            .chain(std::iter::once(self.title))
            .max()
            .map_or(0, |m| m + 1)
    }
}

fn header_position(headers: &[String], pred: impl Fn(&str) -> bool) -> Option<usize> {
    headers.iter().position(|h| pred(h.trim()))
}

/// Parse the search-results page at `list_url` into edition rows.
///
/// Rows without an anchor are ignored. Rows whose link points back at the same
/// search page (sorting and paging links) are skipped.
pub fn parse_edition_list(html: &str, list_url: &str) -> Result<Vec<EditionRow>, ScraperError> {
    let doc = Html::parse_document(html);
    let table_sel = parse_selector("table")?;
    let row_sel = parse_selector("tr")?;
    let th_sel = parse_selector("th")?;

    let table = doc
        .select(&table_sel)
        .nth(RESULTS_TABLE_INDEX)
        .ok_or_else(|| {
            ScraperError::schema(
                "edition list",
                format!("expected at least {} tables", RESULTS_TABLE_INDEX + 1),
            )
        })?;

    let header_row = table
        .select(&row_sel)
        .find(|row| row.select(&th_sel).next().is_some());
    let layout = match header_row {
        Some(row) => {
            let headers: Vec<String> = row.select(&th_sel).map(element_text).collect();
            ColumnLayout::from_headers(&headers)?
        }
        None => ColumnLayout::default(),
    };

    let list_page = page_name(list_url);
    let mut editions = Vec::new();
    for (row_number, row) in table.select(&row_sel).enumerate() {
        if header_row.map(|h| h.id()) == Some(row.id()) {
            continue;
        }
        if let Some(edition) = parse_row(row, row_number, &layout, list_page.as_deref())? {
            editions.push(edition);
        }
    }
    Ok(editions)
}

fn parse_row(
    row: ElementRef<'_>,
    row_number: usize,
    layout: &ColumnLayout,
    list_page: Option<&str>,
) -> Result<Option<EditionRow>, ScraperError> {
    let anchor_sel = parse_selector("a[href]")?;
    let img_sel = parse_selector("img")?;
    let cell_sel = parse_selector("td")?;

    let Some(href) = row
        .select(&anchor_sel)
        .next()
        .and_then(|a| a.value().attr("href"))
    else {
        return Ok(None);
    };
    let page_url = resolve_href(href)?;
    if page_name(&page_url).as_deref() == list_page && list_page.is_some() {
        tracing::debug!(href, "skipping self-referential edition row");
        return Ok(None);
    }

    let cells: Vec<String> = row.select(&cell_sel).map(element_text).collect();
    if cells.len() < layout.width() {
        return Err(ScraperError::schema(
            "edition list",
            format!(
                "row {} has {} cells, expected at least {}",
                row_number,
                cells.len(),
                layout.width()
            ),
        ));
    }

    let edition_number = query_param(&page_url, "id")?.ok_or_else(|| {
        ScraperError::schema(
            "edition list",
            format!("row {} link has no id parameter: {}", row_number, href),
        )
    })?;

    let thumbnail_url = row
        .select(&img_sel)
        .next()
        .and_then(|img| img.value().attr("src"))
        .map(|src| src.trim().to_string());
    let thumbnail_encoded = thumbnail_url.as_deref().map(encode_url);

    let metadata: Metadata = layout
        .fields
        .iter()
        .map(|(field, index)| (field.label(), cells[*index].clone()))
        .collect();

    Ok(Some(EditionRow {
        page_url,
        thumbnail_url,
        thumbnail_encoded,
        title: cells[layout.title].clone(),
        metadata,
        id: format!("{}{}", EDITION_ID_PREFIX, edition_number),
    }))
}

/// Fetch and parse the edition list.
pub fn fetch_edition_list<F: Fetch + ?Sized>(
    fetcher: &mut F,
    list_url: &str,
) -> Result<Vec<EditionRow>, ScraperError> {
    let html = fetcher.fetch_html(list_url, "edition list")?;
    let editions = parse_edition_list(&html, list_url)?;
    tracing::info!(url = list_url, editions = editions.len(), "edition list parsed");
    Ok(editions)
}

/// Edition id for a work URL: `cervantes-<id query parameter>`.
pub fn edition_id_for(url: &str) -> Result<String, ScraperError> {
    let id = query_param(url, "id")?.ok_or_else(|| ScraperError::InvalidUrl {
        input: url.to_string(),
        reason: "URL has no id parameter".to_string(),
    })?;
    Ok(format!("{}{}", EDITION_ID_PREFIX, id))
}
