//! Data model for scraped catalog records.
//!
//! The crawlers produce these shapes; the manifest assembler consumes them.

use serde::{Deserialize, Serialize};

/// Ordered label -> value mapping. Insertion order is kept; inserting an existing
/// label replaces its value in place (last write wins).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata(Vec<(String, String)>);

impl Metadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, label: impl Into<String>, value: impl Into<String>) {
        let label = label.into();
        let value = value.into();
        match self.0.iter_mut().find(|(l, _)| *l == label) {
            Some(entry) => entry.1 = value,
            None => self.0.push((label, value)),
        }
    }

    pub fn get(&self, label: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(l, _)| l == label)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(l, v)| (l.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Metadata {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut metadata = Metadata::new();
        for (k, v) in iter {
            metadata.insert(k, v);
        }
        metadata
    }
}

/// One edition row from a search-results table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditionRow {
    /// Absolute URL of the edition's work page (first results page).
    pub page_url: String,
    pub thumbnail_url: Option<String>,
    /// URL-safe base64 of `thumbnail_url`, for the image service.
    pub thumbnail_encoded: Option<String>,
    pub title: String,
    pub metadata: Metadata,
    /// `cervantes-<id>`; also the output file stem.
    pub id: String,
}

/// Everything scraped from one detail page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagePackage {
    /// `None` when the detail page has no image element.
    pub image_url: Option<String>,
    pub image_url_encoded: Option<String>,
    pub part: String,
    /// Four-token gathering/signature prefix shared by sibling images.
    pub range: String,
    pub metadata: Metadata,
}

/// One detail-page anchor discovered on a work's results pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    pub source_href: String,
    /// Token from the raw href's range-finder; not cross-checked against `package.range`.
    pub range: Option<String>,
    pub package: ImagePackage,
}
