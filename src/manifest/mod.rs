//! IIIF Presentation 3 manifest output.
//!
//! Only the resource shapes this tool emits are modelled: a manifest of image canvases,
//! each painted by one image-service image, and flat ranges pointing at canvases.

mod assemble;
mod write;

pub use assemble::{assemble, ImageSize, ManifestHeader};
pub use write::{manifest_path, write_manifest};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;

pub const PRESENTATION_CONTEXT: &str = "http://iiif.io/api/presentation/3/context.json";
/// Image server that resolves base64-encoded source image URLs.
pub const DEFAULT_IMAGE_SERVICE_BASE: &str = "https://api-pre.library.tamu.edu/iiif/2/";
pub const DEFAULT_MANIFEST_BASE_URL: &str =
    "https://markpbaggett.github.io/static_iiif/manifests/cervantes";
pub const DEFAULT_OUTPUT_DIR: &str = "cervantes-manifests";
/// Size of an imageless canvas when no earlier canvas has one.
pub const DEFAULT_BLANK_CANVAS_SIZE: ImageSize = ImageSize {
    width: 1000,
    height: 1500,
};
const IMAGE_SERVICE_PROFILE: &str = "http://iiif.io/api/image/2/level2.json";
/// Language key used when no language is configured.
const NO_LANGUAGE: &str = "none";

/// IIIF language map: language tag -> values.
pub type LanguageMap = BTreeMap<String, Vec<String>>;

/// Errors from writing manifests.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Failed to create output directory: {path}: {source}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create file: {path}: {source}")]
    CreateFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to serialize manifest {path}: {source}")]
    Serialize {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Which canvases a range lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RangeMembers {
    /// Only the first canvas carrying the range token (historical output).
    #[default]
    FirstSeenOnly,
    /// Every canvas carrying the range token.
    All,
}

/// Per-build settings for the assembler.
#[derive(Debug, Clone)]
pub struct ManifestConfig {
    /// Prefix for manifest, canvas, and range ids.
    pub base_url: String,
    pub image_service_base: String,
    /// Language tag for labels and metadata; `None` writes IIIF `"none"`.
    pub language: Option<String>,
    pub range_members: RangeMembers,
    /// Canvas size for a page without an image when no earlier canvas has a size.
    pub blank_canvas_size: ImageSize,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_MANIFEST_BASE_URL.to_string(),
            image_service_base: DEFAULT_IMAGE_SERVICE_BASE.to_string(),
            language: None,
            range_members: RangeMembers::default(),
            blank_canvas_size: DEFAULT_BLANK_CANVAS_SIZE,
        }
    }
}

impl ManifestConfig {
    pub(crate) fn lang_map(&self, value: impl Into<String>) -> LanguageMap {
        let key = self.language.as_deref().unwrap_or(NO_LANGUAGE).to_string();
        BTreeMap::from([(key, vec![value.into()])])
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataEntry {
    pub label: LanguageMap,
    pub value: LanguageMap,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(rename = "@context")]
    pub context: String,
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub thumbnail: Vec<ImageResource>,
    pub items: Vec<Canvas>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub structures: Vec<Range>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Canvas {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    pub height: u32,
    pub width: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub metadata: Vec<MetadataEntry>,
    pub items: Vec<AnnotationPage>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnnotationPage {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub items: Vec<Annotation>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Annotation {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub motivation: String,
    pub body: ImageResource,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageResource {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub format: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    pub service: Vec<ImageService>,
}

/// Image API 2 service reference (v2 services keep the `@`-prefixed keys).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageService {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub kind: String,
    pub profile: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Range {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub label: LanguageMap,
    pub items: Vec<CanvasRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanvasRef {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ImageResource {
    /// Full-size JPEG from the image service at `service_id`.
    pub fn from_service(service_id: &str, size: Option<ImageSize>) -> Self {
        Self {
            id: format!("{}/full/full/0/default.jpg", service_id),
            kind: "Image".to_string(),
            format: "image/jpeg".to_string(),
            height: size.map(|s| s.height),
            width: size.map(|s| s.width),
            service: vec![ImageService {
                id: service_id.to_string(),
                kind: "ImageService2".to_string(),
                profile: IMAGE_SERVICE_PROFILE.to_string(),
            }],
        }
    }
}
