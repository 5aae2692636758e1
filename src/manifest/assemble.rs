//! Fold crawled work items into a manifest: one canvas per item, ranges by range token.

use std::collections::HashMap;

use serde::Deserialize;

use super::{
    Annotation, AnnotationPage, Canvas, CanvasRef, ImageResource, Manifest, ManifestConfig,
    MetadataEntry, Range, RangeMembers, PRESENTATION_CONTEXT,
};
use crate::encoding::service_id;
use crate::model::{EditionRow, Metadata, WorkItem};

/// Canvas label source in a detail page's metadata.
const IMAGE_LABEL_KEY: &str = "Image";

/// Pixel size reported by the image service's info document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct ImageSize {
    pub width: u32,
    pub height: u32,
}

/// Edition-level values for the manifest.
#[derive(Debug, Clone)]
pub struct ManifestHeader {
    /// Edition id; also names the output file.
    pub id: String,
    pub label: String,
    pub metadata: Metadata,
    pub thumbnail_encoded: Option<String>,
}

impl From<&EditionRow> for ManifestHeader {
    fn from(row: &EditionRow) -> Self {
        Self {
            id: row.id.clone(),
            label: row.title.clone(),
            metadata: row.metadata.clone(),
            thumbnail_encoded: row.thumbnail_encoded.clone(),
        }
    }
}

fn metadata_entries(metadata: &Metadata, config: &ManifestConfig) -> Vec<MetadataEntry> {
    metadata
        .iter()
        .map(|(label, value)| MetadataEntry {
            label: config.lang_map(label),
            value: config.lang_map(value),
        })
        .collect()
}

/// Build the manifest for one edition.
///
/// `size_of` is asked for the pixel size of each image-service id, and its error aborts
/// the build. A canvas without an image takes the previous canvas's size, or
/// `config.blank_canvas_size` when it comes first.
pub fn assemble<E>(
    header: &ManifestHeader,
    items: &[WorkItem],
    config: &ManifestConfig,
    size_of: &mut dyn FnMut(&str) -> Result<ImageSize, E>,
) -> Result<Manifest, E> {
    let base = config.base_url.trim_end_matches('/');
    let edition_base = format!("{}/{}", base, header.id);

    let thumbnail = header
        .thumbnail_encoded
        .as_deref()
        .map(|encoded| {
            ImageResource::from_service(&service_id(&config.image_service_base, encoded), None)
        })
        .into_iter()
        .collect();

    let mut canvases = Vec::with_capacity(items.len());
    let mut ranges: Vec<Range> = Vec::new();
    let mut range_index: HashMap<&str, usize> = HashMap::new();
    let mut last_size = config.blank_canvas_size;

    for (index, item) in items.iter().enumerate() {
        let package = &item.package;
        let canvas_id = format!("{}/canvas/{}", edition_base, index);

        let (annotation_pages, size) = match package.image_url_encoded.as_deref() {
            Some(encoded) => {
                let service = service_id(&config.image_service_base, encoded);
                let size = size_of(&service)?;
                let page_id = format!("{}/page/0", canvas_id);
                let annotation = Annotation {
                    id: format!("{}/annotation/0", canvas_id),
                    kind: "Annotation".to_string(),
                    motivation: "painting".to_string(),
                    body: ImageResource::from_service(&service, Some(size)),
                    target: canvas_id.clone(),
                };
                let page = AnnotationPage {
                    id: page_id,
                    kind: "AnnotationPage".to_string(),
                    items: vec![annotation],
                };
                (vec![page], size)
            }
            None => (Vec::new(), last_size),
        };
        last_size = size;

        canvases.push(Canvas {
            id: canvas_id.clone(),
            kind: "Canvas".to_string(),
            label: config.lang_map(package.metadata.get(IMAGE_LABEL_KEY).unwrap_or("")),
            height: size.height,
            width: size.width,
            metadata: metadata_entries(&package.metadata, config),
            items: annotation_pages,
        });

        let canvas_ref = CanvasRef {
            id: canvas_id,
            kind: "Canvas".to_string(),
        };
        match range_index.get(package.range.as_str()) {
            Some(&existing) => {
                if config.range_members == RangeMembers::All {
                    ranges[existing].items.push(canvas_ref);
                }
            }
            None => {
                range_index.insert(package.range.as_str(), ranges.len());
                ranges.push(Range {
                    id: format!("{}/range/{}", edition_base, ranges.len()),
                    kind: "Range".to_string(),
                    label: config.lang_map(package.range.as_str()),
                    items: vec![canvas_ref],
                });
            }
        }
    }

    Ok(Manifest {
        context: PRESENTATION_CONTEXT.to_string(),
        id: format!("{}/{}.json", base, header.id),
        kind: "Manifest".to_string(),
        label: config.lang_map(header.label.as_str()),
        metadata: metadata_entries(&header.metadata, config),
        thumbnail,
        items: canvases,
        structures: ranges,
    })
}
