//! Manifest file output: `<output_dir>/<edition-id>.json`, pretty-printed.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use super::{Manifest, ManifestError};

pub fn manifest_path(output_dir: &Path, edition_id: &str) -> PathBuf {
    output_dir.join(format!("{}.json", edition_id))
}

/// Write `manifest` as indented JSON, creating `output_dir` if needed. Returns the path written.
pub fn write_manifest(
    manifest: &Manifest,
    output_dir: &Path,
    edition_id: &str,
) -> Result<PathBuf, ManifestError> {
    std::fs::create_dir_all(output_dir).map_err(|e| ManifestError::CreateDir {
        path: output_dir.to_path_buf(),
        source: e,
    })?;
    let path = manifest_path(output_dir, edition_id);
    let file = File::create(&path).map_err(|e| ManifestError::CreateFile {
        path: path.clone(),
        source: e,
    })?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, manifest).map_err(|e| ManifestError::Serialize {
        path: path.clone(),
        source: e,
    })?;
    writer.flush().map_err(|e| ManifestError::Write {
        path: path.clone(),
        source: e,
    })?;
    tracing::info!(path = %path.display(), canvases = manifest.items.len(), "manifest written");
    Ok(path)
}
