//! Optional config file loading. Search order: ./cervantes-iiif.toml, then
//! $XDG_CONFIG_HOME/cervantes-iiif/config.toml (or ~/.config/cervantes-iiif/config.toml).

use serde::Deserialize;
use std::path::PathBuf;

/// Config file contents. All fields optional; only present keys override defaults.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct Config {
    /// Directory manifests are written to. Paths are relative to CWD.
    pub output_dir: Option<PathBuf>,
    /// HTTP User-Agent header.
    pub user_agent: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: Option<u64>,
    /// Image server base; the encoded image URL is appended to it.
    pub image_service_base: Option<String>,
    /// Prefix for manifest, canvas, and range ids.
    pub manifest_base_url: Option<String>,
    /// Language tag for labels and metadata (e.g. "en"). Unset writes "none".
    pub language: Option<String>,
    /// Range membership: first (default) or all.
    pub range_members: Option<String>,
    /// Fixed canvas size as "WIDTHxHEIGHT"; skips info.json probing when set.
    pub canvas_size: Option<String>,
}

/// Search order: (1) ./cervantes-iiif.toml, (2) $XDG_CONFIG_HOME/cervantes-iiif/config.toml.
/// Missing file returns Ok(None). Invalid TOML or I/O error reading a present file returns Err.
pub fn load_config() -> Result<Option<Config>, String> {
    let cwd = std::env::current_dir()
        .map_err(|e| format!("Cannot determine current directory: {}", e))?;
    let mut paths = vec![cwd.join("cervantes-iiif.toml")];
    if let Some(d) = dirs::config_dir() {
        paths.push(d.join("cervantes-iiif").join("config.toml"));
    }
    for path in &paths {
        if path.exists() {
            let s = std::fs::read_to_string(path)
                .map_err(|e| format!("Cannot read config {}: {}", path.display(), e))?;
            let config: Config = toml::from_str(&s)
                .map_err(|e| format!("Invalid config {}: {}", path.display(), e))?;
            tracing::debug!(path = %path.display(), "config loaded");
            return Ok(Some(config));
        }
    }
    Ok(None)
}
