//! Static TOML catalogs: a bundled, hand-written track list.
//!
//! ```toml
//! [[track]]
//! name = "Song 1"
//! media = "song1"
//! artwork = "c1.png"
//! ```

use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::error::CatalogError;

use super::model::Track;

/// File name looked up inside a media directory before falling back to a scan.
pub const CATALOG_FILE_NAME: &str = "playlist.toml";

#[derive(Debug, Deserialize)]
struct CatalogFile {
    #[serde(default, rename = "track")]
    tracks: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    media: String,
    #[serde(default)]
    artwork: String,
}

/// Parse catalog text into tracks, keeping file order.
pub fn parse_catalog(text: &str, path: &Path) -> Result<Vec<Track>, CatalogError> {
    let file: CatalogFile = toml::from_str(text).map_err(|source| CatalogError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(file
        .tracks
        .into_iter()
        .map(|e| Track::new(e.name, e.media, e.artwork))
        .collect())
}

pub fn load_catalog(path: &Path) -> Result<Vec<Track>, CatalogError> {
    let text = fs::read_to_string(path).map_err(|source| CatalogError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse_catalog(&text, path)
}
