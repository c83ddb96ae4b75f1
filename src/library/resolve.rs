//! Media locator resolution.
//!
//! A locator is an absolute path, a path relative to the media root, or a
//! bare resource name whose extension is filled in from the configured list
//! (`song1` -> `song1.mp3`).

use std::path::{Path, PathBuf};

use crate::config::LibrarySettings;
use crate::error::PlaybackError;

use super::scan::normalized_extensions;

#[derive(Debug, Clone, Default)]
pub struct MediaResolver {
    root: Option<PathBuf>,
    extensions: Vec<String>,
}

impl MediaResolver {
    pub fn new(root: Option<PathBuf>, extensions: Vec<String>) -> Self {
        Self { root, extensions }
    }

    pub fn from_settings(settings: &LibrarySettings) -> Self {
        Self::new(settings.media_root.clone(), normalized_extensions(settings))
    }

    /// Use `root` for relative locators unless one is already configured.
    pub fn with_default_root(mut self, root: &Path) -> Self {
        if self.root.is_none() {
            self.root = Some(root.to_path_buf());
        }
        self
    }

    pub fn resolve(&self, locator: &str) -> Result<PathBuf, PlaybackError> {
        let trimmed = locator.trim();
        if trimmed.is_empty() {
            return Err(PlaybackError::ResourceNotFound(locator.to_string()));
        }

        let raw = Path::new(trimmed);
        let base = match &self.root {
            Some(root) if raw.is_relative() => root.join(raw),
            _ => raw.to_path_buf(),
        };

        if base.is_file() {
            return Ok(base);
        }

        if base.extension().is_none() {
            for ext in &self.extensions {
                let candidate = base.with_extension(ext);
                if candidate.is_file() {
                    return Ok(candidate);
                }
            }
        }

        Err(PlaybackError::ResourceNotFound(locator.to_string()))
    }
}
