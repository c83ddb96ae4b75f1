use std::path::{Path, PathBuf};
use std::time::Duration;

use lofty::prelude::{Accessor, AudioFile, TaggedFileExt};
use tracing::debug;
use walkdir::WalkDir;

use crate::config::LibrarySettings;

use super::model::Track;

const ARTWORK_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const ARTWORK_STEMS: [&str; 3] = ["cover", "folder", "front"];

pub(super) fn normalized_extensions(settings: &LibrarySettings) -> Vec<String> {
    settings
        .extensions
        .iter()
        .map(|e| e.trim().trim_start_matches('.').to_ascii_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}

fn is_audio_file(path: &Path, exts: &[String]) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| {
            let ext = ext.to_ascii_lowercase();
            exts.iter().any(|e| e == &ext)
        })
        .unwrap_or(false)
}

fn is_hidden(path: &Path) -> bool {
    path.file_name()
        .and_then(|s| s.to_str())
        .map(|name| name.starts_with('.'))
        .unwrap_or(false)
}

pub(super) fn make_display(title: &str, artist: Option<&str>) -> String {
    match artist.map(str::trim) {
        Some(a) if !a.is_empty() => format!("{} - {}", a, title.trim()),
        _ => title.trim().to_string(),
    }
}

/// Cover image for `track`: a same-stem image beside it wins over a
/// directory-wide `cover`/`folder`/`front` image.
pub(super) fn find_artwork(track: &Path) -> Option<PathBuf> {
    let dir = track.parent()?;
    let stem = track.file_stem().and_then(|s| s.to_str());

    let candidates = stem
        .into_iter()
        .chain(ARTWORK_STEMS)
        .flat_map(|s| ARTWORK_EXTENSIONS.iter().map(move |ext| dir.join(format!("{s}.{ext}"))));

    candidates.into_iter().find(|p| p.is_file())
}

fn read_track(path: &Path) -> Track {
    let mut title = path
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("UNKNOWN")
        .to_string();
    let mut artist: Option<String> = None;
    let mut duration: Option<Duration> = None;

    match lofty::read_from_path(path) {
        Ok(tagged) => {
            duration = Some(tagged.properties().duration()).filter(|d| !d.is_zero());

            if let Some(tag) = tagged.primary_tag().or_else(|| tagged.first_tag()) {
                if let Some(v) = tag.title() {
                    if !v.trim().is_empty() {
                        title = v.to_string();
                    }
                }
                if let Some(v) = tag.artist() {
                    let v = v.trim();
                    if !v.is_empty() {
                        artist = Some(v.to_string());
                    }
                }
            }
        }
        Err(e) => debug!(path = %path.display(), error = %e, "no readable tags"),
    }

    let artwork = find_artwork(path)
        .map(|p| p.display().to_string())
        .unwrap_or_default();

    Track::new(
        make_display(&title, artist.as_deref()),
        path.display().to_string(),
        artwork,
    )
    .with_duration(duration)
}

/// Walk `dir` for audio files and build tracks sorted by display name.
pub fn scan(dir: &Path, settings: &LibrarySettings) -> Vec<Track> {
    let exts = normalized_extensions(settings);
    let mut tracks: Vec<Track> = Vec::new();

    let mut walker = WalkDir::new(dir).follow_links(settings.follow_links);

    // Non-recursive = only the root directory.
    let depth_cap = if settings.recursive {
        settings.max_depth
    } else {
        Some(1)
    };
    if let Some(d) = depth_cap {
        walker = walker.max_depth(d);
    }

    for entry in walker
        .into_iter()
        .filter_entry(|e| settings.include_hidden || e.depth() == 0 || !is_hidden(e.path()))
        .filter_map(Result::ok)
    {
        let path = entry.path();
        if path.is_file() && is_audio_file(path, &exts) {
            tracks.push(read_track(path));
        }
    }

    tracks.sort_by_key(|t| t.display_name.to_lowercase());
    debug!(dir = %dir.display(), count = tracks.len(), "library scan finished");
    tracks
}
