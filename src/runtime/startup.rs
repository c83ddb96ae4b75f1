use std::path::Path;

use tracing::{debug, info};

use crate::config::LibrarySettings;
use crate::error::CatalogError;
use crate::library::{self, CATALOG_FILE_NAME, MediaResolver, Playlist};

/// Build the playlist for `target` and the resolver its locators need.
///
/// `target` is either a catalog file or a directory. A directory holding a
/// `playlist.toml` uses that catalog; any other directory is scanned.
/// Relative locators resolve against the directory unless `media_root` is
/// configured.
pub fn build_playlist(
    target: &Path,
    settings: &LibrarySettings,
) -> Result<(Playlist, MediaResolver), CatalogError> {
    let (tracks, root) = if target.is_file() {
        debug!(catalog = %target.display(), "loading catalog");
        let root = target.parent().unwrap_or(Path::new("."));
        (library::load_catalog(target)?, root)
    } else {
        let catalog = target.join(CATALOG_FILE_NAME);
        if catalog.is_file() {
            debug!(catalog = %catalog.display(), "loading catalog");
            (library::load_catalog(&catalog)?, target)
        } else {
            debug!(dir = %target.display(), "scanning for audio files");
            (library::scan(target, settings), target)
        }
    };

    let playlist = Playlist::new(tracks)?;
    let resolver = MediaResolver::from_settings(settings).with_default_root(root);
    info!(tracks = playlist.len(), source = %target.display(), "playlist ready");
    Ok((playlist, resolver))
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;
    use crate::error::PlaybackError;

    const CATALOG: &str = r#"
[[track]]
name = "Song 1"
media = "song1"
artwork = "c1.png"

[[track]]
name = "Song 2"
media = "song2"
"#;

    #[test]
    fn directory_catalog_wins_over_scan() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CATALOG_FILE_NAME), CATALOG).unwrap();
        fs::write(dir.path().join("song1.mp3"), b"").unwrap();
        fs::write(dir.path().join("other.mp3"), b"").unwrap();

        let (playlist, resolver) = build_playlist(dir.path(), &LibrarySettings::default()).unwrap();

        let names: Vec<_> = playlist
            .tracks()
            .iter()
            .map(|t| t.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["Song 1", "Song 2"]);
        assert_eq!(
            resolver.resolve("song1").unwrap(),
            dir.path().join("song1.mp3")
        );
        assert!(matches!(
            resolver.resolve("song2"),
            Err(PlaybackError::ResourceNotFound(_))
        ));
    }

    #[test]
    fn explicit_catalog_resolves_against_its_directory() {
        let dir = tempdir().unwrap();
        let catalog = dir.path().join("mix.toml");
        fs::write(&catalog, CATALOG).unwrap();
        fs::write(dir.path().join("song2.flac"), b"").unwrap();

        let (playlist, resolver) = build_playlist(&catalog, &LibrarySettings::default()).unwrap();
        assert_eq!(playlist.len(), 2);
        assert_eq!(
            resolver.resolve("song2").unwrap(),
            dir.path().join("song2.flac")
        );
    }

    #[test]
    fn plain_directory_is_scanned() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("b.mp3"), b"").unwrap();
        fs::write(dir.path().join("a.wav"), b"").unwrap();
        fs::write(dir.path().join("notes.txt"), b"").unwrap();

        let (playlist, _) = build_playlist(dir.path(), &LibrarySettings::default()).unwrap();
        let names: Vec<_> = playlist
            .tracks()
            .iter()
            .map(|t| t.display_name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn empty_directory_is_rejected() {
        let dir = tempdir().unwrap();
        assert!(matches!(
            build_playlist(dir.path(), &LibrarySettings::default()),
            Err(CatalogError::EmptyPlaylist)
        ));
    }

    #[test]
    fn broken_catalog_is_reported() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join(CATALOG_FILE_NAME), "[[track]]\nname = 3").unwrap();
        assert!(matches!(
            build_playlist(dir.path(), &LibrarySettings::default()),
            Err(CatalogError::Parse { .. })
        ));
    }
}
