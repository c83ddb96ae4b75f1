use std::fs;
use std::path::Path;

use tempfile::tempdir;

use super::*;
use crate::error::{CatalogError, PlaybackError};

fn t(name: &str) -> Track {
    Track::new(name, format!("{name}.mp3"), "")
}

#[test]
fn playlist_rejects_empty_track_list() {
    assert!(matches!(
        Playlist::new(Vec::new()),
        Err(CatalogError::EmptyPlaylist)
    ));
}

#[test]
fn playlist_navigation_wraps_both_ways() {
    let playlist = Playlist::new(vec![t("a"), t("b"), t("c")]).unwrap();

    assert_eq!(playlist.next_index(0), 1);
    assert_eq!(playlist.next_index(2), 0);
    assert_eq!(playlist.prev_index(1), 0);
    assert_eq!(playlist.prev_index(0), 2);
    assert!(playlist.contains_index(2));
    assert!(!playlist.contains_index(3));
}

#[test]
fn single_track_playlist_wraps_onto_itself() {
    let playlist = Playlist::new(vec![t("only")]).unwrap();
    assert_eq!(playlist.next_index(0), 0);
    assert_eq!(playlist.prev_index(0), 0);
}

#[test]
fn parse_catalog_keeps_file_order_and_defaults_artwork() {
    let text = r#"
[[track]]
name = "Song 1"
media = "song1"
artwork = "c1.png"

[[track]]
name = "Song 2"
media = "song2"
"#;
    let tracks = parse_catalog(text, Path::new("playlist.toml")).unwrap();
    assert_eq!(tracks.len(), 2);
    assert_eq!(tracks[0].display_name, "Song 1");
    assert_eq!(tracks[0].media, "song1");
    assert_eq!(tracks[0].artwork, "c1.png");
    assert_eq!(tracks[1].artwork, "");
    assert_ne!(tracks[0].id, tracks[1].id);
}

#[test]
fn parse_catalog_reports_malformed_input() {
    let err = parse_catalog("[[track]]\nname = 3", Path::new("bad.toml")).unwrap_err();
    assert!(matches!(err, CatalogError::Parse { .. }));
}

#[test]
fn load_catalog_reports_missing_file() {
    let dir = tempdir().unwrap();
    let err = load_catalog(&dir.path().join(CATALOG_FILE_NAME)).unwrap_err();
    assert!(matches!(err, CatalogError::Read { .. }));
}

#[test]
fn resolver_finds_relative_and_extensionless_locators() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("song1.mp3"), b"x").unwrap();
    fs::create_dir_all(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("sub").join("song2.ogg"), b"x").unwrap();

    let resolver = MediaResolver::new(None, vec!["flac".into(), "mp3".into(), "ogg".into()])
        .with_default_root(dir.path());

    assert_eq!(
        resolver.resolve("song1").unwrap(),
        dir.path().join("song1.mp3")
    );
    assert_eq!(
        resolver.resolve("sub/song2.ogg").unwrap(),
        dir.path().join("sub").join("song2.ogg")
    );

    let absolute = dir.path().join("song1.mp3");
    assert_eq!(
        resolver.resolve(absolute.to_str().unwrap()).unwrap(),
        absolute
    );
}

#[test]
fn resolver_reports_missing_resources() {
    let dir = tempdir().unwrap();
    let resolver = MediaResolver::new(Some(dir.path().to_path_buf()), vec!["mp3".into()]);

    assert_eq!(
        resolver.resolve("nope"),
        Err(PlaybackError::ResourceNotFound("nope".into()))
    );
    assert!(matches!(
        resolver.resolve("   "),
        Err(PlaybackError::ResourceNotFound(_))
    ));
}

#[test]
fn configured_root_wins_over_default_root() {
    let configured = tempdir().unwrap();
    let fallback = tempdir().unwrap();
    fs::write(configured.path().join("a.mp3"), b"x").unwrap();
    fs::write(fallback.path().join("a.mp3"), b"x").unwrap();

    let resolver = MediaResolver::new(Some(configured.path().to_path_buf()), vec![])
        .with_default_root(fallback.path());

    assert_eq!(
        resolver.resolve("a.mp3").unwrap(),
        configured.path().join("a.mp3")
    );
}
