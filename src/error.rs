//! Error types for the playback engine and catalog loading.

use std::path::PathBuf;

use thiserror::Error;

/// Errors surfaced by the playback engine.
///
/// None of these are fatal to the process: the engine logs them, stores the
/// latest one in the published state and pushes it to observers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    /// The track's media locator does not resolve to a readable resource.
    #[error("media resource not found: {0}")]
    ResourceNotFound(String),

    /// The resource exists but a decoder session could not be built for it.
    #[error("failed to open decoder for {locator}: {reason}")]
    DecodeInit { locator: String, reason: String },

    /// The audio output could not be (re)activated.
    #[error("audio output activation failed: {0}")]
    OutputActivation(String),

    /// Decoding failed mid-playback.
    #[error("decode error during playback: {0}")]
    FatalDecode(String),
}

/// Errors raised while building a playlist.
#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("playlist is empty")]
    EmptyPlaylist,

    #[error("failed to read catalog {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}
