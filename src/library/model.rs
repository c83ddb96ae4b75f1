use std::fmt;
use std::time::Duration;

use uuid::Uuid;

/// Opaque, unique track identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TrackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// One entry of the catalog. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub id: TrackId,
    pub display_name: String,
    /// Locator handed to the media backend for resolution.
    pub media: String,
    /// Locator of the cover image, empty when there is none.
    pub artwork: String,
    /// Duration from tag metadata, if the scanner could read it.
    pub duration: Option<Duration>,
}

impl Track {
    pub fn new(
        display_name: impl Into<String>,
        media: impl Into<String>,
        artwork: impl Into<String>,
    ) -> Self {
        Self {
            id: TrackId::new(),
            display_name: display_name.into(),
            media: media.into(),
            artwork: artwork.into(),
            duration: None,
        }
    }

    pub fn with_duration(mut self, duration: Option<Duration>) -> Self {
        self.duration = duration;
        self
    }
}
