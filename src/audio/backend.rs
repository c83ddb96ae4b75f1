//! Capabilities the engine drives: media resolution and decoding sessions,
//! and audio output activation. `rodio_backend` is the production
//! implementation; tests plug in their own.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::error::PlaybackError;

use super::types::SessionEvent;

/// One live decoding/playback session bound to a single resource.
pub trait Session {
    fn play(&mut self);
    fn pause(&mut self);
    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError>;
    fn current_time(&self) -> Duration;
    /// Total duration, when the decoder knows it.
    fn duration(&self) -> Option<Duration>;
    /// Whether audio is currently being produced.
    fn is_active(&self) -> bool;
    fn set_metering_enabled(&mut self, enabled: bool);
    /// Power of `channel` in dBFS.
    fn channel_power(&self, channel: usize) -> f32;
    /// Stop output for good; the session is discarded right after.
    fn stop(&mut self);
}

pub trait MediaBackend {
    type Session: Session;

    /// Turn a track's media locator into a playable resource.
    fn resolve(&self, locator: &str) -> Result<PathBuf, PlaybackError>;

    /// Build a paused session for `resource`. The session reports completion
    /// and decode failures through `events`.
    fn open(&mut self, resource: &Path, events: SessionEvents)
    -> Result<Self::Session, PlaybackError>;
}

pub trait OutputActivator {
    /// Make sure audio output is available before playback resumes.
    fn activate(&mut self) -> Result<(), PlaybackError>;
}

pub(crate) type Notify = Arc<dyn Fn(u64, SessionEvent) + Send + Sync>;

/// Notification channel handed to a session, tagged with its generation so
/// the engine can discard reports from sessions it already replaced.
#[derive(Clone)]
pub struct SessionEvents {
    generation: u64,
    notify: Notify,
}

impl SessionEvents {
    pub(crate) fn new(generation: u64, notify: Notify) -> Self {
        Self { generation, notify }
    }

    pub fn finished(&self) {
        (self.notify)(self.generation, SessionEvent::Finished);
    }

    pub fn decode_error(&self, reason: impl Into<String>) {
        (self.notify)(self.generation, SessionEvent::DecodeError(reason.into()));
    }
}

impl fmt::Debug for SessionEvents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionEvents")
            .field("generation", &self.generation)
            .finish_non_exhaustive()
    }
}
