//! Audio-related small types and handles.
//!
//! This module defines the transport and repeat enums, the published
//! playback state, the messages the engine thread consumes and the shared
//! state handle.

use std::sync::{Arc, Mutex};

use crate::config::RepeatSetting;
use crate::error::PlaybackError;

use super::clock::Tick;

/// Amplitude shown while nothing plays, so a visualizer keeps a gentle baseline.
pub const DEFAULT_IDLE_AMPLITUDE: f32 = 0.1;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum Transport {
    #[default]
    Stopped,
    Playing,
    Paused,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum RepeatMode {
    /// Advance to the next track when the current one ends.
    #[default]
    Off,
    /// Restart the current track when it ends.
    Track,
}

impl RepeatMode {
    pub fn toggled(self) -> Self {
        match self {
            Self::Off => Self::Track,
            Self::Track => Self::Off,
        }
    }
}

impl From<RepeatSetting> for RepeatMode {
    fn from(setting: RepeatSetting) -> Self {
        match setting {
            RepeatSetting::Off => Self::Off,
            RepeatSetting::Track => Self::Track,
        }
    }
}

/// Playback state published to observers after every command and tick.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackState {
    /// Index of the current track in the playlist.
    pub current_index: usize,
    pub transport: Transport,
    pub repeat: RepeatMode,
    /// Normalized position in the current track, `0.0..=1.0`.
    pub progress: f64,
    /// Normalized, perceptually scaled loudness, `0.0..=1.0`.
    pub amplitude: f32,
    /// Most recent surfaced error; cleared by the next successful load or resume.
    pub last_error: Option<PlaybackError>,
}

impl Default for PlaybackState {
    fn default() -> Self {
        Self {
            current_index: 0,
            transport: Transport::Stopped,
            repeat: RepeatMode::Off,
            progress: 0.0,
            amplitude: DEFAULT_IDLE_AMPLITUDE,
            last_error: None,
        }
    }
}

/// What observers receive.
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    State(PlaybackState),
    Error(PlaybackError),
}

#[derive(Debug)]
pub enum AudioCmd {
    /// Load and play the track at the given playlist index.
    Select(usize),
    /// Toggle pause/resume of the loaded track.
    PlayPause,
    /// Skip to the next track, wrapping at the end.
    Next,
    /// Go to the previous track, wrapping at the start.
    Prev,
    /// Flip between repeat off and repeat track.
    ToggleRepeat,
    /// Unload the current track.
    Stop,
}

/// Notifications a live session sends back to the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The decoder played the track to its end.
    Finished,
    /// The decoder failed mid-stream.
    DecodeError(String),
}

/// Everything the engine thread handles, in arrival order.
pub(crate) enum EngineMsg {
    Command(AudioCmd),
    Tick(Tick),
    Session { generation: u64, event: SessionEvent },
    Subscribe(std::sync::mpsc::Sender<PlaybackEvent>),
    Quit,
}

pub type StateHandle = Arc<Mutex<PlaybackState>>;
