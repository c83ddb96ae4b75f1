//! Playback engine.
//!
//! [`AudioPlayer`] is the public handle: it spawns the engine thread and
//! forwards commands to it. The engine itself ([`Engine`]) is a plain state
//! machine driven through the [`MediaBackend`], [`OutputActivator`] and
//! [`Clock`] seams, with `rodio` behind them in production.

mod backend;
mod clock;
mod engine;
mod meter;
mod observer;
mod player;
mod progress;
mod rodio_backend;
mod thread;
mod types;

pub use backend::{MediaBackend, OutputActivator, Session, SessionEvents};
pub use clock::{Clock, ThreadClock, Tick, TickKind};
pub use engine::Engine;
pub use meter::{MeterTap, PowerLevels, SILENCE_DB, normalize_power};
pub use player::AudioPlayer;
pub use progress::{ProgressReporter, ProgressSample, ProgressUpdate};
pub use rodio_backend::{RodioBackend, RodioSession};
pub use types::{
    AudioCmd, DEFAULT_IDLE_AMPLITUDE, PlaybackEvent, PlaybackState, RepeatMode, SessionEvent,
    StateHandle, Transport,
};
