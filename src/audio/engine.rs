//! The playback state machine.
//!
//! `Engine` owns the playlist, the published `PlaybackState` and at most one
//! live session. It is single-threaded: every command, tick and session
//! notification goes through `&mut self`, so the player runs it on one
//! dedicated thread and feeds it from a channel.
//!
//! Each loaded session gets a new generation number. Ticks and session
//! notifications carry the generation they were issued for and are dropped
//! when it no longer matches, so nothing from a replaced track can touch the
//! current one.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error, info, trace, warn};

use crate::config::EngineSettings;
use crate::error::PlaybackError;
use crate::library::Playlist;

use super::backend::{MediaBackend, Notify, OutputActivator, Session, SessionEvents};
use super::clock::{Clock, TickKind};
use super::meter::normalize_power;
use super::observer::Observers;
use super::progress::{ProgressReporter, ProgressSample};
use super::types::{
    AudioCmd, PlaybackEvent, PlaybackState, RepeatMode, SessionEvent, StateHandle, Transport,
};

pub struct Engine<B, C>
where
    B: MediaBackend + OutputActivator,
    C: Clock,
{
    playlist: Playlist,
    backend: B,
    clock: C,
    settings: EngineSettings,
    state: PlaybackState,
    session: Option<B::Session>,
    generation: u64,
    /// Set when a decode failure discarded the session; play/pause reloads.
    reload_on_resume: bool,
    progress: ProgressReporter,
    notify: Notify,
    observers: Observers,
}

impl<B, C> Engine<B, C>
where
    B: MediaBackend + OutputActivator,
    C: Clock,
{
    /// `notify` receives session notifications (tagged with their
    /// generation); the owner must route them back into
    /// [`Engine::handle_session_event`] on the engine's thread.
    pub fn new<F>(
        playlist: Playlist,
        backend: B,
        clock: C,
        settings: EngineSettings,
        shared: StateHandle,
        notify: F,
    ) -> Self
    where
        F: Fn(u64, SessionEvent) + Send + Sync + 'static,
    {
        let progress = ProgressReporter::new(
            settings.end_of_track_threshold,
            Duration::from_millis(settings.completion_grace_ms),
            Duration::from_millis(settings.progress_interval_ms),
        );
        let state = PlaybackState {
            repeat: settings.repeat.into(),
            amplitude: settings.idle_amplitude,
            ..PlaybackState::default()
        };

        let mut observers = Observers::new(shared);
        observers.publish_state(&state);

        Self {
            playlist,
            backend,
            clock,
            settings,
            state,
            session: None,
            generation: 0,
            reload_on_resume: false,
            progress,
            notify: Arc::new(notify),
            observers,
        }
    }

    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    /// Generation of the current (or most recently discarded) session.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn has_session(&self) -> bool {
        self.session.is_some()
    }

    pub fn subscribe(&mut self, tx: std::sync::mpsc::Sender<PlaybackEvent>) {
        self.observers.subscribe(tx, &self.state);
    }

    pub fn handle_command(&mut self, cmd: AudioCmd) {
        match cmd {
            AudioCmd::Select(index) => self.select_song(index),
            AudioCmd::PlayPause => self.play_pause(),
            AudioCmd::Next => self.next(),
            AudioCmd::Prev => self.previous(),
            AudioCmd::ToggleRepeat => self.toggle_repeat(),
            AudioCmd::Stop => self.stop(),
        }
    }

    /// Load and play the track at `index`. Out-of-range indices are ignored.
    pub fn select_song(&mut self, index: usize) {
        if !self.playlist.contains_index(index) {
            debug!(
                index,
                len = self.playlist.len(),
                "ignoring out-of-range track selection"
            );
            return;
        }
        self.state.current_index = index;
        self.load_current();
    }

    pub fn next(&mut self) {
        self.state.current_index = self.playlist.next_index(self.state.current_index);
        self.load_current();
    }

    pub fn previous(&mut self) {
        self.state.current_index = self.playlist.prev_index(self.state.current_index);
        self.load_current();
    }

    pub fn toggle_repeat(&mut self) {
        self.state.repeat = self.state.repeat.toggled();
        info!(repeat = ?self.state.repeat, "repeat mode changed");
        self.publish_state();
    }

    pub fn play_pause(&mut self) {
        if self.session.is_none() {
            if self.reload_on_resume {
                info!(index = self.state.current_index, "retrying failed track");
                self.load_current();
            } else {
                debug!("play/pause ignored, no track loaded");
            }
            return;
        }
        match self.state.transport {
            Transport::Playing => self.pause(),
            Transport::Paused | Transport::Stopped => self.resume(),
        }
    }

    /// Unload the current track.
    pub fn stop(&mut self) {
        self.teardown_session();
        self.reload_on_resume = false;
        self.state.transport = Transport::Stopped;
        info!(index = self.state.current_index, "playback stopped");
        self.publish_state();
    }

    /// Release the session and timers; the engine is not used afterwards.
    pub fn shutdown(&mut self) {
        self.teardown_session();
        self.state.transport = Transport::Stopped;
        self.publish_state();
        debug!("engine shut down");
    }

    pub fn handle_tick(&mut self, kind: TickKind, generation: u64) {
        if generation != self.generation || self.session.is_none() || !self.clock.is_running(kind)
        {
            trace!(?kind, generation, current = self.generation, "dropping stale tick");
            return;
        }
        match kind {
            TickKind::Meter => self.meter_tick(),
            TickKind::Progress => self.progress_tick(),
        }
    }

    pub fn handle_session_event(&mut self, generation: u64, event: SessionEvent) {
        if generation != self.generation || self.session.is_none() {
            debug!(generation, ?event, "dropping event from a replaced session");
            return;
        }
        match event {
            SessionEvent::Finished => {
                if self.state.transport != Transport::Playing {
                    debug!(transport = ?self.state.transport, "completion ignored while not playing");
                    return;
                }
                debug!(index = self.state.current_index, "decoder reported end of track");
                self.progress.reset();
                self.end_of_track();
            }
            SessionEvent::DecodeError(reason) => {
                self.fail_playback(PlaybackError::FatalDecode(reason));
            }
        }
    }

    fn pause(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.pause();
        }
        self.stop_metering();
        self.state.transport = Transport::Paused;
        info!(index = self.state.current_index, "paused");
        self.publish_state();
    }

    fn resume(&mut self) {
        if let Err(e) = self.backend.activate() {
            warn!(error = %e, "cannot resume playback");
            self.surface_error(e);
            return;
        }
        if let Some(session) = self.session.as_mut() {
            session.play();
        }
        self.state.transport = Transport::Playing;
        self.state.last_error = None;
        self.progress.reset();
        self.start_metering();
        if !self.clock.is_running(TickKind::Progress) {
            self.start_progress();
        }
        info!(index = self.state.current_index, "resumed");
        self.publish_state();
    }

    fn load_current(&mut self) {
        self.teardown_session();

        let index = self.state.current_index;
        let Some(track) = self.playlist.get(index) else {
            return;
        };
        let name = track.display_name.clone();
        let locator = track.media.clone();

        match self.open_session(&locator) {
            Ok(mut session) => {
                session.set_metering_enabled(true);
                session.play();
                self.session = Some(session);
                self.reload_on_resume = false;
                self.state.transport = Transport::Playing;
                self.state.last_error = None;
                self.start_progress();
                self.start_metering();
                info!(index, track = %name, generation = self.generation, "track loaded");
                self.publish_state();
            }
            Err(e) => {
                warn!(index, track = %name, error = %e, "track load aborted");
                // The previous session is gone; never claim to be playing without one.
                if self.state.transport == Transport::Playing {
                    self.state.transport = Transport::Stopped;
                }
                self.surface_error(e);
            }
        }
    }

    fn open_session(&mut self, locator: &str) -> Result<B::Session, PlaybackError> {
        let resource = self.backend.resolve(locator)?;
        let events = SessionEvents::new(self.generation, self.notify.clone());
        self.backend.open(&resource, events)
    }

    /// Cancel both schedules and drop the session before anything new starts.
    fn teardown_session(&mut self) {
        self.clock.cancel_all();
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
        self.generation = self.generation.wrapping_add(1);
        self.progress.reset();
        self.state.progress = 0.0;
        self.state.amplitude = self.settings.idle_amplitude;
    }

    fn start_metering(&mut self) {
        let period = Duration::from_millis(self.settings.meter_interval_ms);
        self.clock.start(TickKind::Meter, period, self.generation);
    }

    fn stop_metering(&mut self) {
        self.clock.cancel(TickKind::Meter);
        self.state.amplitude = self.settings.idle_amplitude;
    }

    fn start_progress(&mut self) {
        let period = Duration::from_millis(self.settings.progress_interval_ms);
        self.clock.start(TickKind::Progress, period, self.generation);
    }

    fn meter_tick(&mut self) {
        if self.state.transport != Transport::Playing {
            return;
        }
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let db = session.channel_power(self.settings.meter_channel);
        self.state.amplitude = normalize_power(db, self.settings.meter_floor_db);
        self.publish_state();
    }

    fn progress_tick(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        // Tag metadata stands in when the decoder cannot tell.
        let duration = session.duration().or_else(|| {
            self.playlist
                .get(self.state.current_index)
                .and_then(|track| track.duration)
        });
        let sample = ProgressSample {
            position: session.current_time(),
            duration,
            active: session.is_active(),
            playing: self.state.transport == Transport::Playing,
        };

        let update = self.progress.tick(sample, self.state.progress);
        if let Some(progress) = update.progress {
            self.state.progress = progress;
        }
        self.publish_state();

        if update.end_of_track {
            debug!(index = self.state.current_index, "end of track inferred from position");
            self.end_of_track();
        }
    }

    fn end_of_track(&mut self) {
        match self.state.repeat {
            RepeatMode::Off => self.next(),
            RepeatMode::Track => self.restart_in_place(),
        }
    }

    /// Rewind the current session and keep playing; no teardown.
    fn restart_in_place(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if let Err(e) = session.seek(Duration::ZERO) {
            self.fail_playback(e);
            return;
        }
        session.play();

        self.progress.reset();
        self.state.progress = 0.0;
        info!(index = self.state.current_index, "repeating track");
        self.publish_state();
    }

    /// Stop after a mid-playback failure. The broken session is discarded
    /// and nothing advances on its own; a later play/pause reloads the
    /// track from the start.
    fn fail_playback(&mut self, err: PlaybackError) {
        error!(index = self.state.current_index, error = %err, "playback failed");
        self.teardown_session();
        self.reload_on_resume = true;
        self.state.transport = Transport::Stopped;
        self.surface_error(err);
    }

    fn surface_error(&mut self, err: PlaybackError) {
        self.state.last_error = Some(err.clone());
        self.observers.publish(PlaybackEvent::Error(err));
        self.publish_state();
    }

    fn publish_state(&mut self) {
        self.observers.publish_state(&self.state);
    }
}

impl<B, C> Drop for Engine<B, C>
where
    B: MediaBackend + OutputActivator,
    C: Clock,
{
    fn drop(&mut self) {
        self.clock.cancel_all();
        if let Some(mut session) = self.session.take() {
            session.stop();
        }
    }
}
