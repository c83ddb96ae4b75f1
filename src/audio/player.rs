use std::io;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use tracing::warn;

use crate::config::EngineSettings;
use crate::library::{MediaResolver, Playlist};

use super::backend::{MediaBackend, OutputActivator};
use super::rodio_backend::RodioBackend;
use super::thread::spawn_engine_thread;
use super::types::{AudioCmd, EngineMsg, PlaybackEvent, PlaybackState, StateHandle};

/// Handle to the engine thread. Commands are fire-and-forget; results show
/// up in the shared state and on subscriptions.
pub struct AudioPlayer {
    tx: Sender<EngineMsg>,
    state: StateHandle,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl AudioPlayer {
    /// Start a player on the default audio output.
    pub fn new(
        playlist: Playlist,
        settings: EngineSettings,
        resolver: MediaResolver,
    ) -> io::Result<Self> {
        Self::spawn_with(playlist, settings, move || RodioBackend::new(resolver))
    }

    /// Start a player whose backend is built by `make_backend` on the engine thread.
    pub fn spawn_with<B, F>(
        playlist: Playlist,
        settings: EngineSettings,
        make_backend: F,
    ) -> io::Result<Self>
    where
        B: MediaBackend + OutputActivator,
        F: FnOnce() -> B + Send + 'static,
    {
        let (tx, rx) = mpsc::channel::<EngineMsg>();
        let state: StateHandle = Arc::new(Mutex::new(PlaybackState::default()));

        let handle = spawn_engine_thread(
            playlist,
            settings,
            make_backend,
            tx.clone(),
            rx,
            state.clone(),
        )?;

        Ok(Self {
            tx,
            state,
            join: Mutex::new(Some(handle)),
        })
    }

    pub fn select_song(&self, index: usize) {
        self.send(AudioCmd::Select(index));
    }

    pub fn play_pause(&self) {
        self.send(AudioCmd::PlayPause);
    }

    pub fn next(&self) {
        self.send(AudioCmd::Next);
    }

    pub fn previous(&self) {
        self.send(AudioCmd::Prev);
    }

    pub fn toggle_repeat(&self) {
        self.send(AudioCmd::ToggleRepeat);
    }

    pub fn stop(&self) {
        self.send(AudioCmd::Stop);
    }

    pub fn send(&self, cmd: AudioCmd) {
        if self.tx.send(EngineMsg::Command(cmd)).is_err() {
            warn!("audio engine is gone, command dropped");
        }
    }

    /// Push subscription. The first event is the current state.
    pub fn subscribe(&self) -> Receiver<PlaybackEvent> {
        let (tx, rx) = mpsc::channel();
        let _ = self.tx.send(EngineMsg::Subscribe(tx));
        rx
    }

    pub fn state_handle(&self) -> StateHandle {
        self.state.clone()
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.state
            .lock()
            .map(|state| state.clone())
            .unwrap_or_default()
    }

    /// Stop playback and wait for the engine thread. Later calls do nothing.
    pub fn quit(&self) {
        let Ok(mut join) = self.join.lock() else {
            return;
        };
        let Some(handle) = join.take() else {
            return;
        };
        let _ = self.tx.send(EngineMsg::Quit);
        if handle.join().is_err() {
            warn!("audio engine thread panicked");
        }
    }
}

impl Drop for AudioPlayer {
    fn drop(&mut self) {
        self.quit();
    }
}
