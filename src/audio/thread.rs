use std::io;
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::debug;

use crate::config::EngineSettings;
use crate::library::Playlist;

use super::backend::{MediaBackend, OutputActivator};
use super::clock::ThreadClock;
use super::engine::Engine;
use super::types::{EngineMsg, StateHandle};

/// Run an [`Engine`] on its own thread, fed by `rx`.
///
/// The backend is built inside the thread: audio output handles are usually
/// not `Send`. Ticks and session notifications are routed through `tx`, so
/// every state change happens on this one thread in arrival order.
pub(super) fn spawn_engine_thread<B, F>(
    playlist: Playlist,
    settings: EngineSettings,
    make_backend: F,
    tx: Sender<EngineMsg>,
    rx: Receiver<EngineMsg>,
    shared: StateHandle,
) -> io::Result<JoinHandle<()>>
where
    B: MediaBackend + OutputActivator,
    F: FnOnce() -> B + Send + 'static,
{
    thread::Builder::new()
        .name("meterplay-engine".into())
        .spawn(move || {
            let backend = make_backend();

            let ticks = tx.clone();
            let clock = ThreadClock::new(move |tick| ticks.send(EngineMsg::Tick(tick)).is_ok());

            let mut engine = Engine::new(
                playlist,
                backend,
                clock,
                settings,
                shared,
                move |generation, event| {
                    let _ = tx.send(EngineMsg::Session { generation, event });
                },
            );

            while let Ok(msg) = rx.recv() {
                match msg {
                    EngineMsg::Command(cmd) => {
                        debug!(?cmd, "command");
                        engine.handle_command(cmd);
                    }
                    // Dropping the tick once handled lets its schedule fire again.
                    EngineMsg::Tick(tick) => engine.handle_tick(tick.kind, tick.generation),
                    EngineMsg::Session { generation, event } => {
                        engine.handle_session_event(generation, event);
                    }
                    EngineMsg::Subscribe(subscriber) => engine.subscribe(subscriber),
                    EngineMsg::Quit => {
                        engine.shutdown();
                        break;
                    }
                }
            }
            debug!("engine thread exiting");
        })
}
