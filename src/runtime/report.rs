use std::io;
use std::sync::mpsc::Receiver;
use std::thread::{self, JoinHandle};

use tracing::{info, trace, warn};

use crate::audio::{PlaybackEvent, PlaybackState};

/// Turns the event stream into log lines, skipping the per-tick noise.
#[derive(Debug, Default)]
pub struct Reporter {
    names: Vec<String>,
    last: Option<PlaybackState>,
}

impl Reporter {
    pub fn new(names: Vec<String>) -> Self {
        Self { names, last: None }
    }

    /// A summary of `state` when something besides progress or amplitude changed.
    pub fn observe(&mut self, state: &PlaybackState) -> Option<String> {
        let notable = match &self.last {
            None => true,
            Some(last) => {
                last.current_index != state.current_index
                    || last.transport != state.transport
                    || last.repeat != state.repeat
            }
        };
        self.last = Some(state.clone());
        if !notable {
            return None;
        }

        let name = self
            .names
            .get(state.current_index)
            .map(String::as_str)
            .unwrap_or("?");
        Some(format!(
            "{:?}: {} ({}) repeat {:?}",
            state.transport,
            name,
            state.current_index + 1,
            state.repeat
        ))
    }
}

pub fn spawn_reporter(
    rx: Receiver<PlaybackEvent>,
    names: Vec<String>,
) -> io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name("meterplay-report".into())
        .spawn(move || {
            let mut reporter = Reporter::new(names);
            // Ends once the engine drops its subscribers.
            for event in rx {
                match event {
                    PlaybackEvent::State(state) => match reporter.observe(&state) {
                        Some(line) => info!("{line}"),
                        None => trace!(
                            progress = state.progress,
                            amplitude = state.amplitude,
                            "tick"
                        ),
                    },
                    PlaybackEvent::Error(err) => warn!(error = %err, "playback error"),
                }
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{RepeatMode, Transport};

    #[test]
    fn only_transport_track_and_repeat_changes_are_reported() {
        let mut reporter = Reporter::new(vec!["A".into(), "B".into()]);
        let mut state = PlaybackState::default();

        assert_eq!(
            reporter.observe(&state).as_deref(),
            Some("Stopped: A (1) repeat Off")
        );

        state.amplitude = 0.7;
        state.progress = 0.3;
        assert_eq!(reporter.observe(&state), None);

        state.current_index = 1;
        state.transport = Transport::Playing;
        assert_eq!(
            reporter.observe(&state).as_deref(),
            Some("Playing: B (2) repeat Off")
        );

        state.repeat = RepeatMode::Track;
        assert!(reporter.observe(&state).is_some());
        assert_eq!(reporter.observe(&state), None);
    }
}
