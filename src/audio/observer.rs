use std::sync::mpsc::Sender;

use super::types::{PlaybackEvent, PlaybackState, StateHandle};

/// Fan-out of playback events: a polled snapshot plus push subscribers.
pub(crate) struct Observers {
    shared: StateHandle,
    subscribers: Vec<Sender<PlaybackEvent>>,
}

impl Observers {
    pub(crate) fn new(shared: StateHandle) -> Self {
        Self {
            shared,
            subscribers: Vec::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, tx: Sender<PlaybackEvent>, current: &PlaybackState) {
        // New subscribers start from the current state rather than waiting a tick.
        if tx.send(PlaybackEvent::State(current.clone())).is_ok() {
            self.subscribers.push(tx);
        }
    }

    pub(crate) fn publish_state(&mut self, state: &PlaybackState) {
        if let Ok(mut shared) = self.shared.lock() {
            *shared = state.clone();
        }
        self.broadcast(PlaybackEvent::State(state.clone()));
    }

    pub(crate) fn publish(&mut self, event: PlaybackEvent) {
        self.broadcast(event);
    }

    fn broadcast(&mut self, event: PlaybackEvent) {
        // Subscribers that hung up are dropped.
        self.subscribers.retain(|tx| tx.send(event.clone()).is_ok());
    }
}
