//! Progress polling and the fallback end-of-track inference.

use std::time::Duration;

/// What the progress tick reads from the active session.
#[derive(Debug, Copy, Clone)]
pub struct ProgressSample {
    pub position: Duration,
    pub duration: Option<Duration>,
    /// Whether the decoder is currently producing audio.
    pub active: bool,
    /// Whether the engine believes it is playing.
    pub playing: bool,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ProgressUpdate {
    /// New normalized position, `None` when the duration is unknown.
    pub progress: Option<f64>,
    /// The track is inferred to have ended.
    pub end_of_track: bool,
}

/// Polls position and infers end-of-track for decoders whose completion
/// notification never arrives.
///
/// The notification stays authoritative: the inference only fires once the
/// "near the end and silent" condition has held for more than `grace_ticks`
/// consecutive ticks.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    threshold: f64,
    grace_ticks: u32,
    suspect_ticks: u32,
}

impl ProgressReporter {
    pub fn new(threshold: f64, grace: Duration, tick_period: Duration) -> Self {
        let period = tick_period.as_millis().max(1);
        let grace_ticks = grace.as_millis().div_ceil(period);
        Self {
            threshold,
            grace_ticks: u32::try_from(grace_ticks).unwrap_or(u32::MAX),
            suspect_ticks: 0,
        }
    }

    pub fn grace_ticks(&self) -> u32 {
        self.grace_ticks
    }

    /// Forget any pending end-of-track suspicion.
    pub fn reset(&mut self) {
        self.suspect_ticks = 0;
    }

    pub fn tick(&mut self, sample: ProgressSample, last_progress: f64) -> ProgressUpdate {
        let progress = sample
            .duration
            .filter(|d| !d.is_zero())
            .map(|d| (sample.position.as_secs_f64() / d.as_secs_f64()).clamp(0.0, 1.0));

        let effective = progress.unwrap_or(last_progress);
        let looks_finished = sample.playing && !sample.active && effective >= self.threshold;

        let end_of_track = if looks_finished {
            self.suspect_ticks = self.suspect_ticks.saturating_add(1);
            self.suspect_ticks > self.grace_ticks
        } else {
            self.suspect_ticks = 0;
            false
        };
        if end_of_track {
            self.suspect_ticks = 0;
        }

        ProgressUpdate {
            progress,
            end_of_track,
        }
    }
}
