//! Level metering.
//!
//! `MeterTap` wraps a `rodio::Source` and measures per-channel power (RMS in
//! dBFS) over fixed blocks, publishing it through a shared `PowerLevels`.
//! `normalize_power` turns one of those readings into the 0..1 amplitude a
//! bar-graph visualizer consumes.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rodio::source::SeekError;
use rodio::{ChannelCount, SampleRate, Source};

/// Power reported for digital silence (and for channels never measured).
pub const SILENCE_DB: f32 = -160.0;

/// Frames per channel accumulated before a new reading is published.
const BLOCK_FRAMES: usize = 1024;

/// Map channel power to a visual amplitude.
///
/// At or below `floor_db` gives `0.0`, at or above 0 dB gives `1.0`; between
/// the two the linear position is squared so loud passages stand out.
pub fn normalize_power(db: f32, floor_db: f32) -> f32 {
    if db.is_nan() || db <= floor_db {
        return 0.0;
    }
    if db >= 0.0 {
        return 1.0;
    }
    let normalized = (db - floor_db) / -floor_db;
    (normalized * normalized).clamp(0.0, 1.0)
}

/// Latest per-channel power readings, shared between the audio callback and
/// whoever polls them.
#[derive(Debug, Clone, Default)]
pub struct PowerLevels(Arc<Mutex<Vec<f32>>>);

impl PowerLevels {
    pub fn get(&self, channel: usize) -> f32 {
        self.0
            .lock()
            .ok()
            .and_then(|levels| levels.get(channel).copied())
            .unwrap_or(SILENCE_DB)
    }

    pub fn clear(&self) {
        if let Ok(mut levels) = self.0.lock() {
            levels.clear();
        }
    }

    // Called from the mixer thread: never block it on a reader.
    fn store(&self, readings: &[f32]) {
        if let Ok(mut levels) = self.0.try_lock() {
            levels.clear();
            levels.extend_from_slice(readings);
        }
    }
}

fn rms_to_db(mean_square: f32) -> f32 {
    let rms = mean_square.max(0.0).sqrt();
    if rms <= 1e-8 {
        SILENCE_DB
    } else {
        (20.0 * rms.log10()).max(SILENCE_DB)
    }
}

fn live_span<S: Source>(source: &S) -> Option<usize> {
    source.current_span_len().filter(|&len| len > 0)
}

pub struct MeterTap<S> {
    inner: S,
    levels: PowerLevels,
    enabled: Arc<AtomicBool>,
    channels: ChannelCount,
    sums: Vec<f32>,
    readings: Vec<f32>,
    channel_pos: usize,
    frames: usize,
    /// Samples left in the current span; `None` when the source runs unbroken.
    span_left: Option<usize>,
}

impl<S> MeterTap<S>
where
    S: Source<Item = f32>,
{
    pub fn new(source: S, levels: PowerLevels, enabled: Arc<AtomicBool>) -> Self {
        let channels = source.channels().max(1);
        let span_left = live_span(&source);
        Self {
            inner: source,
            levels,
            enabled,
            channels,
            sums: vec![0.0; channels as usize],
            readings: vec![SILENCE_DB; channels as usize],
            channel_pos: 0,
            frames: 0,
            span_left,
        }
    }

    /// Re-read the layout at a span boundary. A channel count change starts
    /// a new block sized for the new layout.
    fn next_span(&mut self) {
        self.span_left = live_span(&self.inner);
        self.channel_pos = 0;

        let channels = self.inner.channels().max(1);
        if channels != self.channels {
            self.channels = channels;
            self.sums = vec![0.0; channels as usize];
            self.readings = vec![SILENCE_DB; channels as usize];
            self.reset_block();
        }
    }

    fn count_sample(&mut self) {
        if let Some(left) = self.span_left.as_mut() {
            *left = left.saturating_sub(1);
            if *left == 0 {
                self.next_span();
            }
        }
    }

    fn reset_block(&mut self) {
        self.sums.iter_mut().for_each(|s| *s = 0.0);
        self.channel_pos = 0;
        self.frames = 0;
    }

    fn accumulate(&mut self, sample: f32) {
        self.sums[self.channel_pos] += sample * sample;
        self.channel_pos += 1;
        if self.channel_pos < self.sums.len() {
            return;
        }

        self.channel_pos = 0;
        self.frames += 1;
        if self.frames >= BLOCK_FRAMES {
            let frames = self.frames as f32;
            for (reading, sum) in self.readings.iter_mut().zip(&self.sums) {
                *reading = rms_to_db(sum / frames);
            }
            self.levels.store(&self.readings);
            self.reset_block();
        }
    }
}

impl<S> Iterator for MeterTap<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        let sample = self.inner.next()?;
        if self.enabled.load(Ordering::Relaxed) {
            self.accumulate(sample);
        }
        self.count_sample();
        Some(sample)
    }
}

impl<S> Source for MeterTap<S>
where
    S: Source<Item = f32>,
{
    fn current_span_len(&self) -> Option<usize> {
        self.inner.current_span_len()
    }

    fn channels(&self) -> ChannelCount {
        self.inner.channels()
    }

    fn sample_rate(&self) -> SampleRate {
        self.inner.sample_rate()
    }

    fn total_duration(&self) -> Option<Duration> {
        self.inner.total_duration()
    }

    fn try_seek(&mut self, pos: Duration) -> Result<(), SeekError> {
        self.inner.try_seek(pos)?;
        self.reset_block();
        self.next_span();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rodio::buffer::SamplesBuffer;

    fn tap(channels: u16, samples: Vec<f32>) -> (MeterTap<SamplesBuffer>, PowerLevels) {
        let levels = PowerLevels::default();
        let source = SamplesBuffer::new(channels, 44_100, samples);
        let tap = MeterTap::new(source, levels.clone(), Arc::new(AtomicBool::new(true)));
        (tap, levels)
    }

    #[test]
    fn normalize_power_clamps_at_floor_and_full_scale() {
        assert_eq!(normalize_power(-80.0, -80.0), 0.0);
        assert_eq!(normalize_power(-120.0, -80.0), 0.0);
        assert_eq!(normalize_power(SILENCE_DB, -80.0), 0.0);
        assert_eq!(normalize_power(0.0, -80.0), 1.0);
        assert_eq!(normalize_power(3.0, -80.0), 1.0);
        assert_eq!(normalize_power(f32::NAN, -80.0), 0.0);
    }

    #[test]
    fn normalize_power_squares_the_linear_position() {
        // -40 dB is halfway between -80 and 0.
        assert!((normalize_power(-40.0, -80.0) - 0.25).abs() < 1e-6);
        assert!((normalize_power(-20.0, -80.0) - 0.5625).abs() < 1e-6);
    }

    #[test]
    fn normalize_power_stays_in_unit_range() {
        let mut db = -200.0;
        while db < 20.0 {
            let a = normalize_power(db, -80.0);
            assert!((0.0..=1.0).contains(&a), "{db} dB gave {a}");
            db += 0.5;
        }
    }

    #[test]
    fn tap_passes_samples_through_unchanged() {
        let input: Vec<f32> = (0..3000).map(|i| ((i % 100) as f32 - 50.0) / 50.0).collect();
        let (tap, _) = tap(2, input.clone());
        let output: Vec<f32> = tap.collect();
        assert_eq!(output, input);
    }

    #[test]
    fn tap_reports_full_scale_and_quiet_channels() {
        let frames = BLOCK_FRAMES * 2;
        let mut input = Vec::with_capacity(frames * 2);
        for _ in 0..frames {
            input.push(1.0);
            input.push(0.1);
        }
        let (tap, levels) = tap(2, input);
        tap.for_each(drop);

        assert!(levels.get(0).abs() < 0.01);
        assert!((levels.get(1) + 20.0).abs() < 0.01);
        assert_eq!(levels.get(2), SILENCE_DB);
    }

    #[test]
    fn tap_reports_silence_floor_for_zero_samples() {
        let (tap, levels) = tap(1, vec![0.0; BLOCK_FRAMES]);
        tap.for_each(drop);
        assert_eq!(levels.get(0), SILENCE_DB);
    }

    /// Plays a list of spans, each with its own channel count.
    struct Spans {
        spans: Vec<(u16, Vec<f32>)>,
        index: usize,
        pos: usize,
    }

    impl Iterator for Spans {
        type Item = f32;

        fn next(&mut self) -> Option<f32> {
            let (_, samples) = self.spans.get(self.index)?;
            let sample = *samples.get(self.pos)?;
            self.pos += 1;
            if self.pos == samples.len() && self.index + 1 < self.spans.len() {
                self.index += 1;
                self.pos = 0;
            }
            Some(sample)
        }
    }

    impl Source for Spans {
        fn current_span_len(&self) -> Option<usize> {
            Some(self.spans[self.index].1.len() - self.pos)
        }

        fn channels(&self) -> ChannelCount {
            self.spans[self.index].0
        }

        fn sample_rate(&self) -> SampleRate {
            44_100
        }

        fn total_duration(&self) -> Option<Duration> {
            None
        }
    }

    #[test]
    fn tap_follows_channel_count_changes_between_spans() {
        let mono = vec![0.5; BLOCK_FRAMES];
        let stereo: Vec<f32> = (0..BLOCK_FRAMES).flat_map(|_| [1.0, 0.0]).collect();
        let source = Spans {
            spans: vec![(1, mono), (2, stereo)],
            index: 0,
            pos: 0,
        };
        let levels = PowerLevels::default();
        let tap = MeterTap::new(source, levels.clone(), Arc::new(AtomicBool::new(true)));
        assert_eq!(tap.channels(), 1);
        tap.for_each(drop);

        // The stereo block lands on the right channels: loud left, silent right.
        assert!(levels.get(0).abs() < 0.01);
        assert_eq!(levels.get(1), SILENCE_DB);
    }

    #[test]
    fn disabled_tap_publishes_nothing() {
        let levels = PowerLevels::default();
        let source = SamplesBuffer::new(1, 44_100, vec![1.0; BLOCK_FRAMES * 2]);
        let tap = MeterTap::new(source, levels.clone(), Arc::new(AtomicBool::new(false)));
        tap.for_each(drop);
        assert_eq!(levels.get(0), SILENCE_DB);
    }
}
