//! `rodio`-backed media backend.
//!
//! A session is one `Sink` holding the decoded file (wrapped in a level
//! meter) followed by an `EmptyCallback` that reports completion once the
//! file has drained.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use rodio::source::{EmptyCallback, SeekError};
use rodio::mixer::Mixer;
use rodio::{ChannelCount, Decoder, OutputStream, OutputStreamBuilder, SampleRate, Sink, Source};
use tracing::debug;

use crate::error::PlaybackError;
use crate::library::MediaResolver;

use super::backend::{MediaBackend, OutputActivator, Session, SessionEvents};
use super::meter::{MeterTap, PowerLevels};

/// A stream ending this much before its advertised duration counts as a
/// decode failure rather than a natural end.
const TRUNCATION_SLACK: Duration = Duration::from_secs(2);

pub struct RodioBackend {
    stream: Option<OutputStream>,
    resolver: MediaResolver,
}

impl RodioBackend {
    /// The output device is opened lazily, on first activation.
    pub fn new(resolver: MediaResolver) -> Self {
        Self {
            stream: None,
            resolver,
        }
    }
}

impl OutputActivator for RodioBackend {
    fn activate(&mut self) -> Result<(), PlaybackError> {
        if self.stream.is_some() {
            return Ok(());
        }
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| PlaybackError::OutputActivation(e.to_string()))?;
        // rodio logs to stderr when OutputStream is dropped; we have tracing for that.
        stream.log_on_drop(false);
        debug!("audio output opened");
        self.stream = Some(stream);
        Ok(())
    }
}

impl MediaBackend for RodioBackend {
    type Session = RodioSession;

    fn resolve(&self, locator: &str) -> Result<PathBuf, PlaybackError> {
        self.resolver.resolve(locator)
    }

    fn open(
        &mut self,
        resource: &Path,
        events: SessionEvents,
    ) -> Result<RodioSession, PlaybackError> {
        self.activate()?;
        let Some(stream) = self.stream.as_ref() else {
            return Err(PlaybackError::OutputActivation(
                "no output stream".to_string(),
            ));
        };
        RodioSession::open(stream, resource, events)
    }
}

pub struct RodioSession {
    mixer: Mixer,
    sink: Sink,
    /// Set by the completion marker of the queued file.
    completed: Arc<AtomicBool>,
    path: PathBuf,
    levels: PowerLevels,
    metering: Arc<AtomicBool>,
    duration: Option<Duration>,
    events: SessionEvents,
}

impl RodioSession {
    fn open(
        stream: &OutputStream,
        path: &Path,
        events: SessionEvents,
    ) -> Result<Self, PlaybackError> {
        let mixer = stream.mixer().clone();
        let sink = Sink::connect_new(&mixer);
        sink.pause();

        let mut session = Self {
            mixer,
            sink,
            completed: Arc::new(AtomicBool::new(false)),
            path: path.to_path_buf(),
            levels: PowerLevels::default(),
            metering: Arc::new(AtomicBool::new(false)),
            duration: None,
            events,
        };
        session.duration = session.enqueue()?;
        Ok(session)
    }

    fn decode_init_error(&self, reason: impl ToString) -> PlaybackError {
        PlaybackError::DecodeInit {
            locator: self.path.display().to_string(),
            reason: reason.to_string(),
        }
    }

    /// Queue the decoded file followed by the completion marker. Returns the
    /// decoder's idea of the total duration.
    fn enqueue(&mut self) -> Result<Option<Duration>, PlaybackError> {
        let file = File::open(&self.path).map_err(|e| self.decode_init_error(e))?;
        let decoder =
            Decoder::new(BufReader::new(file)).map_err(|e| self.decode_init_error(e))?;
        let total = decoder.total_duration();

        let failed = Arc::new(AtomicBool::new(false));
        let watched = StreamWatch::new(decoder, self.events.clone(), failed.clone());
        self.sink.append(MeterTap::new(
            watched,
            self.levels.clone(),
            self.metering.clone(),
        ));

        self.completed = Arc::new(AtomicBool::new(false));
        self.sink.append(completion_marker(
            self.events.clone(),
            failed,
            self.completed.clone(),
        ));

        debug!(path = %self.path.display(), ?total, "source queued");
        Ok(total)
    }

    /// Swap in a fresh sink holding the file from the start, keeping the
    /// play/pause state. Never waits on the audio thread.
    fn requeue(&mut self) -> Result<(), PlaybackError> {
        let paused = self.sink.is_paused();
        self.sink.stop();
        self.sink = Sink::connect_new(&self.mixer);
        self.sink.pause();
        self.levels.clear();

        let total = self.enqueue()?;
        self.duration = total.or(self.duration);
        if !paused {
            self.sink.play();
        }
        Ok(())
    }
}

/// Source that ends the queue: records completion, then reports it unless
/// the stream before it failed.
fn completion_marker(
    events: SessionEvents,
    failed: Arc<AtomicBool>,
    completed: Arc<AtomicBool>,
) -> EmptyCallback {
    EmptyCallback::new(Box::new(move || {
        completed.store(true, Ordering::Release);
        if !failed.load(Ordering::Acquire) {
            events.finished();
        }
    }))
}

/// A sink whose file has finished (or is finishing) cannot serve a seek:
/// nothing is left on it to answer the request.
fn needs_requeue(position: Duration, completed: bool, drained: bool) -> bool {
    position.is_zero() || completed || drained
}

impl Session for RodioSession {
    fn play(&mut self) {
        self.sink.play();
    }

    fn pause(&mut self) {
        self.sink.pause();
    }

    fn seek(&mut self, position: Duration) -> Result<(), PlaybackError> {
        let completed = self.completed.load(Ordering::Acquire);
        if needs_requeue(position, completed, self.sink.empty()) {
            self.requeue()?;
            if position.is_zero() {
                return Ok(());
            }
        }
        self.sink
            .try_seek(position)
            .map_err(|e| PlaybackError::FatalDecode(format!("seek failed: {e}")))
    }

    fn current_time(&self) -> Duration {
        self.sink.get_pos()
    }

    fn duration(&self) -> Option<Duration> {
        self.duration
    }

    fn is_active(&self) -> bool {
        !self.sink.is_paused() && !self.sink.empty()
    }

    fn set_metering_enabled(&mut self, enabled: bool) {
        self.metering.store(enabled, Ordering::Relaxed);
        if !enabled {
            self.levels.clear();
        }
    }

    fn channel_power(&self, channel: usize) -> f32 {
        self.levels.get(channel)
    }

    fn stop(&mut self) {
        self.sink.stop();
    }
}

/// Passes samples through and reports a decode failure when the stream
/// ends well short of its advertised duration.
struct StreamWatch<S> {
    inner: S,
    events: SessionEvents,
    failed: Arc<AtomicBool>,
    total: Option<Duration>,
    channels: ChannelCount,
    sample_rate: SampleRate,
    samples: u64,
    ended: bool,
}

impl<S> StreamWatch<S>
where
    S: Source<Item = f32>,
{
    fn new(inner: S, events: SessionEvents, failed: Arc<AtomicBool>) -> Self {
        let total = inner.total_duration();
        let channels = inner.channels().max(1);
        let sample_rate = inner.sample_rate().max(1);
        Self {
            inner,
            events,
            failed,
            total,
            channels,
            sample_rate,
            samples: 0,
            ended: false,
        }
    }

    fn played(&self) -> Duration {
        let per_second = f64::from(self.channels) * f64::from(self.sample_rate);
        Duration::from_secs_f64(self.samples as f64 / per_second)
    }

    fn on_end(&mut self) {
        if self.ended {
            return;
        }
        self.ended = true;

        let Some(total) = self.total else {
            return;
        };
        let played = self.played();
        if is_truncated(played, total) {
            self.failed.store(true, Ordering::Release);
            self.events.decode_error(format!(
                "stream ended at {:.1}s of {:.1}s",
                played.as_secs_f64(),
                total.as_secs_f64()
            ));
        }
    }
}

fn is_truncated(played: Duration, total: Duration) -> bool {
    played + TRUNCATION_SLACK < total && played.as_secs_f64() < total.as_secs_f64() * 0.9
}

impl<S> Iterator for StreamWatch<S>
where
    S: Source<Item = f32>,
{
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        match self.inner.next() {
            Some(sample) => {
                self.samples += 1;
                Some(sample)
            }
            None => {
                self.on_end();
                None
            }
        }
    }
}

impl<S> Source for StreamWatch<S>
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
        let per_second = f64::from(self.channels) * f64::from(self.sample_rate);
        self.samples = (pos.as_secs_f64() * per_second) as u64;
        self.ended = false;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::types::SessionEvent;
    use rodio::buffer::SamplesBuffer;
    use std::sync::Mutex;

    /// A source that lies about its length, like a truncated file.
    struct Claims<S> {
        inner: S,
        total: Duration,
    }

    impl<S: Source<Item = f32>> Iterator for Claims<S> {
        type Item = f32;
        fn next(&mut self) -> Option<f32> {
            self.inner.next()
        }
    }

    impl<S: Source<Item = f32>> Source for Claims<S> {
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
            Some(self.total)
        }
    }

    fn recording_events() -> (SessionEvents, Arc<Mutex<Vec<SessionEvent>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = seen.clone();
        let events = SessionEvents::new(
            3,
            Arc::new(move |generation: u64, event: SessionEvent| {
                assert_eq!(generation, 3);
                sink.lock().unwrap().push(event);
            }),
        );
        (events, seen)
    }

    #[test]
    fn completion_marker_records_and_reports_the_end() {
        let (events, seen) = recording_events();
        let failed = Arc::new(AtomicBool::new(false));
        let completed = Arc::new(AtomicBool::new(false));
        let mut marker = completion_marker(events, failed, completed.clone());

        assert!(marker.next().is_none());
        assert!(completed.load(Ordering::Acquire));
        assert_eq!(*seen.lock().unwrap(), vec![SessionEvent::Finished]);
    }

    #[test]
    fn completion_marker_stays_quiet_after_a_failed_stream() {
        let (events, seen) = recording_events();
        let failed = Arc::new(AtomicBool::new(true));
        let completed = Arc::new(AtomicBool::new(false));
        let mut marker = completion_marker(events, failed, completed.clone());

        assert!(marker.next().is_none());
        assert!(completed.load(Ordering::Acquire));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn rewinds_and_finished_files_never_seek_in_place() {
        let mid = Duration::from_secs(30);
        assert!(needs_requeue(Duration::ZERO, false, false));
        // Completion reported while the sink still counts the marker.
        assert!(needs_requeue(mid, true, false));
        assert!(needs_requeue(mid, false, true));
        assert!(!needs_requeue(mid, false, false));
    }

    #[test]
    fn truncation_needs_a_real_shortfall() {
        let secs = Duration::from_secs;
        assert!(is_truncated(secs(10), secs(200)));
        assert!(!is_truncated(secs(199), secs(200)));
        assert!(!is_truncated(secs(0), secs(1)));
    }

    #[test]
    fn complete_stream_reports_nothing() {
        let (events, seen) = recording_events();
        let failed = Arc::new(AtomicBool::new(false));
        let source = SamplesBuffer::new(1, 1_000, vec![0.5; 1_000]);
        let watch = StreamWatch::new(source, events, failed.clone());

        assert_eq!(watch.count(), 1_000);
        assert!(!failed.load(Ordering::Acquire));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn short_stream_reports_decode_error_once() {
        let (events, seen) = recording_events();
        let failed = Arc::new(AtomicBool::new(false));
        let source = Claims {
            inner: SamplesBuffer::new(2, 1_000, vec![0.5; 2_000]),
            total: Duration::from_secs(60),
        };
        let mut watch = StreamWatch::new(source, events, failed.clone());

        while watch.next().is_some() {}
        assert!(watch.next().is_none());

        assert!(failed.load(Ordering::Acquire));
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(matches!(seen[0], SessionEvent::DecodeError(_)));
    }
}
