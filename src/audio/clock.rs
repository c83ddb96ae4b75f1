//! Repeating schedules that drive the metering and progress cadences.
//!
//! The engine only sees the [`Clock`] trait. [`ThreadClock`] runs each
//! schedule on its own thread and hands ticks to a delivery function (in the
//! player, a send onto the engine channel), so every tick is handled on the
//! engine thread. A tick that is still waiting to be handled makes the
//! schedule drop the next one instead of queueing it.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum TickKind {
    /// Fast cadence feeding the amplitude signal.
    Meter,
    /// Slower cadence feeding progress and end-of-track inference.
    Progress,
}

impl TickKind {
    fn slot(self) -> usize {
        match self {
            Self::Meter => 0,
            Self::Progress => 1,
        }
    }
}

/// One invocation of a schedule.
///
/// Holding a `Tick` marks its schedule as busy; dropping it (after the
/// engine handled it) lets the next one through.
#[derive(Debug)]
pub struct Tick {
    pub kind: TickKind,
    /// Session generation the schedule was started for.
    pub generation: u64,
    _in_flight: Option<InFlight>,
}

impl Tick {
    /// A tick that is not tied to a running schedule.
    pub fn new(kind: TickKind, generation: u64) -> Self {
        Self {
            kind,
            generation,
            _in_flight: None,
        }
    }
}

#[derive(Debug)]
struct InFlight(Arc<AtomicBool>);

impl Drop for InFlight {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

pub trait Clock {
    /// Start (or restart) the schedule for `kind`. A running schedule of the
    /// same kind is cancelled first.
    fn start(&mut self, kind: TickKind, period: Duration, generation: u64);
    fn cancel(&mut self, kind: TickKind);
    fn is_running(&self, kind: TickKind) -> bool;

    fn cancel_all(&mut self) {
        self.cancel(TickKind::Meter);
        self.cancel(TickKind::Progress);
    }
}

type Deliver = Arc<dyn Fn(Tick) -> bool + Send + Sync>;

struct Schedule {
    cancelled: Arc<AtomicBool>,
}

impl Drop for Schedule {
    fn drop(&mut self) {
        self.cancelled.store(true, Ordering::Release);
    }
}

/// Thread-backed [`Clock`].
pub struct ThreadClock {
    deliver: Deliver,
    schedules: [Option<Schedule>; 2],
}

impl ThreadClock {
    /// `deliver` returns `false` once nobody listens anymore, which ends the
    /// schedule thread.
    pub fn new<F>(deliver: F) -> Self
    where
        F: Fn(Tick) -> bool + Send + Sync + 'static,
    {
        Self {
            deliver: Arc::new(deliver),
            schedules: [None, None],
        }
    }
}

impl Clock for ThreadClock {
    fn start(&mut self, kind: TickKind, period: Duration, generation: u64) {
        self.cancel(kind);

        let cancelled = Arc::new(AtomicBool::new(false));
        let deliver = self.deliver.clone();
        let flag = cancelled.clone();
        let spawned = thread::Builder::new()
            .name(format!("meterplay-{kind:?}-tick").to_lowercase())
            .spawn(move || run_schedule(kind, period, generation, flag, deliver));

        match spawned {
            Ok(_) => self.schedules[kind.slot()] = Some(Schedule { cancelled }),
            Err(e) => warn!(?kind, error = %e, "failed to spawn tick thread"),
        }
    }

    fn cancel(&mut self, kind: TickKind) {
        // Dropping the schedule flags its thread to exit.
        self.schedules[kind.slot()] = None;
    }

    fn is_running(&self, kind: TickKind) -> bool {
        self.schedules[kind.slot()].is_some()
    }
}

impl Drop for ThreadClock {
    fn drop(&mut self) {
        self.cancel_all();
    }
}

fn run_schedule(
    kind: TickKind,
    period: Duration,
    generation: u64,
    cancelled: Arc<AtomicBool>,
    deliver: Deliver,
) {
    let period = period.max(Duration::from_millis(1));
    let in_flight = Arc::new(AtomicBool::new(false));
    let mut next = Instant::now() + period;

    loop {
        let now = Instant::now();
        if next > now {
            thread::sleep(next - now);
        }
        next += period;
        // Fell behind (e.g. the process was suspended): skip the missed ticks.
        let now = Instant::now();
        if next < now {
            next = now + period;
        }

        if cancelled.load(Ordering::Acquire) {
            break;
        }
        if in_flight.swap(true, Ordering::AcqRel) {
            trace!(?kind, generation, "tick dropped, previous one still pending");
            continue;
        }

        let tick = Tick {
            kind,
            generation,
            _in_flight: Some(InFlight(in_flight.clone())),
        };
        if !deliver(tick) {
            break;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::sync::mpsc;

    fn channel_clock() -> (ThreadClock, mpsc::Receiver<Tick>) {
        let (tx, rx) = mpsc::channel::<Tick>();
        let clock = ThreadClock::new(move |tick| tx.send(tick).is_ok());
        (clock, rx)
    }

    #[test]
    fn delivers_ticks_tagged_with_kind_and_generation() {
        let (mut clock, rx) = channel_clock();
        clock.start(TickKind::Meter, Duration::from_millis(5), 7);
        assert!(clock.is_running(TickKind::Meter));
        assert!(!clock.is_running(TickKind::Progress));

        let tick = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(tick.kind, TickKind::Meter);
        assert_eq!(tick.generation, 7);
    }

    #[test]
    fn cancel_stops_delivery() {
        let (mut clock, rx) = channel_clock();
        clock.start(TickKind::Progress, Duration::from_millis(5), 1);
        rx.recv_timeout(Duration::from_secs(2)).unwrap();

        clock.cancel(TickKind::Progress);
        assert!(!clock.is_running(TickKind::Progress));

        // Let any tick that raced the cancellation land, then expect silence.
        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}
        thread::sleep(Duration::from_millis(50));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn restarting_a_schedule_replaces_the_previous_one() {
        let (mut clock, rx) = channel_clock();
        clock.start(TickKind::Meter, Duration::from_millis(5), 1);
        clock.start(TickKind::Meter, Duration::from_millis(5), 2);

        thread::sleep(Duration::from_millis(30));
        while rx.try_recv().is_ok() {}

        for _ in 0..5 {
            let tick = rx.recv_timeout(Duration::from_secs(2)).unwrap();
            assert_eq!(tick.generation, 2);
        }
    }

    #[test]
    fn pending_tick_drops_later_ones_instead_of_queueing() {
        let held: Arc<Mutex<Vec<Tick>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = held.clone();
        let mut clock = ThreadClock::new(move |tick| {
            sink.lock().unwrap().push(tick);
            true
        });

        clock.start(TickKind::Meter, Duration::from_millis(2), 1);
        thread::sleep(Duration::from_millis(60));
        assert_eq!(held.lock().unwrap().len(), 1);

        // Handling (dropping) the pending tick lets the schedule continue.
        held.lock().unwrap().clear();
        thread::sleep(Duration::from_millis(60));
        assert_eq!(held.lock().unwrap().len(), 1);
        clock.cancel_all();
    }
}
