use crate::{micros::UMicros, sync::lock};
use std::{
    sync::Mutex,
    time::{Duration, Instant},
};

/// The wall-clock stopwatch a [`Scheduler`](super::Scheduler) reads.
///
/// Elapsed time accumulates while started, freezes while stopped and
/// returns to zero on reset.
pub trait TimeSource: Send + Sync {
    /// Time accumulated while started
    fn elapsed(&self) -> UMicros;
    /// Begin or continue accumulating.
    fn start(&self);
    /// Freeze the accumulated time.
    fn stop(&self);
    /// Return to zero.
    fn reset(&self);
}

#[derive(Debug, Default)]
struct Stopwatch {
    started: Option<Instant>,
    accumulated: Duration,
}

impl Stopwatch {
    fn elapsed(&self) -> Duration {
        self.accumulated + self.started.map_or(Duration::ZERO, |s| s.elapsed())
    }
}

/// A [`TimeSource`] backed by [`Instant`].
#[derive(Debug, Default)]
pub struct SystemTimeSource {
    watch: Mutex<Stopwatch>,
}

impl SystemTimeSource {
    /// A stopped, zeroed stopwatch
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimeSource for SystemTimeSource {
    fn elapsed(&self) -> UMicros {
        lock(&self.watch).elapsed().into()
    }

    fn start(&self) {
        let mut watch = lock(&self.watch);
        if watch.started.is_none() {
            watch.started = Some(Instant::now());
        }
    }

    fn stop(&self) {
        let mut watch = lock(&self.watch);
        if let Some(started) = watch.started.take() {
            watch.accumulated += started.elapsed();
        }
    }

    fn reset(&self) {
        let mut watch = lock(&self.watch);
        watch.accumulated = Duration::ZERO;
        if watch.started.is_some() {
            watch.started = Some(Instant::now());
        }
    }
}

/// A [`TimeSource`] that only moves when told to.
///
/// Start and stop do nothing; the elapsed time is whatever was last set.
#[derive(Debug, Default)]
pub struct ManualTimeSource {
    elapsed: Mutex<UMicros>,
}

impl ManualTimeSource {
    /// At zero
    pub fn new() -> Self {
        Self::default()
    }

    /// Move forward by `by`.
    pub fn advance(&self, by: Duration) {
        let mut elapsed = lock(&self.elapsed);
        *elapsed += UMicros::from(by);
    }

    /// Jump to `to`.
    pub fn set(&self, to: Duration) {
        *lock(&self.elapsed) = UMicros::from(to);
    }
}

impl TimeSource for ManualTimeSource {
    fn elapsed(&self) -> UMicros {
        *lock(&self.elapsed)
    }

    fn start(&self) {}

    fn stop(&self) {}

    fn reset(&self) {
        *lock(&self.elapsed) = UMicros::ZERO;
    }
}
