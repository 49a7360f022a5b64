#![doc = r#"
Turns timer callbacks into whole MIDI ticks.

The timer fires every `interval`, which rarely lasts a whole number of ticks.
Each callback adds `ppqn * interval_ms * 1000` to a fractional accumulator and
emits as many ticks as the tempo divides out of it; the remainder carries to
the next callback, so the long-run rate is exactly `ppqn` ticks per `tempo`
microseconds.

```text
generated  = (fractional + resolution) / tempo
fractional = fractional + resolution - generated * tempo
```
"#]

mod timer;
pub use timer::*;

use crate::{file::meta::Tempo, sync::lock};
use log::{debug, info};
use std::{
    io,
    sync::{Arc, Mutex},
    time::Duration,
};
use thiserror::Error;

/// Misuse of a [`Clock`] or a failing timer.
#[derive(Debug, Error)]
pub enum ClockError {
    /// `start` or `resume` while running
    #[error("Clock is already running")]
    AlreadyRunning,
    /// `stop` while stopped
    #[error("Clock is not running")]
    NotRunning,
    /// Timer intervals must lie in 1..=1000 ms
    #[error("Timer interval {0:?} is outside 1..=1000 ms")]
    InvalidInterval(Duration),
    /// Tempo must lie in 1..=0xFFFFFF µs per quarter note
    #[error("Tempo {0} is outside 1..=16777215 µs per quarter note")]
    InvalidTempo(u32),
    /// Zero ticks per quarter note
    #[error("Ticks per quarter note must be positive")]
    InvalidPpqn,
    /// The timer service could not be armed
    #[error("Timer failed: {0}")]
    Timer(#[source] io::Error),
}

/// Settings for a [`Clock`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ClockConfig {
    /// Ticks per quarter note
    pub ppqn: u16,
    /// Time between timer callbacks, whole milliseconds
    pub interval: Duration,
    /// Microseconds per quarter note
    pub tempo: u32,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            ppqn: 480,
            interval: Duration::from_millis(10),
            tempo: Tempo::DEFAULT.micros_per_quarter_note(),
        }
    }
}

impl ClockConfig {
    /// Replace the ticks per quarter note.
    pub const fn with_ppqn(mut self, ppqn: u16) -> Self {
        self.ppqn = ppqn;
        self
    }

    /// Replace the timer interval.
    pub const fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Replace the tempo.
    pub const fn with_tempo(mut self, tempo: u32) -> Self {
        self.tempo = tempo;
        self
    }

    fn validate(&self) -> Result<(), ClockError> {
        if self.ppqn == 0 {
            return Err(ClockError::InvalidPpqn);
        }
        let ms = self.interval.as_millis();
        if !(1..=1000).contains(&ms) || self.interval.subsec_nanos() % 1_000_000 != 0 {
            return Err(ClockError::InvalidInterval(self.interval));
        }
        validate_tempo(self.tempo)
    }

    /// Accumulator units added per callback
    pub fn interval_resolution(&self) -> u64 {
        u64::from(self.ppqn) * self.interval.as_millis() as u64 * 1000
    }
}

fn validate_tempo(tempo: u32) -> Result<(), ClockError> {
    if tempo == 0 || tempo > Tempo::MAX_MICROS {
        return Err(ClockError::InvalidTempo(tempo));
    }
    Ok(())
}

/// Called once per generated tick with the new tick count.
pub type TickListener = Box<dyn FnMut(u64) + Send>;

struct Counter {
    ticks: u64,
    fractional: u64,
    tempo: u64,
    resolution: u64,
}

impl Counter {
    /// Advance by one callback; returns the first new tick and how many followed.
    fn pulse(&mut self) -> (u64, u64) {
        let total = self.fractional + self.resolution;
        let generated = total / self.tempo;
        self.fractional = total - generated * self.tempo;
        let first = self.ticks + 1;
        self.ticks += generated;
        (first, generated)
    }
}

struct Shared {
    counter: Mutex<Counter>,
    listener: Mutex<Option<TickListener>>,
}

impl Shared {
    fn pulse(&self) -> u64 {
        let (first, generated) = lock(&self.counter).pulse();
        if generated == 0 {
            return 0;
        }
        if let Some(listener) = lock(&self.listener).as_mut() {
            for tick in first..first + generated {
                listener(tick);
            }
        }
        generated
    }
}

#[doc = r#"
A tick generator driven by a [`TimerService`].

# Example
```rust
# use imuse_midi::prelude::*;
let mut clock = Clock::new(ClockConfig::default()).unwrap();
for _ in 0..100 {
    clock.pulse();
}
// 480 ppqn at 120 bpm is 960 ticks per second
assert_eq!(clock.ticks(), 960);
```
"#]
pub struct Clock {
    shared: Arc<Shared>,
    timer: Box<dyn TimerService>,
    interval: Duration,
    running: bool,
}

impl Clock {
    /// A clock driven by a [`ThreadTimer`].
    pub fn new(config: ClockConfig) -> Result<Self, ClockError> {
        Self::with_timer(config, ThreadTimer::new())
    }

    /// A clock driven by `timer`.
    pub fn with_timer(config: ClockConfig, timer: impl TimerService + 'static) -> Result<Self, ClockError> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                counter: Mutex::new(Counter {
                    ticks: 0,
                    fractional: 0,
                    tempo: u64::from(config.tempo),
                    resolution: config.interval_resolution(),
                }),
                listener: Mutex::new(None),
            }),
            timer: Box::new(timer),
            interval: config.interval,
            running: false,
        })
    }

    /// Install the per-tick listener, replacing any previous one.
    pub fn on_tick(&self, listener: impl FnMut(u64) + Send + 'static) {
        *lock(&self.shared.listener) = Some(Box::new(listener));
    }

    /// Reset the tick count and accumulator, then arm the timer.
    pub fn start(&mut self) -> Result<(), ClockError> {
        if self.running {
            return Err(ClockError::AlreadyRunning);
        }
        {
            let mut counter = lock(&self.shared.counter);
            counter.ticks = 0;
            counter.fractional = 0;
        }
        self.arm()?;
        info!("clock started");
        Ok(())
    }

    /// Arm the timer without resetting anything.
    pub fn resume(&mut self) -> Result<(), ClockError> {
        if self.running {
            return Err(ClockError::AlreadyRunning);
        }
        self.arm()?;
        info!("clock resumed at tick {}", self.ticks());
        Ok(())
    }

    /// Disarm the timer.
    pub fn stop(&mut self) -> Result<(), ClockError> {
        if !self.running {
            return Err(ClockError::NotRunning);
        }
        self.timer.disarm();
        self.running = false;
        info!("clock stopped at tick {}", self.ticks());
        Ok(())
    }

    /// Seek. A running clock is stopped around the change.
    pub fn set_ticks(&mut self, ticks: u64) -> Result<(), ClockError> {
        let was_running = self.running;
        if was_running {
            self.stop()?;
        }
        {
            let mut counter = lock(&self.shared.counter);
            counter.ticks = ticks;
            counter.fractional = 0;
        }
        debug!("clock seeked to tick {ticks}");
        if was_running {
            self.resume()?;
        }
        Ok(())
    }

    /// Ticks generated so far
    pub fn ticks(&self) -> u64 {
        lock(&self.shared.counter).ticks
    }

    /// Change the tempo, effective from the next callback.
    pub fn set_tempo(&self, tempo: u32) -> Result<(), ClockError> {
        validate_tempo(tempo)?;
        lock(&self.shared.counter).tempo = u64::from(tempo);
        debug!("clock tempo {tempo}");
        Ok(())
    }

    /// Microseconds per quarter note
    pub fn tempo(&self) -> u32 {
        lock(&self.shared.counter).tempo as u32
    }

    /// Run one timer callback by hand. Returns the ticks it generated.
    pub fn pulse(&self) -> u64 {
        self.shared.pulse()
    }

    /// True while the timer is armed
    pub fn is_running(&self) -> bool {
        self.running
    }

    fn arm(&mut self) -> Result<(), ClockError> {
        let shared = Arc::clone(&self.shared);
        self.timer.arm(
            self.interval,
            Box::new(move || {
                shared.pulse();
            }),
        )?;
        self.running = true;
        Ok(())
    }
}

impl Drop for Clock {
    fn drop(&mut self) {
        if self.running {
            self.timer.disarm();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

    /// Records arming; pulses are driven by hand.
    #[derive(Default, Clone)]
    struct ManualTimer(Arc<AtomicBool>);

    impl TimerService for ManualTimer {
        fn arm(&mut self, _: Duration, _: TimerCallback) -> Result<(), ClockError> {
            self.0.store(true, Ordering::SeqCst);
            Ok(())
        }
        fn disarm(&mut self) {
            self.0.store(false, Ordering::SeqCst);
        }
        fn is_armed(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }
    }

    fn manual(config: ClockConfig) -> (Clock, ManualTimer) {
        let timer = ManualTimer::default();
        (Clock::with_timer(config, timer.clone()).unwrap(), timer)
    }

    #[test]
    fn no_drift_over_many_callbacks() {
        let (clock, _) = manual(ClockConfig::default());
        for _ in 0..10_000 {
            clock.pulse();
        }
        // 100 s at 960 ticks per second
        assert_eq!(clock.ticks(), 96_000);
    }

    #[test]
    fn remainders_carry_between_callbacks() {
        let config = ClockConfig::default()
            .with_ppqn(96)
            .with_interval(Duration::from_millis(7))
            .with_tempo(650_000);
        let (clock, _) = manual(config);
        let per_callback: Vec<u64> = (0..1000).map(|_| clock.pulse()).collect();
        assert_eq!(clock.ticks(), 1000 * config.interval_resolution() / 650_000);
        assert!(per_callback.iter().all(|n| *n == 1 || *n == 2));
    }

    #[test]
    fn listener_sees_every_tick() {
        let (clock, _) = manual(ClockConfig::default());
        let last = Arc::new(AtomicU64::new(0));
        let count = Arc::new(AtomicU64::new(0));
        let (l, c) = (last.clone(), count.clone());
        clock.on_tick(move |tick| {
            l.store(tick, Ordering::SeqCst);
            c.fetch_add(1, Ordering::SeqCst);
        });
        for _ in 0..10 {
            clock.pulse();
        }
        assert_eq!(count.load(Ordering::SeqCst), 96);
        assert_eq!(last.load(Ordering::SeqCst), 96);
    }

    #[test]
    fn start_resets_and_resume_does_not() {
        let (mut clock, timer) = manual(ClockConfig::default());
        clock.start().unwrap();
        assert!(timer.is_armed());
        clock.pulse();
        clock.stop().unwrap();
        assert!(!timer.is_armed());

        clock.resume().unwrap();
        clock.pulse();
        assert_eq!(clock.ticks(), 19);
        clock.stop().unwrap();

        clock.start().unwrap();
        assert_eq!(clock.ticks(), 0);
    }

    #[test]
    fn seeking_a_running_clock_keeps_it_running() {
        let (mut clock, timer) = manual(ClockConfig::default());
        clock.start().unwrap();
        clock.set_ticks(1000).unwrap();
        assert!(clock.is_running());
        assert!(timer.is_armed());
        assert_eq!(clock.ticks(), 1000);
    }

    #[test]
    fn state_errors() {
        let (mut clock, _) = manual(ClockConfig::default());
        assert!(matches!(clock.stop(), Err(ClockError::NotRunning)));
        clock.start().unwrap();
        assert!(matches!(clock.start(), Err(ClockError::AlreadyRunning)));
        assert!(matches!(clock.resume(), Err(ClockError::AlreadyRunning)));
    }

    #[test]
    fn config_is_validated() {
        let bad = [
            ClockConfig::default().with_interval(Duration::ZERO),
            ClockConfig::default().with_interval(Duration::from_millis(1001)),
            ClockConfig::default().with_tempo(0),
            ClockConfig::default().with_tempo(0x0100_0000),
            ClockConfig::default().with_ppqn(0),
        ];
        for config in bad {
            assert!(Clock::with_timer(config, ManualTimer::default()).is_err());
        }
        let (clock, _) = manual(ClockConfig::default());
        assert!(matches!(clock.set_tempo(0), Err(ClockError::InvalidTempo(0))));
    }

    #[test]
    fn thread_timer_drives_the_clock() {
        let config = ClockConfig::default().with_interval(Duration::from_millis(1));
        let mut clock = Clock::new(config).unwrap();
        clock.start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        clock.stop().unwrap();
        assert!(clock.ticks() > 0);
    }
}
