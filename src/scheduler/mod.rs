#![doc = r#"
Tick-addressed dispatch on a background thread with live tempo changes.

A [`Scheduler`] keeps a [`ScheduleQueue`] of items keyed by tick and a
dispatch thread that hands each slice to a callback once the wall clock
reaches it. Logical time is derived from a [`TimeSource`] stopwatch:

```text
ticks = (elapsed + offset) * ppqn / tempo
```

Changing the tempo rescales `offset` so the current tick does not jump:

```text
offset' = (elapsed + offset) * tempo' / tempo - elapsed
```

The rescaled logical time is raised to the first microsecond of the current
tick when integer division would otherwise put it one tick earlier.

Three locks guard disjoint state: the timing (tempo and offset), the run
state (the dispatch thread handle) and the queue with its wake condition.
A tick query never waits on queue traffic and the reverse.

Inside the callback, [`SchedulerHandle::time_in_ticks`] returns the tick of
the slice being dispatched rather than a wall-clock reading, so work chained
from a callback lands exactly where intended.
"#]

mod queue;
pub use queue::*;

mod time;
pub use time::*;

use crate::{
    file::meta::Tempo,
    micros::{Micros, UMicros},
    sync::lock,
};
use log::{debug, info, trace};
use std::{
    cell::Cell,
    io,
    sync::{
        Arc, Condvar, Mutex, PoisonError,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
    thread::{self, JoinHandle},
    time::Duration,
};
use thiserror::Error;

/// Misuse of a [`Scheduler`] or a failure of its thread.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// `start` while running
    #[error("Scheduler is already running")]
    AlreadyRunning,
    /// `stop` while stopped
    #[error("Scheduler is not running")]
    NotRunning,
    /// `stop` from inside the dispatch callback
    #[error("Scheduler cannot be stopped from its own dispatch thread")]
    StopFromDispatchThread,
    /// `reset` while running
    #[error("Scheduler must be stopped before it is reset")]
    ResetWhileRunning,
    /// Tempo outside 1..=0xFFFFFF µs per quarter note
    #[error("Tempo {0} is outside 1..=16777215 µs per quarter note")]
    TempoOutOfRange(u32),
    /// Zero ticks per quarter note
    #[error("Ticks per quarter note must be positive")]
    InvalidPpqn,
    /// Any call after `dispose`
    #[error("Scheduler has been disposed")]
    Disposed,
    /// The dispatch thread could not be spawned
    #[error("Could not spawn the dispatch thread: {0}")]
    Spawn(#[source] io::Error),
    /// The dispatch callback panicked
    #[error("The dispatch callback panicked")]
    DispatchPanicked,
}

/// Settings for a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SchedulerConfig {
    /// Ticks per quarter note
    pub ticks_per_quarter_note: u16,
    /// Initial microseconds per quarter note
    pub tempo: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            ticks_per_quarter_note: 480,
            tempo: Tempo::DEFAULT.micros_per_quarter_note(),
        }
    }
}

/// The callback a scheduler dispatches slices to.
pub type SliceHandler<T> = Box<dyn FnMut(&SchedulerHandle<T>, u64, Vec<T>) + Send>;

fn validate_tempo(tempo: u32) -> Result<(), SchedulerError> {
    if tempo == 0 || tempo > Tempo::MAX_MICROS {
        return Err(SchedulerError::TempoOutOfRange(tempo));
    }
    Ok(())
}

static NEXT_ID: AtomicUsize = AtomicUsize::new(1);

#[derive(Clone, Copy)]
struct Dispatch {
    scheduler: usize,
    tick: Option<u64>,
}

thread_local! {
    static DISPATCH: Cell<Option<Dispatch>> = const { Cell::new(None) };
}

fn dispatch_context(scheduler: usize) -> Option<Dispatch> {
    DISPATCH
        .get()
        .filter(|d| d.scheduler == scheduler)
}

struct TimingState {
    tempo: u32,
    offset: Micros,
}

struct QueueState<T> {
    slices: ScheduleQueue<T>,
    stop: bool,
}

struct Shared<T> {
    id: usize,
    ppqn: u16,
    source: Arc<dyn TimeSource>,
    timing: Mutex<TimingState>,
    run: Mutex<Option<JoinHandle<()>>>,
    queue: Mutex<QueueState<T>>,
    wake: Condvar,
    disposed: AtomicBool,
    handler: Mutex<SliceHandler<T>>,
}

/// Earliest logical microsecond at which `tick` has been reached.
fn tick_start(tick: u64, tempo: u32, ppqn: u16) -> i128 {
    let ppqn = i128::from(ppqn);
    (i128::from(tick) * i128::from(tempo) + ppqn - 1) / ppqn
}

fn ticks_at(elapsed: UMicros, timing: &TimingState, ppqn: u16) -> u64 {
    let logical = (elapsed + timing.offset).us();
    if logical <= 0 {
        return 0;
    }
    (i128::from(logical) * i128::from(ppqn) / i128::from(timing.tempo)) as u64
}

impl<T: Send + 'static> Shared<T> {
    fn on_dispatch_thread(&self) -> bool {
        dispatch_context(self.id).is_some()
    }

    fn is_running(&self) -> bool {
        self.on_dispatch_thread()
            || lock(&self.run)
                .as_ref()
                .is_some_and(|thread| !thread.is_finished())
    }

    fn time_in_ticks(&self) -> u64 {
        if let Some(tick) = dispatch_context(self.id).and_then(|d| d.tick) {
            return tick;
        }
        let timing = lock(&self.timing);
        ticks_at(self.source.elapsed(), &timing, self.ppqn)
    }

    fn tempo(&self) -> u32 {
        lock(&self.timing).tempo
    }

    fn set_tempo(&self, tempo: u32) -> Result<(), SchedulerError> {
        validate_tempo(tempo)?;
        {
            let mut timing = lock(&self.timing);
            let elapsed = self.source.elapsed();
            let logical = elapsed + timing.offset;
            let mut rescaled = logical.mul_div(i64::from(tempo), i64::from(timing.tempo));
            if logical.us() > 0 {
                // flooring may land just before the current tick's first microsecond
                let current = ticks_at(elapsed, &timing, self.ppqn);
                let floor = tick_start(current, tempo, self.ppqn);
                rescaled = rescaled.max(Micros::new(i64::try_from(floor).unwrap_or(i64::MAX)));
            }
            timing.offset = rescaled - elapsed;
            timing.tempo = tempo;
        }
        debug!("scheduler tempo {tempo}");
        let _queue = lock(&self.queue);
        self.wake.notify_all();
        Ok(())
    }

    fn schedule(&self, tick: u64, item: T) -> Result<(), SchedulerError> {
        if self.disposed.load(Ordering::Acquire) {
            return Err(SchedulerError::Disposed);
        }
        lock(&self.queue).slices.insert(tick, item);
        self.wake.notify_all();
        Ok(())
    }

    /// Wall-clock wait until `tick` is due.
    fn delay_until(&self, tick: u64) -> Duration {
        let timing = lock(&self.timing);
        let due = tick_start(tick, timing.tempo, self.ppqn);
        let remaining =
            due - i128::from(timing.offset.us()) - i128::from(self.source.elapsed().us());
        if remaining <= 0 {
            return Duration::ZERO;
        }
        Duration::from_micros(u64::try_from(remaining).unwrap_or(u64::MAX))
    }

    /// Block until a slice is due or a stop is requested.
    fn next_due(&self) -> Option<Slice<T>> {
        let mut queue = lock(&self.queue);
        loop {
            if queue.stop {
                return None;
            }
            let Some(time) = queue.slices.peek_time() else {
                queue = self.wake.wait(queue).unwrap_or_else(PoisonError::into_inner);
                continue;
            };
            let delay = self.delay_until(time);
            if delay.is_zero() {
                return queue.slices.pop();
            }
            queue = self
                .wake
                .wait_timeout(queue, delay)
                .unwrap_or_else(PoisonError::into_inner)
                .0;
        }
    }
}

fn dispatch_loop<T: Send + 'static>(shared: Arc<Shared<T>>) {
    let id = shared.id;
    DISPATCH.set(Some(Dispatch {
        scheduler: id,
        tick: None,
    }));
    let handle = SchedulerHandle {
        shared: Arc::clone(&shared),
    };
    while let Some(slice) = shared.next_due() {
        let time = slice.time();
        trace!("dispatching {} items at tick {time}", slice.items().len());
        DISPATCH.set(Some(Dispatch {
            scheduler: id,
            tick: Some(time),
        }));
        let mut handler = lock(&shared.handler);
        (*handler)(&handle, time, slice.into_items());
        drop(handler);
        DISPATCH.set(Some(Dispatch {
            scheduler: id,
            tick: None,
        }));
    }
    DISPATCH.set(None);
}

/// A cloneable reference to a [`Scheduler`] for scheduling and time queries.
///
/// The dispatch callback receives one. Holding a handle does not keep the
/// dispatch thread alive.
pub struct SchedulerHandle<T> {
    shared: Arc<Shared<T>>,
}

impl<T> Clone for SchedulerHandle<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Send + 'static> SchedulerHandle<T> {
    /// Queue `item` for dispatch at `tick`. Past ticks dispatch immediately.
    pub fn schedule(&self, tick: u64, item: T) -> Result<(), SchedulerError> {
        self.shared.schedule(tick, item)
    }

    /// The current logical tick.
    ///
    /// On the dispatch thread this is the tick of the slice being dispatched.
    pub fn time_in_ticks(&self) -> u64 {
        self.shared.time_in_ticks()
    }

    /// Change the tempo without moving the current tick.
    pub fn set_tempo(&self, tempo: u32) -> Result<(), SchedulerError> {
        self.shared.set_tempo(tempo)
    }

    /// Microseconds per quarter note
    pub fn tempo(&self) -> u32 {
        self.shared.tempo()
    }

    /// Ticks per quarter note
    pub fn ticks_per_quarter_note(&self) -> u16 {
        self.shared.ppqn
    }

    /// True while the dispatch thread runs
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }
}

#[doc = r#"
Dispatches scheduled items at their tick on a dedicated thread.

# Example
```rust
# use imuse_midi::prelude::*;
# use std::time::Duration;
let (tx, rx) = crossbeam_channel::unbounded();
let scheduler = Scheduler::new(SchedulerConfig::default(), move |_, tick, items: Vec<&str>| {
    tx.send((tick, items)).unwrap();
})
.unwrap();

scheduler.schedule(0, "first").unwrap();
scheduler.start().unwrap();
assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), (0, vec!["first"]));
scheduler.stop().unwrap();
```
"#]
pub struct Scheduler<T: Send + 'static> {
    shared: Arc<Shared<T>>,
}

impl<T: Send + 'static> Scheduler<T> {
    /// A stopped scheduler timed by the system clock.
    pub fn new(
        config: SchedulerConfig,
        handler: impl FnMut(&SchedulerHandle<T>, u64, Vec<T>) + Send + 'static,
    ) -> Result<Self, SchedulerError> {
        Self::with_time_source(config, Arc::new(SystemTimeSource::new()), handler)
    }

    /// A stopped scheduler timed by `source`.
    pub fn with_time_source(
        config: SchedulerConfig,
        source: Arc<dyn TimeSource>,
        handler: impl FnMut(&SchedulerHandle<T>, u64, Vec<T>) + Send + 'static,
    ) -> Result<Self, SchedulerError> {
        if config.ticks_per_quarter_note == 0 {
            return Err(SchedulerError::InvalidPpqn);
        }
        validate_tempo(config.tempo)?;
        Ok(Self {
            shared: Arc::new(Shared {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                ppqn: config.ticks_per_quarter_note,
                source,
                timing: Mutex::new(TimingState {
                    tempo: config.tempo,
                    offset: Micros::ZERO,
                }),
                run: Mutex::new(None),
                queue: Mutex::new(QueueState {
                    slices: ScheduleQueue::new(),
                    stop: false,
                }),
                wake: Condvar::new(),
                disposed: AtomicBool::new(false),
                handler: Mutex::new(Box::new(handler)),
            }),
        })
    }

    /// A handle for scheduling from other threads
    pub fn handle(&self) -> SchedulerHandle<T> {
        SchedulerHandle {
            shared: Arc::clone(&self.shared),
        }
    }

    /// Start the stopwatch and the dispatch thread.
    pub fn start(&self) -> Result<(), SchedulerError> {
        if self.shared.disposed.load(Ordering::Acquire) {
            return Err(SchedulerError::Disposed);
        }
        let mut run = lock(&self.shared.run);
        if run.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }
        lock(&self.shared.queue).stop = false;
        self.shared.source.start();

        let shared = Arc::clone(&self.shared);
        let thread = thread::Builder::new()
            .name("midi-scheduler".into())
            .spawn(move || dispatch_loop(shared))
            .map_err(|e| {
                self.shared.source.stop();
                SchedulerError::Spawn(e)
            })?;
        *run = Some(thread);
        info!("scheduler started at tick {}", self.shared.time_in_ticks());
        Ok(())
    }

    /// Stop the dispatch thread and wait for it to exit.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        if self.shared.on_dispatch_thread() {
            return Err(SchedulerError::StopFromDispatchThread);
        }
        let mut run = lock(&self.shared.run);
        let thread = run.take().ok_or(SchedulerError::NotRunning)?;
        lock(&self.shared.queue).stop = true;
        self.shared.wake.notify_all();
        let joined = thread.join();
        self.shared.source.stop();
        info!("scheduler stopped at tick {}", self.shared.time_in_ticks());
        joined.map_err(|_| SchedulerError::DispatchPanicked)
    }

    /// Clear the queue and return logical time to zero. Only while stopped.
    pub fn reset(&self) -> Result<(), SchedulerError> {
        let run = lock(&self.shared.run);
        if run.is_some() {
            return Err(SchedulerError::ResetWhileRunning);
        }
        lock(&self.shared.queue).slices.clear();
        lock(&self.shared.timing).offset = Micros::ZERO;
        self.shared.source.reset();
        debug!("scheduler reset");
        Ok(())
    }

    /// Stop and reset if needed, then refuse further use. Repeat calls do nothing.
    pub fn dispose(&self) -> Result<(), SchedulerError> {
        if self.shared.disposed.load(Ordering::Acquire) {
            return Ok(());
        }
        let stopped = if lock(&self.shared.run).is_some() {
            self.stop()
        } else {
            Ok(())
        };
        if let Err(SchedulerError::StopFromDispatchThread) = stopped {
            return stopped;
        }
        self.reset()?;
        self.shared.disposed.store(true, Ordering::Release);
        debug!("scheduler disposed");
        stopped
    }

    /// See [`SchedulerHandle::schedule`].
    pub fn schedule(&self, tick: u64, item: T) -> Result<(), SchedulerError> {
        self.shared.schedule(tick, item)
    }

    /// See [`SchedulerHandle::time_in_ticks`].
    pub fn time_in_ticks(&self) -> u64 {
        self.shared.time_in_ticks()
    }

    /// See [`SchedulerHandle::set_tempo`].
    pub fn set_tempo(&self, tempo: u32) -> Result<(), SchedulerError> {
        self.shared.set_tempo(tempo)
    }

    /// Microseconds per quarter note
    pub fn tempo(&self) -> u32 {
        self.shared.tempo()
    }

    /// True while the dispatch thread runs
    pub fn is_running(&self) -> bool {
        self.shared.is_running()
    }

    /// Items waiting for dispatch
    pub fn pending(&self) -> usize {
        lock(&self.shared.queue).slices.item_count()
    }
}

impl<T: Send + 'static> Drop for Scheduler<T> {
    fn drop(&mut self) {
        if let Err(e) = self.dispose() {
            log::warn!("scheduler dropped uncleanly: {e}");
        }
    }
}
