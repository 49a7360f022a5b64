use super::ClockError;
use crossbeam_channel::{Sender, bounded};
use log::debug;
use std::{
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

/// The callback a [`TimerService`] invokes once per interval.
pub type TimerCallback = Box<dyn FnMut() + Send>;

/// Something that calls back at a fixed interval.
///
/// The [`Clock`](super::Clock) owns one and arms it on start. OS multimedia
/// timers or audio callbacks plug in here; [`ThreadTimer`] is the portable
/// default.
pub trait TimerService: Send {
    /// Begin invoking `callback` every `interval`.
    fn arm(&mut self, interval: Duration, callback: TimerCallback) -> Result<(), ClockError>;
    /// Stop invoking the callback. Returns once no further call can happen.
    fn disarm(&mut self);
    /// True between `arm` and `disarm`
    fn is_armed(&self) -> bool;
}

/// A [`TimerService`] backed by a dedicated thread.
///
/// Deadlines advance by whole intervals from the time of arming, so a late
/// wakeup shortens the next wait instead of shifting every later one.
#[derive(Debug, Default)]
pub struct ThreadTimer {
    running: Option<(Sender<()>, JoinHandle<()>)>,
}

impl ThreadTimer {
    /// An unarmed timer
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimerService for ThreadTimer {
    fn arm(&mut self, interval: Duration, mut callback: TimerCallback) -> Result<(), ClockError> {
        self.disarm();
        let (stop_tx, stop_rx) = bounded::<()>(1);
        let handle = thread::Builder::new()
            .name("clock-timer".into())
            .spawn(move || {
                let mut deadline = Instant::now() + interval;
                // a message or a disconnect both mean stop
                while let Err(e) = stop_rx.recv_deadline(deadline) {
                    if e.is_disconnected() {
                        break;
                    }
                    callback();
                    deadline += interval;
                }
            })
            .map_err(ClockError::Timer)?;
        debug!("timer armed at {interval:?}");
        self.running = Some((stop_tx, handle));
        Ok(())
    }

    fn disarm(&mut self) {
        if let Some((stop_tx, handle)) = self.running.take() {
            let _ = stop_tx.send(());
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
            debug!("timer disarmed");
        }
    }

    fn is_armed(&self) -> bool {
        self.running.is_some()
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.disarm();
    }
}
