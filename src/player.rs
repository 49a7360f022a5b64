#![doc = r#"
Replays a [`MidiFile`] through a [`Scheduler`] into a [`MidiSink`].

Every event of every track is queued at its absolute tick before playback
starts. Tempo meta messages retime the scheduler as they are dispatched, so
later events follow the file's own tempo map. The sink sees each message at
its tick in time order; events sharing a tick arrive in track order.

# Example
```rust
use imuse_midi::prelude::*;
use std::time::Duration;

let mut track = Track::new();
track.push(0, MetaMessage::Tempo(Tempo::new(10_000))).unwrap();
track.push(0, MetaMessage::EndOfTrack).unwrap();
let mut file = MidiFile::new(Format::SingleMultiChannel, Timing::new_ticks_per_quarter_note(96));
file.push_track(track).unwrap();

let player = Player::new(&file, RecordingSink::new(), PlayerConfig::default()).unwrap();
player.play().unwrap();
assert!(player.wait(Duration::from_secs(2)).unwrap());

let recorded = player.finish().unwrap().into_track().unwrap();
assert_eq!(recorded.len(), 2);
```
"#]

use crate::{
    FileError,
    file::{
        Format, MidiEvent, MidiFile, Timing, Track,
        meta::{MetaMessage, Tempo},
    },
    message::Message,
    scheduler::{Scheduler, SchedulerConfig, SchedulerError, SchedulerHandle},
    sync::lock,
};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, unbounded};
use log::{debug, warn};
use std::{
    io,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};
use thiserror::Error;

/// A failure inside a [`MidiSink`].
#[derive(Debug, Error)]
pub enum SinkError {
    /// The device or stream failed
    #[error("Sink I/O failed: {0}")]
    Io(#[from] io::Error),
    /// The message could not be recorded
    #[error(transparent)]
    Track(#[from] FileError),
    /// The device is gone
    #[error("Sink is closed")]
    Closed,
}

/// The receiving end of playback: a device, a recorder or a file writer.
pub trait MidiSink: Send {
    /// Accept `message`, due at `ticks`.
    fn send(&mut self, ticks: u64, message: &Message) -> Result<(), SinkError>;
}

/// A [`MidiSink`] that records everything it is sent into a [`Track`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct RecordingSink {
    track: Track,
}

impl RecordingSink {
    /// An empty recording
    pub fn new() -> Self {
        Self::default()
    }

    /// What has been recorded so far
    pub fn track(&self) -> &Track {
        &self.track
    }

    /// The recording as a writable track.
    ///
    /// Recorded end-of-track messages are dropped and a single one is placed
    /// at the last recorded tick.
    pub fn into_track(self) -> Result<Track, FileError> {
        let end = self.track.end_ticks();
        let events = self
            .track
            .into_events()
            .into_iter()
            .filter(|e| !matches!(e.message(), Message::Meta(MetaMessage::EndOfTrack)))
            .chain(std::iter::once(MidiEvent::new(end, MetaMessage::EndOfTrack)));
        Track::from_events(events)
    }

    /// The recording as a format 0 file.
    pub fn into_file(self, timing: Timing) -> Result<MidiFile, FileError> {
        let mut file = MidiFile::new(Format::SingleMultiChannel, timing);
        file.push_track(self.into_track()?)?;
        Ok(file)
    }
}

impl MidiSink for RecordingSink {
    fn send(&mut self, ticks: u64, message: &Message) -> Result<(), SinkError> {
        self.track.push(ticks, message.clone())?;
        Ok(())
    }
}

/// A failure to set up or drive a [`Player`].
#[derive(Debug, Error)]
pub enum PlayerError {
    /// The scheduler refused
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),
    /// Only ticks-per-quarter-note files can be scheduled
    #[error("Cannot play a file timed by {0:?}")]
    UnsupportedDivision(Timing),
    /// A clone of the sink outlived the player
    #[error("The sink is still shared")]
    SinkInUse,
}

/// Settings for a [`Player`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PlayerConfig {
    /// Tempo before the first tempo meta message
    pub initial_tempo: Tempo,
    /// Stop the scheduler once [`Player::wait`] observes the end
    pub stop_on_end: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            initial_tempo: Tempo::DEFAULT,
            stop_on_end: true,
        }
    }
}

enum Cue {
    Message(Message),
    End,
}

/// Plays one file into one sink.
pub struct Player<S: MidiSink + 'static> {
    scheduler: Scheduler<Cue>,
    sink: Arc<Mutex<S>>,
    events: Vec<(u64, Message)>,
    length: u64,
    config: PlayerConfig,
    done: Receiver<()>,
}

impl<S: MidiSink + 'static> Player<S> {
    /// Queue every event of `file` for playback into `sink`.
    ///
    /// Format 2 files are played with all tracks at once, like format 1.
    pub fn new(file: &MidiFile, sink: S, config: PlayerConfig) -> Result<Self, PlayerError> {
        let ppqn = file
            .timing()
            .ticks_per_quarter_note()
            .ok_or(PlayerError::UnsupportedDivision(file.timing()))?;
        let sink = Arc::new(Mutex::new(sink));
        let (done_tx, done) = unbounded();
        let scheduler = Scheduler::new(
            SchedulerConfig {
                ticks_per_quarter_note: ppqn,
                tempo: config.initial_tempo.micros_per_quarter_note(),
            },
            dispatcher(Arc::clone(&sink), done_tx),
        )?;

        let events: Vec<(u64, Message)> = file
            .tracks()
            .iter()
            .flat_map(|track| track.events().iter())
            .map(|e| (e.ticks(), e.message().clone()))
            .collect();
        let length = file.tracks().iter().map(Track::end_ticks).max().unwrap_or(0);

        let player = Self {
            scheduler,
            sink,
            events,
            length,
            config,
            done,
        };
        player.enqueue()?;
        debug!(
            "player loaded {} events over {} ticks",
            player.events.len(),
            player.length
        );
        Ok(player)
    }

    fn enqueue(&self) -> Result<(), SchedulerError> {
        for (ticks, message) in &self.events {
            self.scheduler.schedule(*ticks, Cue::Message(message.clone()))?;
        }
        self.scheduler.schedule(self.length, Cue::End)
    }

    /// Start or continue playback.
    pub fn play(&self) -> Result<(), PlayerError> {
        Ok(self.scheduler.start()?)
    }

    /// Pause playback. [`play`](Self::play) continues from the same tick.
    pub fn stop(&self) -> Result<(), PlayerError> {
        Ok(self.scheduler.stop()?)
    }

    /// Return to tick 0 at the initial tempo. Only while stopped.
    pub fn rewind(&self) -> Result<(), PlayerError> {
        self.scheduler.reset()?;
        self.scheduler
            .set_tempo(self.config.initial_tempo.micros_per_quarter_note())?;
        while self.done.try_recv().is_ok() {}
        self.enqueue()?;
        Ok(())
    }

    /// Block until the end of the file is reached or `timeout` passes.
    ///
    /// Returns true if the end was reached.
    pub fn wait(&self, timeout: Duration) -> Result<bool, PlayerError> {
        match self.done.recv_timeout(timeout) {
            Ok(()) => {
                if self.config.stop_on_end && self.scheduler.is_running() {
                    self.scheduler.stop()?;
                }
                Ok(true)
            }
            Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => Ok(false),
        }
    }

    /// The current tick
    pub fn position(&self) -> u64 {
        self.scheduler.time_in_ticks()
    }

    /// The tick of the last event over all tracks
    pub fn length(&self) -> u64 {
        self.length
    }

    /// Microseconds per quarter note right now
    pub fn tempo(&self) -> u32 {
        self.scheduler.tempo()
    }

    /// True while playing
    pub fn is_playing(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Stop playback and hand back the sink.
    pub fn finish(self) -> Result<S, PlayerError> {
        let Self {
            scheduler, sink, ..
        } = self;
        let disposed = scheduler.dispose();
        // releases the dispatcher's clone of the sink
        drop(scheduler);
        disposed?;
        let sink = Arc::try_unwrap(sink).map_err(|_| PlayerError::SinkInUse)?;
        Ok(sink.into_inner().unwrap_or_else(PoisonError::into_inner))
    }
}

fn dispatcher<S: MidiSink + 'static>(
    sink: Arc<Mutex<S>>,
    done: Sender<()>,
) -> impl FnMut(&SchedulerHandle<Cue>, u64, Vec<Cue>) + Send + 'static {
    move |handle, tick, cues| {
        for cue in cues {
            let message = match cue {
                Cue::Message(message) => message,
                Cue::End => {
                    debug!("player reached the end at tick {tick}");
                    let _ = done.send(());
                    continue;
                }
            };
            if let Message::Meta(MetaMessage::Tempo(tempo)) = &message {
                if let Err(e) = handle.set_tempo(tempo.micros_per_quarter_note()) {
                    warn!("ignoring tempo at tick {tick}: {e}");
                }
            }
            if let Err(e) = lock(&sink).send(tick, &message) {
                warn!("sink rejected message at tick {tick}: {e}");
            }
        }
    }
}
