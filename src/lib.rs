#![doc = r#"
Standard MIDI File codec, iMUSE sysex sub-codec and a retimable playback scheduler.

# Layers

```text
 Reader / Writer  (chunks, VLQ, running status)
        |
 Message model    (channel voice, sysex, meta)
        |
 MidiFile         (header, tracks, outer sound-resource framing)
        |
 Timeline         (tick <-> measure/beat/tick)
        |
 Scheduler        (slices, live tempo, dispatch thread)
        |
 Player           (file -> scheduler -> sink)
```

# Example
```rust
use imuse_midi::prelude::*;

let bytes = [
    b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 0, 0, 1, 0x01, 0xE0,
    b'M', b'T', b'r', b'k', 0, 0, 0, 11,
    0x00, 0x90, 0x3C, 0x64,
    0x60, 0x3C, 0x00,
    0x00, 0xFF, 0x2F, 0x00,
];

let file = MidiFile::parse(&bytes).unwrap();
assert_eq!(file.timing().ticks_per_quarter_note(), Some(480));
assert_eq!(file.tracks()[0].events().len(), 3);

let rewritten = file.to_bytes(WriteOptions::default()).unwrap();
assert_eq!(&rewritten[..], &bytes[..]);
```
"#]

mod error;
pub use error::*;

pub mod clock;
pub mod file;
pub mod gm;
pub mod message;
pub mod micros;
pub mod note;
pub mod player;
pub mod reader;
pub mod scheduler;
pub mod sysex;
pub mod timeline;
pub mod vlq;
pub mod writer;

mod sync;

pub use message::DataByte;

/// Re-exports of the types most callers need.
pub mod prelude {
    pub use crate::{
        clock::{Clock, ClockConfig, ClockError, ThreadTimer, TimerService},
        error::*,
        file::{meta::*, *},
        message::{channel::*, *},
        micros::{Micros, UMicros},
        note::{Note, PitchClass},
        player::{MidiSink, Player, PlayerConfig, PlayerError, RecordingSink, SinkError},
        reader::{ReadResult, Reader, ReaderError, ReaderErrorKind},
        scheduler::{
            ManualTimeSource, ScheduleQueue, Scheduler, SchedulerConfig, SchedulerError,
            SchedulerHandle, Slice, SystemTimeSource, TimeSource,
        },
        sysex::{
            ImuseGeneration, ImuseMessage, ImuseParser, ManufacturerId, Nibbles, SysExMessage,
            SysexContent, SysexError, SysexParser, SysexRegistry,
        },
        timeline::{BeatPosition, Meter, Timeline, TimelineError},
        writer::{WriteError, WriteOptions, Writer},
    };
}
