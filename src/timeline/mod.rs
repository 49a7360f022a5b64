#![doc = r#"
The meter map: converts absolute ticks to measure/beat/tick and back.

A [`Timeline`] is built from every time signature found in a file. Each
[`Meter`] governs from its start tick until the next one begins. Measures,
beats and ticks are counted from zero.

```text
beats per measure = 4 * numerator * 24 / (denominator * clocks per click)
ticks per beat    = ticks per quarter note * 24 / clocks per click
```

Both are integer divisions. Combinations that do not divide evenly lose
the remainder, and measure boundaries are placed accordingly.
"#]

use crate::file::{MidiFile, Timing, meta::MetaMessage, meta::TimeSignature};
use crate::message::Message;
use core::fmt;
use log::debug;
use std::collections::BTreeMap;
use thiserror::Error;

/// Why a timeline could not be built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TimelineError {
    /// Measures are only defined for ticks-per-quarter-note files
    #[error("Measure positions need ticks per quarter note timing, found {0:?}")]
    UnsupportedDivision(Timing),
    /// A time signature whose geometry yields zero-length beats or measures
    #[error("Time signature at tick {tick} has no usable beat or measure length")]
    DegenerateMeter {
        /// Where the time signature starts
        tick: u64,
    },
}

/// A measure/beat/tick position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BeatPosition {
    /// Zero-based measure
    pub measure: u64,
    /// Zero-based beat within the measure
    pub beat: u64,
    /// Tick within the beat
    pub tick: u64,
}

impl BeatPosition {
    /// Create a position.
    pub const fn new(measure: u64, beat: u64, tick: u64) -> Self {
        Self {
            measure,
            beat,
            tick,
        }
    }
}

impl fmt::Display for BeatPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.measure, self.beat, self.tick)
    }
}

/// A time signature in effect from `start_ticks` on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Meter {
    index: usize,
    start_ticks: u64,
    start_measure: u64,
    start_position: BeatPosition,
    signature: TimeSignature,
    ticks_per_beat: u64,
    beats_per_measure: u64,
}

impl Meter {
    fn new(index: usize, start_ticks: u64, signature: TimeSignature, tpqn: u16) -> Result<Self, TimelineError> {
        let degenerate = TimelineError::DegenerateMeter { tick: start_ticks };
        let clocks = u64::from(signature.clocks_per_click);
        let denominator = signature.denominator().ok_or(degenerate.clone())?;

        let ticks_per_beat = (u64::from(tpqn) * 24)
            .checked_div(clocks)
            .filter(|t| *t > 0)
            .ok_or(degenerate.clone())?;
        let beats_per_measure = (4 * u64::from(signature.numerator) * 24)
            .checked_div(u64::from(denominator) * clocks)
            .filter(|b| *b > 0)
            .ok_or(degenerate)?;

        Ok(Self {
            index,
            start_ticks,
            start_measure: 0,
            start_position: BeatPosition::default(),
            signature,
            ticks_per_beat,
            beats_per_measure,
        })
    }

    /// First tick this meter governs
    pub const fn start_ticks(&self) -> u64 {
        self.start_ticks
    }

    /// The measure number at `start_ticks`
    pub const fn start_measure(&self) -> u64 {
        self.start_measure
    }

    /// Where `start_ticks` falls under the previous meter
    pub const fn start_position(&self) -> BeatPosition {
        self.start_position
    }

    /// Time signature numerator
    pub const fn numerator(&self) -> u8 {
        self.signature.numerator
    }

    /// Time signature denominator, as a note value
    pub fn denominator(&self) -> u32 {
        // checked in Meter::new
        self.signature.denominator().unwrap_or(4)
    }

    /// MIDI clocks per metronome click
    pub const fn clocks_per_beat(&self) -> u8 {
        self.signature.clocks_per_click
    }

    /// Notated 32nd notes per quarter note
    pub const fn thirty_seconds_per_quarter(&self) -> u8 {
        self.signature.thirty_seconds_per_quarter
    }

    /// The signature this meter was built from
    pub const fn time_signature(&self) -> TimeSignature {
        self.signature
    }

    /// Ticks in one beat
    pub const fn ticks_per_beat(&self) -> u64 {
        self.ticks_per_beat
    }

    /// Beats in one measure
    pub const fn beats_per_measure(&self) -> u64 {
        self.beats_per_measure
    }

    /// Ticks in one measure
    pub const fn ticks_per_measure(&self) -> u64 {
        self.ticks_per_beat * self.beats_per_measure
    }

    fn position_of(&self, ticks: u64) -> BeatPosition {
        let delta = ticks.saturating_sub(self.start_ticks);
        let beats = delta / self.ticks_per_beat;
        BeatPosition {
            measure: self.start_measure + beats / self.beats_per_measure,
            beat: beats % self.beats_per_measure,
            tick: delta % self.ticks_per_beat,
        }
    }
}

#[doc = r#"
The ordered chain of [`Meter`]s of a file.

There is always a meter at tick 0: 4/4 unless the file declares one there.
When several time signatures share a tick, tracks are visited in index order
and events in track order, and the last one visited wins.

# Example
```rust
# use imuse_midi::prelude::*;
let six_eight = TimeSignature {
    numerator: 6,
    denominator_exponent: 3,
    clocks_per_click: 36,
    thirty_seconds_per_quarter: 8,
};
let timeline = Timeline::from_time_signatures(480, [(0, six_eight)]).unwrap();
assert_eq!(timeline.position_of(960), BeatPosition::new(1, 1, 0));
assert_eq!(timeline.tick_of(BeatPosition::new(1, 1, 0)), 960);
```
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timeline {
    ticks_per_quarter_note: u16,
    meters: Vec<Meter>,
}

impl Timeline {
    /// Collect the time signatures of every track in `file`.
    pub fn new(file: &MidiFile) -> Result<Self, TimelineError> {
        let tpqn = file
            .timing()
            .ticks_per_quarter_note()
            .ok_or(TimelineError::UnsupportedDivision(file.timing()))?;
        let signatures = file.tracks().iter().flat_map(|track| {
            track.events().iter().filter_map(|event| match event.message() {
                Message::Meta(MetaMessage::TimeSignature(ts)) => Some((event.ticks(), *ts)),
                _ => None,
            })
        });
        Self::from_time_signatures(tpqn, signatures)
    }

    /// Build from `(tick, signature)` pairs in any order.
    pub fn from_time_signatures(
        ticks_per_quarter_note: u16,
        signatures: impl IntoIterator<Item = (u64, TimeSignature)>,
    ) -> Result<Self, TimelineError> {
        let mut by_tick = BTreeMap::new();
        for (tick, signature) in signatures {
            by_tick.insert(tick, signature);
        }
        by_tick.entry(0).or_insert(TimeSignature::COMMON);

        let mut meters: Vec<Meter> = Vec::with_capacity(by_tick.len());
        for (index, (tick, signature)) in by_tick.into_iter().enumerate() {
            let mut meter = Meter::new(index, tick, signature, ticks_per_quarter_note)?;
            if let Some(prev) = meters.last() {
                meter.start_position = prev.position_of(tick);
                meter.start_measure = meter.start_position.measure;
            }
            meters.push(meter);
        }
        debug!("timeline with {} meters", meters.len());

        Ok(Self {
            ticks_per_quarter_note,
            meters,
        })
    }

    /// The file's ticks per quarter note
    pub const fn ticks_per_quarter_note(&self) -> u16 {
        self.ticks_per_quarter_note
    }

    /// Every meter, in time order
    pub fn meters(&self) -> &[Meter] {
        &self.meters
    }

    /// The meter before `meter`
    pub fn previous(&self, meter: &Meter) -> Option<&Meter> {
        meter.index.checked_sub(1).and_then(|i| self.meters.get(i))
    }

    /// The meter after `meter`
    pub fn next(&self, meter: &Meter) -> Option<&Meter> {
        self.meters.get(meter.index + 1)
    }

    /// The meter governing `ticks`
    pub fn meter_at(&self, ticks: u64) -> &Meter {
        let after = self.meters.partition_point(|m| m.start_ticks <= ticks);
        // meters[0] starts at tick 0, so after >= 1
        &self.meters[after.saturating_sub(1)]
    }

    /// Measure/beat/tick of an absolute tick.
    pub fn position_of(&self, ticks: u64) -> BeatPosition {
        self.meter_at(ticks).position_of(ticks)
    }

    /// Absolute tick of a measure/beat/tick position.
    ///
    /// The governing meter is the last one whose start position is not after
    /// `position`. A meter that starts mid-measure renumbers beats from zero,
    /// so its positions before the previous meter's reading of its start
    /// resolve to the previous meter. Beat and tick are not range checked;
    /// overflowing values carry into the following beats and measures.
    pub fn tick_of(&self, position: BeatPosition) -> u64 {
        let after = self
            .meters
            .partition_point(|m| m.start_position <= position);
        let meter = &self.meters[after.saturating_sub(1)];
        let beats = (position.measure - meter.start_measure) * meter.beats_per_measure
            + position.beat;
        meter.start_ticks + beats * meter.ticks_per_beat + position.tick
    }

    /// Attach a [`BeatPosition`] to every event of every track.
    pub fn apply(&self, file: &mut MidiFile) {
        for track in file.tracks_mut() {
            let mut meter = &self.meters[0];
            for event in track.events_mut() {
                while let Some(next) = self.next(meter) {
                    if event.ticks() < next.start_ticks {
                        break;
                    }
                    meter = next;
                }
                event.set_position(meter.position_of(event.ticks()));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file::{Format, Track};
    use pretty_assertions::assert_eq;

    fn signature(numerator: u8, denominator_exponent: u8, clocks_per_click: u8) -> TimeSignature {
        TimeSignature {
            numerator,
            denominator_exponent,
            clocks_per_click,
            thirty_seconds_per_quarter: 8,
        }
    }

    #[test]
    fn seeds_common_time() {
        let timeline = Timeline::from_time_signatures(480, []).unwrap();
        let meter = &timeline.meters()[0];
        assert_eq!(meter.numerator(), 4);
        assert_eq!(meter.denominator(), 4);
        assert_eq!(meter.ticks_per_beat(), 480);
        assert_eq!(meter.beats_per_measure(), 4);
        assert_eq!(timeline.position_of(1920 + 480 + 5), BeatPosition::new(1, 1, 5));
    }

    #[test]
    fn six_eight_with_quarter_note_clicks() {
        let timeline = Timeline::from_time_signatures(480, [(0, signature(6, 3, 24))]).unwrap();
        let meter = timeline.meter_at(0);
        assert_eq!(meter.ticks_per_beat(), 480);
        assert_eq!(meter.beats_per_measure(), 3);
        assert_eq!(timeline.position_of(960), BeatPosition::new(0, 2, 0));
    }

    #[test]
    fn two_four() {
        let timeline = Timeline::from_time_signatures(480, [(0, signature(2, 2, 24))]).unwrap();
        assert_eq!(timeline.meter_at(0).beats_per_measure(), 2);
        assert_eq!(timeline.position_of(960), BeatPosition::new(1, 0, 0));
    }

    #[test]
    fn later_meters_continue_the_measure_count() {
        // two bars of 4/4, then 3/4
        let timeline =
            Timeline::from_time_signatures(96, [(768, signature(3, 2, 24))]).unwrap();
        assert_eq!(timeline.meters().len(), 2);
        let three_four = &timeline.meters()[1];
        assert_eq!(three_four.start_measure(), 2);
        assert_eq!(timeline.previous(three_four), Some(&timeline.meters()[0]));
        assert_eq!(timeline.next(three_four), None);

        assert_eq!(timeline.position_of(767), BeatPosition::new(1, 3, 95));
        assert_eq!(timeline.position_of(768 + 288 + 97), BeatPosition::new(3, 1, 1));
        assert_eq!(timeline.tick_of(BeatPosition::new(3, 1, 1)), 768 + 288 + 97);
        assert_eq!(timeline.tick_of(BeatPosition::new(1, 3, 95)), 767);
    }

    #[test]
    fn meter_starting_mid_measure() {
        // 4/4 for 100 ticks, then 3/4 from beat 1 tick 4 of the first bar
        let timeline =
            Timeline::from_time_signatures(96, [(100, signature(3, 2, 24))]).unwrap();
        let three_four = &timeline.meters()[1];
        assert_eq!(three_four.start_measure(), 0);
        assert_eq!(three_four.start_position(), BeatPosition::new(0, 1, 4));

        assert_eq!(timeline.position_of(50), BeatPosition::new(0, 0, 50));
        assert_eq!(timeline.tick_of(timeline.position_of(50)), 50);
        assert_eq!(timeline.tick_of(timeline.position_of(99)), 99);
        assert_eq!(timeline.position_of(292), BeatPosition::new(0, 2, 0));
        assert_eq!(timeline.tick_of(timeline.position_of(292)), 292);
        assert_eq!(timeline.tick_of(timeline.position_of(400)), 400);
    }

    #[test]
    fn integer_division_is_kept() {
        // 100 * 24 / 36 = 66.67, truncated
        let timeline = Timeline::from_time_signatures(100, [(0, signature(6, 3, 36))]).unwrap();
        assert_eq!(timeline.meter_at(0).ticks_per_beat(), 66);
    }

    #[test]
    fn degenerate_signatures_are_rejected() {
        assert_eq!(
            Timeline::from_time_signatures(480, [(0, signature(4, 2, 0))]),
            Err(TimelineError::DegenerateMeter { tick: 0 })
        );
        assert_eq!(
            Timeline::from_time_signatures(480, [(10, signature(0, 2, 24))]),
            Err(TimelineError::DegenerateMeter { tick: 10 })
        );
    }

    #[test]
    fn last_signature_at_a_tick_wins() {
        let mut file = MidiFile::new(Format::Simultaneous, Timing::new_ticks_per_quarter_note(480));
        for sig in [signature(3, 2, 24), signature(5, 2, 24)] {
            let mut track = Track::new();
            track.push(0, MetaMessage::TimeSignature(sig)).unwrap();
            file.push_track(track).unwrap();
        }
        let timeline = Timeline::new(&file).unwrap();
        assert_eq!(timeline.meters().len(), 1);
        assert_eq!(timeline.meter_at(0).numerator(), 5);
    }

    #[test]
    fn smpte_files_are_unsupported() {
        let timing = Timing::new_smpte(crate::file::SmpteFps::Thirty, 40);
        let file = MidiFile::new(Format::Simultaneous, timing);
        assert_eq!(
            Timeline::new(&file),
            Err(TimelineError::UnsupportedDivision(timing))
        );
    }

    #[test]
    fn apply_attaches_positions() {
        let mut file = MidiFile::new(Format::SingleMultiChannel, Timing::new_ticks_per_quarter_note(480));
        let mut track = Track::new();
        track.push(0, MetaMessage::TimeSignature(signature(2, 2, 24))).unwrap();
        track.push(960, MetaMessage::TimeSignature(signature(3, 2, 24))).unwrap();
        track.push(960 + 1440 + 500, MetaMessage::EndOfTrack).unwrap();
        file.push_track(track).unwrap();

        let timeline = Timeline::new(&file).unwrap();
        timeline.apply(&mut file);
        let positions: Vec<_> = file.tracks()[0]
            .events()
            .iter()
            .map(|e| e.position())
            .collect();
        assert_eq!(
            positions,
            vec![
                Some(BeatPosition::new(0, 0, 0)),
                Some(BeatPosition::new(1, 0, 0)),
                Some(BeatPosition::new(2, 1, 20)),
            ]
        );
    }
}
