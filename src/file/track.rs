use super::ChunkTag;
use crate::{
    FileError, TrackError,
    message::{ChannelVoiceMessage, META, Message, SYSEX, SYSEX_CONTINUATION},
    file::meta::MetaMessage,
    reader::{RawChunk, ReadResult, inv_data},
    sysex::{SysExMessage, SysexRegistry},
    timeline::BeatPosition,
    vlq,
    writer::{RunningStatus, WriteError, WriteOptions, Writer},
};

/// A message at an absolute tick.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiEvent {
    ticks: u64,
    message: Message,
    position: Option<BeatPosition>,
}

impl MidiEvent {
    /// Create an event at `ticks`.
    pub fn new(ticks: u64, message: impl Into<Message>) -> Self {
        Self {
            ticks,
            message: message.into(),
            position: None,
        }
    }

    /// Ticks since the start of the track
    pub const fn ticks(&self) -> u64 {
        self.ticks
    }

    /// The message
    pub const fn message(&self) -> &Message {
        &self.message
    }

    /// Measure/beat/tick, once a [`Timeline`](crate::timeline::Timeline) has been applied
    pub const fn position(&self) -> Option<BeatPosition> {
        self.position
    }

    pub(crate) fn set_position(&mut self, position: BeatPosition) {
        self.position = Some(position);
    }

    /// Take the message out
    pub fn into_message(self) -> Message {
        self.message
    }
}

#[doc = r#"
An ordered, append-only sequence of [`MidiEvent`]s.

Ticks never decrease from one event to the next.
"#]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Track {
    events: Vec<MidiEvent>,
}

impl Track {
    /// An empty track
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a track from events already in tick order.
    pub fn from_events(events: impl IntoIterator<Item = MidiEvent>) -> Result<Self, FileError> {
        let mut track = Self::new();
        for event in events {
            track.push_event(event)?;
        }
        Ok(track)
    }

    /// Append `message` at `ticks`.
    pub fn push(&mut self, ticks: u64, message: impl Into<Message>) -> Result<(), FileError> {
        self.push_event(MidiEvent::new(ticks, message))
    }

    /// Append an event. Its tick must not precede the last event's.
    pub fn push_event(&mut self, event: MidiEvent) -> Result<(), FileError> {
        let last = self.end_ticks();
        if event.ticks < last {
            return Err(FileError::OutOfOrder {
                tick: event.ticks,
                last,
            });
        }
        self.events.push(event);
        Ok(())
    }

    /// The events in order
    pub fn events(&self) -> &[MidiEvent] {
        &self.events
    }

    pub(crate) fn events_mut(&mut self) -> &mut [MidiEvent] {
        &mut self.events
    }

    /// Tick of the last event, or 0 for an empty track
    pub fn end_ticks(&self) -> u64 {
        self.events.last().map_or(0, |e| e.ticks)
    }

    /// Number of events
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// True if there are no events
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// True if the last event is an end-of-track meta message
    pub fn is_terminated(&self) -> bool {
        matches!(
            self.events.last().map(|e| &e.message),
            Some(Message::Meta(MetaMessage::EndOfTrack))
        )
    }

    /// The events, consuming the track
    pub fn into_events(self) -> Vec<MidiEvent> {
        self.events
    }

    /// Decode an `MTrk` body.
    pub(crate) fn read(chunk: RawChunk<'_>, registry: &SysexRegistry) -> ReadResult<Self> {
        let mut reader = chunk.reader();
        let mut events = Vec::new();
        let mut ticks = 0u64;
        let mut running: Option<u8> = None;

        while !reader.is_empty() {
            ticks += u64::from(reader.read_vlq()?);

            let byte = reader.read_u8()?;
            let status = if byte & 0x80 != 0 {
                byte
            } else {
                reader.rewind(1);
                running.ok_or_else(|| {
                    inv_data(&reader, TrackError::RunningStatusWithoutStatus(byte))
                })?
            };

            let message = match status {
                0x80..=0xEF => {
                    running = Some(status);
                    Message::ChannelVoice(ChannelVoiceMessage::read(status, &mut reader)?)
                }
                SYSEX => {
                    running = None;
                    let at = reader.clone();
                    let payload = reader.read_vlq_bytes()?;
                    Message::SysEx(
                        SysExMessage::decode(payload, registry).map_err(|e| inv_data(&at, e))?,
                    )
                }
                SYSEX_CONTINUATION => {
                    running = None;
                    Message::SysExContinuation(reader.read_vlq_bytes()?.to_vec())
                }
                META => {
                    running = None;
                    let kind = reader.read_u8()?;
                    let at = reader.clone();
                    let data = reader.read_vlq_bytes()?;
                    Message::Meta(MetaMessage::parse(kind, data).map_err(|e| inv_data(&at, e))?)
                }
                _ => {
                    reader.rewind(1);
                    return Err(inv_data(&reader, TrackError::InvalidStatus(status)));
                }
            };
            events.push(MidiEvent::new(ticks, message));
        }

        Ok(Self { events })
    }

    /// Encode as an `MTrk` chunk.
    pub(crate) fn write(&self, writer: &mut Writer, options: WriteOptions) -> Result<(), WriteError> {
        let chunk = writer.begin_chunk(ChunkTag::MTRK);
        let mut running = RunningStatus::new(options);
        let mut last = 0u64;
        for event in &self.events {
            let delta = event.ticks.saturating_sub(last);
            let delta = u32::try_from(delta)
                .ok()
                .filter(|d| *d <= vlq::MAX)
                .ok_or(WriteError::DeltaTooLarge(delta))?;
            writer.write_vlq(delta)?;
            event.message.write(writer, &mut running)?;
            last = event.ticks;
        }
        writer.end_chunk(chunk)?;
        Ok(())
    }
}

impl<'a> IntoIterator for &'a Track {
    type Item = &'a MidiEvent;
    type IntoIter = std::slice::Iter<'a, MidiEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        DataByte, ParseError,
        message::{Channel, VoiceEvent},
        reader::Reader,
    };
    use pretty_assertions::assert_eq;

    fn mtrk(body: &[u8]) -> Vec<u8> {
        let mut out = b"MTrk".to_vec();
        out.extend_from_slice(&(body.len() as u32).to_be_bytes());
        out.extend_from_slice(body);
        out
    }

    fn read(body: &[u8]) -> ReadResult<Track> {
        let bytes = mtrk(body);
        let chunk = Reader::from_byte_slice(&bytes).read_chunk()?;
        Track::read(chunk, &SysexRegistry::with_imuse())
    }

    fn note_on(channel: Channel, key: u8, velocity: u8) -> Message {
        ChannelVoiceMessage::new(
            channel,
            VoiceEvent::NoteOn {
                key: DataByte::new_unchecked(key),
                velocity: DataByte::new_unchecked(velocity),
            },
        )
        .into()
    }

    #[test]
    fn running_status_continues_the_last_channel_message() {
        let track = read(&[0x00, 0x92, 0x3C, 0x40, 0x10, 0x3E, 0x41]).unwrap();
        assert_eq!(
            track.events(),
            &[
                MidiEvent::new(0, note_on(Channel::Three, 0x3C, 0x40)),
                MidiEvent::new(0x10, note_on(Channel::Three, 0x3E, 0x41)),
            ]
        );
    }

    #[test]
    fn running_status_needs_a_status() {
        let err = read(&[0x00, 0x3C, 0x40]).unwrap_err();
        assert_eq!(err.position(), 9);
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::MalformedTrack(
                TrackError::RunningStatusWithoutStatus(0x3C)
            ))
        );
    }

    #[test]
    fn meta_clears_running_status() {
        let err = read(&[0x00, 0x90, 0x3C, 0x40, 0x00, 0xFF, 0x01, 0x00, 0x00, 0x3C, 0x00])
            .unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::MalformedTrack(
                TrackError::RunningStatusWithoutStatus(0x3C)
            ))
        );
    }

    #[test]
    fn system_common_is_rejected() {
        let err = read(&[0x00, 0xF2, 0x00, 0x00]).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::MalformedTrack(TrackError::InvalidStatus(0xF2)))
        );
    }

    #[test]
    fn absolute_ticks_accumulate() {
        let track = read(&[
            0x00, 0x90, 0x3C, 0x40, //
            0x81, 0x00, 0x3C, 0x00, //
            0x60, 0xFF, 0x2F, 0x00,
        ])
        .unwrap();
        let ticks: Vec<u64> = track.events().iter().map(MidiEvent::ticks).collect();
        assert_eq!(ticks, vec![0, 128, 224]);
        assert!(track.is_terminated());
    }

    #[test]
    fn sysex_goes_through_the_registry() {
        let track = read(&[0x00, 0xF0, 0x04, 0x7D, 0x01, 0x05, 0xF7]).unwrap();
        let Message::SysEx(sysex) = track.events()[0].message() else {
            panic!("expected sysex");
        };
        assert_eq!(
            sysex.as_imuse(),
            Some(&crate::sysex::ImuseMessage::DeallocPart { channel: 5 })
        );
    }

    #[test]
    fn bad_nibbles_are_malformed_sysex() {
        let err = read(&[0x00, 0xF0, 0x06, 0x7D, 0x40, 0x01, 0x80, 0x01, 0xF7]).unwrap_err();
        assert!(matches!(
            err.parse_error(),
            Some(ParseError::MalformedSysex(_))
        ));
    }

    #[test]
    fn truncated_event_is_reported() {
        let err = read(&[0x00, 0x90, 0x3C]).unwrap_err();
        assert!(err.is_truncated());
    }

    #[test]
    fn writes_with_and_without_running_status() {
        let mut track = Track::new();
        track.push(0, note_on(Channel::One, 60, 100)).unwrap();
        track.push(96, note_on(Channel::One, 60, 0)).unwrap();
        track.push(96, MetaMessage::EndOfTrack).unwrap();

        let mut writer = Writer::new();
        track.write(&mut writer, WriteOptions::default()).unwrap();
        assert_eq!(
            writer.as_bytes(),
            mtrk(&[0x00, 0x90, 60, 100, 0x60, 60, 0, 0x00, 0xFF, 0x2F, 0x00])
        );

        let mut writer = Writer::new();
        track.write(&mut writer, WriteOptions::explicit_status()).unwrap();
        assert_eq!(
            writer.as_bytes(),
            mtrk(&[0x00, 0x90, 60, 100, 0x60, 0x90, 60, 0, 0x00, 0xFF, 0x2F, 0x00])
        );
    }

    #[test]
    fn out_of_order_push_is_rejected() {
        let mut track = Track::new();
        track.push(10, MetaMessage::EndOfTrack).unwrap();
        assert_eq!(
            track.push(5, MetaMessage::EndOfTrack),
            Err(FileError::OutOfOrder { tick: 5, last: 10 })
        );
    }

    #[test]
    fn oversized_delta_is_a_write_error() {
        let mut track = Track::new();
        track.push(u64::from(vlq::MAX) + 1, MetaMessage::EndOfTrack).unwrap();
        let mut writer = Writer::new();
        assert!(matches!(
            track.write(&mut writer, WriteOptions::default()),
            Err(WriteError::DeltaTooLarge(_))
        ));
    }
}
