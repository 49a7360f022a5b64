#![doc = r#"
The MIDI file model: header, tracks and optional sound-resource framing.

```text
[framing]  SOUN / target / MDhd    (optional, see container)
MThd       format, track count, division
MTrk * n   delta-time + message, repeated
```
"#]

pub mod meta;

mod chunk;
pub use chunk::*;

mod container;
pub use container::*;

mod format;
pub use format::*;

mod header;
pub use header::*;

mod timing;
pub use timing::*;

mod track;
pub use track::*;

use crate::{
    FileError,
    reader::{ReadResult, Reader, ReaderError},
    sysex::SysexRegistry,
    writer::{WriteError, WriteOptions, Writer},
};
use log::debug;
use std::io;

#[doc = r#"
A parsed Standard MIDI File.

The division type is fixed at construction. Parsing reads exactly the
number of tracks the header declares.
"#]
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MidiFile {
    format: Format,
    timing: Timing,
    framing: Framing,
    tracks: Vec<Track>,
}

impl MidiFile {
    /// An empty file with no framing.
    pub fn new(format: Format, timing: Timing) -> Self {
        Self {
            format,
            timing,
            framing: Framing::default(),
            tracks: Vec::new(),
        }
    }

    /// Parse a file, decoding iMUSE sysex messages.
    pub fn parse(bytes: &[u8]) -> ReadResult<Self> {
        Self::parse_with(bytes, &SysexRegistry::with_imuse())
    }

    /// Parse a file, decoding sysex payloads with `registry`.
    pub fn parse_with(bytes: &[u8], registry: &SysexRegistry) -> ReadResult<Self> {
        let mut reader = Reader::from_byte_slice(bytes);
        let framing = Framing::read(&mut reader)?;
        let header = Header::read(reader.read_chunk_tagged(ChunkTag::MTHD)?)?;
        debug!(
            "MThd: {:?}, {} tracks, {:?}",
            header.format, header.track_count, header.timing
        );

        let declared = header.track_count;
        let mut tracks = Vec::with_capacity(declared as usize);
        for index in 0..declared {
            if reader.is_empty() {
                return Err(ReaderError::invalid(
                    reader.buffer_position(),
                    FileError::TrackCount {
                        declared,
                        found: tracks.len(),
                    }
                    .into(),
                ));
            }
            let track = Track::read(reader.read_chunk_tagged(ChunkTag::MTRK)?, registry)?;
            debug!("MTrk {index}: {} events", track.len());
            tracks.push(track);
        }
        if !reader.is_empty() {
            debug!("ignoring {} bytes after the last track", reader.remaining());
        }

        Ok(Self {
            format: header.format,
            timing: header.timing,
            framing,
            tracks,
        })
    }

    /// The format word
    pub const fn format(&self) -> Format {
        self.format
    }

    /// The division
    pub const fn timing(&self) -> Timing {
        self.timing
    }

    /// Framing found in front of `MThd`
    pub const fn framing(&self) -> &Framing {
        &self.framing
    }

    /// Replace the framing written in front of `MThd`.
    pub fn set_framing(&mut self, framing: Framing) {
        self.framing = framing;
    }

    /// The tracks, in file order
    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub(crate) fn tracks_mut(&mut self) -> &mut [Track] {
        &mut self.tracks
    }

    /// Append a track. A format 0 file takes only one.
    pub fn push_track(&mut self, track: Track) -> Result<(), FileError> {
        if !self.format.is_multi_track() && !self.tracks.is_empty() {
            return Err(FileError::SingleTrackFormat);
        }
        self.tracks.push(track);
        Ok(())
    }

    /// The tracks, consuming the file
    pub fn into_tracks(self) -> Vec<Track> {
        self.tracks
    }

    /// Encode the whole file.
    pub fn to_bytes(&self, options: WriteOptions) -> Result<Vec<u8>, WriteError> {
        if !self.format.is_multi_track() && self.tracks.len() != 1 {
            return Err(WriteError::SingleTrackFormat(self.tracks.len()));
        }
        let mut writer = Writer::new();
        let framing = self.framing.write_open(&mut writer);
        let track_count = u16::try_from(self.tracks.len())
            .map_err(|_| WriteError::TrackCount(self.tracks.len()))?;
        Header {
            format: self.format,
            track_count,
            timing: self.timing,
        }
        .write(&mut writer)?;
        for track in &self.tracks {
            track.write(&mut writer, options)?;
        }
        Framing::write_close(&mut writer, framing)?;
        Ok(writer.into_bytes())
    }

    /// Encode the whole file into `out`.
    pub fn write_to<W: io::Write>(&self, mut out: W, options: WriteOptions) -> Result<(), WriteError> {
        out.write_all(&self.to_bytes(options)?)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{HeaderError, ParseError, file::meta::MetaMessage};
    use pretty_assertions::assert_eq;

    const HEADER: [u8; 14] = [b'M', b'T', b'h', b'd', 0, 0, 0, 6, 0, 1, 0, 2, 0x00, 0x60];
    const EMPTY_TRACK: [u8; 12] = [b'M', b'T', b'r', b'k', 0, 0, 0, 4, 0x00, 0xFF, 0x2F, 0x00];

    #[test]
    fn track_count_must_match() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&EMPTY_TRACK);
        let err = MidiFile::parse(&bytes).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::File(FileError::TrackCount {
                declared: 2,
                found: 1
            }))
        );
    }

    #[test]
    fn trailing_bytes_are_ignored() {
        let mut bytes = HEADER.to_vec();
        bytes.extend_from_slice(&EMPTY_TRACK);
        bytes.extend_from_slice(&EMPTY_TRACK);
        bytes.extend_from_slice(&[0xDE, 0xAD]);
        let file = MidiFile::parse(&bytes).unwrap();
        assert_eq!(file.tracks().len(), 2);
    }

    #[test]
    fn smpte_selector_is_checked_at_load() {
        let mut bytes = HEADER.to_vec();
        bytes[12] = 0x80;
        bytes[13] = 0x18;
        let err = MidiFile::parse(&bytes).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Smpte(crate::SmpteError::HeaderFrameTime(-128)))
        );
    }

    #[test]
    fn format_zero_takes_one_track() {
        let mut file = MidiFile::new(Format::SingleMultiChannel, Timing::default());
        file.push_track(Track::new()).unwrap();
        assert_eq!(file.push_track(Track::new()), Err(FileError::SingleTrackFormat));
    }

    #[test]
    fn format_zero_without_a_track_is_not_written() {
        let file = MidiFile::new(Format::SingleMultiChannel, Timing::default());
        assert!(matches!(
            file.to_bytes(WriteOptions::default()),
            Err(WriteError::SingleTrackFormat(0))
        ));

        let empty = MidiFile::new(Format::Simultaneous, Timing::default());
        let bytes = empty.to_bytes(WriteOptions::default()).unwrap();
        assert_eq!(MidiFile::parse(&bytes).unwrap().tracks().len(), 0);
    }

    #[test]
    fn writes_and_reads_back() {
        let mut file = MidiFile::new(Format::Simultaneous, Timing::new_ticks_per_quarter_note(96));
        file.set_framing(Framing {
            container: Some(ChunkTag::SOU),
            target: Some(Target::GeneralMidi),
            parameters: None,
        });
        let mut track = Track::new();
        track.push(0, MetaMessage::EndOfTrack).unwrap();
        file.push_track(track).unwrap();

        let mut out = Vec::new();
        file.write_to(&mut out, WriteOptions::default()).unwrap();
        assert_eq!(MidiFile::parse(&out).unwrap(), file);
    }

    #[test]
    fn header_errors_carry_their_offset() {
        let mut bytes = HEADER.to_vec();
        bytes[9] = 7;
        let err = MidiFile::parse(&bytes).unwrap_err();
        assert_eq!(err.position(), 10);
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Header(HeaderError::InvalidFormat(7)))
        );
    }
}
