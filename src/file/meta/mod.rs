#![doc = r#"
The meta message catalog (`FF <type> <len> <data>`).

Text payloads are kept as raw bytes: MIDI does not define an encoding, and
re-encoding must reproduce the original bytes.
"#]

mod smpte_offset;
pub use smpte_offset::*;

mod tempo;
pub use tempo::*;

mod time_signature;
pub use time_signature::*;

use crate::{MetaError, ParseError};
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// The text-carrying meta types, `0x01..=0x09`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum TextKind {
    /// Any text
    Text = 0x01,
    /// Copyright notice
    Copyright = 0x02,
    /// Sequence or track name
    TrackName = 0x03,
    /// Instrument name
    InstrumentName = 0x04,
    /// A lyric syllable
    Lyric = 0x05,
    /// Rehearsal letter or section name
    Marker = 0x06,
    /// Description of something happening on stage or screen
    CuePoint = 0x07,
    /// Program (patch) name
    ProgramName = 0x08,
    /// Device (port) name
    DeviceName = 0x09,
}

/// A key signature (`FF 59 02`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct KeySignature {
    /// Negative for flats, positive for sharps
    pub sharps: i8,
    /// 0 for major, 1 for minor
    pub mode: u8,
}

impl KeySignature {
    /// True when the mode byte says minor
    pub const fn is_minor(&self) -> bool {
        self.mode == 1
    }
}

/// A decoded meta message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MetaMessage {
    /// `0x00`: empty payload means "use the track's position"
    SequenceNumber(Option<u16>),
    /// `0x01..=0x09`
    Text(TextKind, Vec<u8>),
    /// `0x20`
    ChannelPrefix(u8),
    /// `0x21`
    Port(u8),
    /// `0x2F`
    EndOfTrack,
    /// `0x51`
    Tempo(Tempo),
    /// `0x54`
    SmpteOffset(SmpteOffset),
    /// `0x58`
    TimeSignature(TimeSignature),
    /// `0x59`
    KeySignature(KeySignature),
    /// `0x7F`
    SequencerSpecific(Vec<u8>),
    /// Any other type, kept verbatim
    Unknown {
        /// The meta type byte
        kind: u8,
        /// The payload
        data: Vec<u8>,
    },
}

fn expect_len(kind: u8, data: &[u8], expected: usize) -> Result<(), ParseError> {
    if data.len() != expected {
        return Err(MetaError::Length {
            kind,
            expected,
            found: data.len(),
        }
        .into());
    }
    Ok(())
}

impl MetaMessage {
    /// Decode the payload of a meta message of type `kind`.
    pub fn parse(kind: u8, data: &[u8]) -> Result<Self, ParseError> {
        if let Ok(text) = TextKind::try_from(kind) {
            return Ok(Self::Text(text, data.to_vec()));
        }
        Ok(match kind {
            0x00 => match data.len() {
                0 => Self::SequenceNumber(None),
                _ => {
                    expect_len(kind, data, 2)?;
                    Self::SequenceNumber(Some(u16::from_be_bytes([data[0], data[1]])))
                }
            },
            0x20 => {
                expect_len(kind, data, 1)?;
                Self::ChannelPrefix(data[0])
            }
            0x21 => {
                expect_len(kind, data, 1)?;
                Self::Port(data[0])
            }
            0x2F => {
                expect_len(kind, data, 0)?;
                Self::EndOfTrack
            }
            0x51 => {
                expect_len(kind, data, 3)?;
                Self::Tempo(Tempo::from_bytes([data[0], data[1], data[2]]))
            }
            0x54 => Self::SmpteOffset(SmpteOffset::parse(data)?),
            0x58 => {
                expect_len(kind, data, 4)?;
                Self::TimeSignature(TimeSignature::from_bytes([data[0], data[1], data[2], data[3]]))
            }
            0x59 => {
                expect_len(kind, data, 2)?;
                Self::KeySignature(KeySignature {
                    sharps: data[0] as i8,
                    mode: data[1],
                })
            }
            0x7F => Self::SequencerSpecific(data.to_vec()),
            _ => Self::Unknown {
                kind,
                data: data.to_vec(),
            },
        })
    }

    /// The meta type byte
    pub fn kind(&self) -> u8 {
        match self {
            Self::SequenceNumber(_) => 0x00,
            Self::Text(kind, _) => (*kind).into(),
            Self::ChannelPrefix(_) => 0x20,
            Self::Port(_) => 0x21,
            Self::EndOfTrack => 0x2F,
            Self::Tempo(_) => 0x51,
            Self::SmpteOffset(_) => 0x54,
            Self::TimeSignature(_) => 0x58,
            Self::KeySignature(_) => 0x59,
            Self::SequencerSpecific(_) => 0x7F,
            Self::Unknown { kind, .. } => *kind,
        }
    }

    /// The payload bytes, without type or length
    pub fn payload(&self) -> Vec<u8> {
        match self {
            Self::SequenceNumber(None) | Self::EndOfTrack => Vec::new(),
            Self::SequenceNumber(Some(n)) => n.to_be_bytes().to_vec(),
            Self::Text(_, data) | Self::SequencerSpecific(data) | Self::Unknown { data, .. } => {
                data.clone()
            }
            Self::ChannelPrefix(v) | Self::Port(v) => vec![*v],
            Self::Tempo(tempo) => tempo.to_bytes().to_vec(),
            Self::SmpteOffset(offset) => offset.to_bytes().to_vec(),
            Self::TimeSignature(ts) => ts.to_bytes().to_vec(),
            Self::KeySignature(ks) => vec![ks.sharps as u8, ks.mode],
        }
    }
}
