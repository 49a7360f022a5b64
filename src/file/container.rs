#![doc = r#"
Sound-resource framing that may precede `MThd`.

```text
SOUN <len>              container, len == every byte that follows
  ADL  <len>            target device, len == every byte that follows
    MDhd 00 00 00 08    parameter block
      priority volume pan transpose detune speed 00 00
    MThd ...
    MTrk ...
```

Each level is optional, but they must appear in this order and at most once.
Anything else in front of `MThd` is a hard error.
"#]

use super::ChunkTag;
use crate::{
    ContainerError,
    reader::{ReadResult, Reader, inv_data},
    writer::{OpenChunk, WriteError, Writer},
};
use log::debug;

/// The device a sound resource was authored for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Target {
    /// `ADL `, AdLib
    AdLib,
    /// `ROL `, Roland MT-32
    Roland,
    /// `GMD `, General MIDI
    GeneralMidi,
    /// `MIDI`, plain MIDI
    Midi,
    /// `SPK `, PC speaker
    Speaker,
    /// `PCS `, PCjr sound
    PcSound,
    /// `AMI `, Amiga
    Amiga,
}

impl Target {
    const ALL: [Self; 7] = [
        Self::AdLib,
        Self::Roland,
        Self::GeneralMidi,
        Self::Midi,
        Self::Speaker,
        Self::PcSound,
        Self::Amiga,
    ];

    /// The chunk tag that identifies the target
    pub const fn tag(&self) -> ChunkTag {
        ChunkTag::new(match self {
            Self::AdLib => *b"ADL ",
            Self::Roland => *b"ROL ",
            Self::GeneralMidi => *b"GMD ",
            Self::Midi => *b"MIDI",
            Self::Speaker => *b"SPK ",
            Self::PcSound => *b"PCS ",
            Self::Amiga => *b"AMI ",
        })
    }

    /// The target a tag identifies, if any
    pub fn from_tag(tag: ChunkTag) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.tag() == tag)
    }
}

/// The 8-byte `MDhd` parameter block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SoundParameters {
    /// Sound priority
    pub priority: u8,
    /// Master volume
    pub volume: u8,
    /// Pan offset
    pub pan: i8,
    /// Semitones
    pub transpose: i8,
    /// Fine tuning
    pub detune: i8,
    /// Playback speed
    pub speed: u8,
    /// Two trailing bytes, kept for byte-exact output
    pub reserved: [u8; 2],
}

impl SoundParameters {
    fn from_bytes(b: [u8; 8]) -> Self {
        Self {
            priority: b[0],
            volume: b[1],
            pan: b[2] as i8,
            transpose: b[3] as i8,
            detune: b[4] as i8,
            speed: b[5],
            reserved: [b[6], b[7]],
        }
    }

    fn to_bytes(self) -> [u8; 8] {
        [
            self.priority,
            self.volume,
            self.pan as u8,
            self.transpose as u8,
            self.detune as u8,
            self.speed,
            self.reserved[0],
            self.reserved[1],
        ]
    }
}

/// Everything found in front of `MThd`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Framing {
    /// `SOUN` or `SOU `
    pub container: Option<ChunkTag>,
    /// The target device chunk
    pub target: Option<Target>,
    /// The `MDhd` block
    pub parameters: Option<SoundParameters>,
}

/// Returned by [`Framing::write_open`], closed by [`Framing::write_close`].
#[must_use]
#[derive(Debug)]
pub(crate) struct OpenFraming {
    container: Option<OpenChunk>,
    target: Option<OpenChunk>,
}

impl Framing {
    /// True when the file is bare SMF
    pub fn is_empty(&self) -> bool {
        self.container.is_none() && self.target.is_none() && self.parameters.is_none()
    }

    /// Consume framing chunks until the reader stands at `MThd`.
    pub(crate) fn read(reader: &mut Reader<'_>) -> ReadResult<Self> {
        let mut framing = Self::default();
        loop {
            let at = reader.clone();
            let tag = reader.peek_tag()?;
            if tag == ChunkTag::MTHD {
                return Ok(framing);
            }

            if tag == ChunkTag::SOUN || tag == ChunkTag::SOU {
                if framing.container.is_some() {
                    return Err(inv_data(&at, ContainerError::Duplicate(tag)));
                }
                if framing.target.is_some() || framing.parameters.is_some() {
                    return Err(inv_data(&at, ContainerError::Misordered(tag)));
                }
                enclosing(reader, tag)?;
                debug!("sound resource container {tag}");
                framing.container = Some(tag);
            } else if let Some(target) = Target::from_tag(tag) {
                if framing.target.is_some() {
                    return Err(inv_data(&at, ContainerError::Duplicate(tag)));
                }
                if framing.parameters.is_some() {
                    return Err(inv_data(&at, ContainerError::Misordered(tag)));
                }
                enclosing(reader, tag)?;
                debug!("sound resource target {tag}");
                framing.target = Some(target);
            } else if tag == ChunkTag::MDHD {
                if framing.parameters.is_some() {
                    return Err(inv_data(&at, ContainerError::Duplicate(tag)));
                }
                let chunk = reader.read_chunk()?;
                let bytes: [u8; 8] = chunk.body().try_into().map_err(|_| {
                    inv_data(&at, ContainerError::ParameterLength(chunk.body().len() as u32))
                })?;
                framing.parameters = Some(SoundParameters::from_bytes(bytes));
            } else {
                return Err(inv_data(&at, ContainerError::UnknownTag(tag)));
            }
        }
    }

    pub(crate) fn write_open(&self, writer: &mut Writer) -> OpenFraming {
        let container = self.container.map(|tag| writer.begin_chunk(tag));
        let target = self.target.map(|t| writer.begin_chunk(t.tag()));
        if let Some(parameters) = self.parameters {
            writer.write_tag(ChunkTag::MDHD);
            writer.write_u32(8);
            writer.write_bytes(&parameters.to_bytes());
        }
        OpenFraming { container, target }
    }

    pub(crate) fn write_close(writer: &mut Writer, open: OpenFraming) -> Result<(), WriteError> {
        if let Some(target) = open.target {
            writer.end_chunk(target)?;
        }
        if let Some(container) = open.container {
            writer.end_chunk(container)?;
        }
        Ok(())
    }
}

/// Read a framing chunk header whose length must span the rest of the stream.
fn enclosing(reader: &mut Reader<'_>, tag: ChunkTag) -> ReadResult<()> {
    let at = reader.clone();
    reader.read_tag()?;
    let declared = reader.read_u32()?;
    let actual = reader.remaining();
    if declared as usize != actual {
        return Err(inv_data(
            &at,
            ContainerError::LengthMismatch {
                tag,
                declared,
                actual,
            },
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ParseError;
    use pretty_assertions::assert_eq;

    fn framed(tags: &[(&[u8; 4], Option<u32>)], rest: &[u8]) -> Vec<u8> {
        // lengths of None are computed to span everything after
        let mut out = Vec::new();
        let mut fixups = Vec::new();
        for (tag, len) in tags {
            out.extend_from_slice(*tag);
            fixups.push((out.len(), *len));
            out.extend_from_slice(&[0; 4]);
        }
        out.extend_from_slice(rest);
        for (at, len) in fixups {
            let len = len.unwrap_or((out.len() - at - 4) as u32);
            out[at..at + 4].copy_from_slice(&len.to_be_bytes());
        }
        out
    }

    const MTHD: [u8; 4] = *b"MThd";

    #[test]
    fn reads_container_target_and_parameters() {
        let mut rest = vec![b'M', b'D', b'h', b'd', 0, 0, 0, 8, 1, 2, 0xFE, 3, 4, 5, 0, 0];
        rest.extend_from_slice(&MTHD);
        let bytes = framed(&[(b"SOUN", None), (b"ADL ", None)], &rest);

        let mut reader = Reader::from_byte_slice(&bytes);
        let framing = Framing::read(&mut reader).unwrap();
        assert_eq!(framing.container, Some(ChunkTag::SOUN));
        assert_eq!(framing.target, Some(Target::AdLib));
        assert_eq!(
            framing.parameters,
            Some(SoundParameters {
                priority: 1,
                volume: 2,
                pan: -2,
                transpose: 3,
                detune: 4,
                speed: 5,
                reserved: [0, 0],
            })
        );
        assert_eq!(reader.peek_tag().unwrap(), ChunkTag::MTHD);
    }

    #[test]
    fn bare_files_have_no_framing() {
        let mut reader = Reader::from_byte_slice(&MTHD);
        assert!(Framing::read(&mut reader).unwrap().is_empty());
        assert_eq!(reader.remaining(), 4);
    }

    #[test]
    fn container_length_must_span_the_rest() {
        let bytes = framed(&[(b"SOU ", Some(99))], &MTHD);
        let err = Framing::read(&mut Reader::from_byte_slice(&bytes)).unwrap_err();
        assert_eq!(err.position(), 0);
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Container(ContainerError::LengthMismatch {
                tag: ChunkTag::SOU,
                declared: 99,
                actual: 4,
            }))
        );
    }

    #[test]
    fn unknown_leading_chunk_is_an_error() {
        let bytes = framed(&[(b"RIFF", None)], &MTHD);
        let err = Framing::read(&mut Reader::from_byte_slice(&bytes)).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Container(ContainerError::UnknownTag(
                ChunkTag::new(*b"RIFF")
            )))
        );
    }

    #[test]
    fn order_is_enforced() {
        let bytes = framed(&[(b"GMD ", None), (b"SOUN", None)], &MTHD);
        let err = Framing::read(&mut Reader::from_byte_slice(&bytes)).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Container(ContainerError::Misordered(
                ChunkTag::SOUN
            )))
        );
    }

    #[test]
    fn parameter_block_is_eight_bytes() {
        let mut rest = vec![b'M', b'D', b'h', b'd', 0, 0, 0, 2, 1, 2];
        rest.extend_from_slice(&MTHD);
        let err = Framing::read(&mut Reader::from_byte_slice(&rest)).unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Container(ContainerError::ParameterLength(2)))
        );
    }

    #[test]
    fn writes_back_with_recomputed_lengths() {
        let framing = Framing {
            container: Some(ChunkTag::SOUN),
            target: Some(Target::Roland),
            parameters: Some(SoundParameters::default()),
        };
        let mut writer = Writer::new();
        let open = framing.write_open(&mut writer);
        writer.write_bytes(&MTHD);
        Framing::write_close(&mut writer, open).unwrap();

        let bytes = writer.into_bytes();
        assert_eq!(&bytes[0..8], b"SOUN\x00\x00\x00\x1C");
        assert_eq!(&bytes[8..16], b"ROL \x00\x00\x00\x14");

        let mut reader = Reader::from_byte_slice(&bytes);
        assert_eq!(Framing::read(&mut reader).unwrap(), framing);
    }
}
