#![doc = r#"
Contains types for MIDI file chunks

# Overview

MIDI files are organized into chunks, each identified by a 4-character ASCII type identifier
followed by a 32-bit big-endian length field and then the chunk data.

## Header chunk (`MThd`)

Always exactly 6 bytes: format, track count and division.

## Track chunks (`MTrk`)

One per track. The body is an event stream: delta-time, status (or running status)
and message bytes.

## Sound-resource framing

Game resources wrap the MIDI data in further chunks that come before `MThd`:

```text
[SOUN | "SOU "]           whole-resource container
  [ADL |ROL |GMD |MIDI...] target device identifier
    [MDhd]                 optional 8-byte parameter block
    [MThd]
    [MTrk] ...
```
"#]

use core::fmt;

/// A 4-character chunk type identifier.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChunkTag([u8; 4]);

impl ChunkTag {
    /// `MThd`
    pub const MTHD: Self = Self(*b"MThd");
    /// `MTrk`
    pub const MTRK: Self = Self(*b"MTrk");
    /// `MDhd`, the sound parameter block
    pub const MDHD: Self = Self(*b"MDhd");
    /// `SOUN`, the resource container
    pub const SOUN: Self = Self(*b"SOUN");
    /// `SOU `, the short resource container
    pub const SOU: Self = Self(*b"SOU ");

    /// Wrap four raw bytes.
    pub const fn new(bytes: [u8; 4]) -> Self {
        Self(bytes)
    }

    /// The raw tag bytes
    pub const fn bytes(&self) -> [u8; 4] {
        self.0
    }
}

impl fmt::Display for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in self.0 {
            if byte.is_ascii_graphic() || byte == b' ' {
                write!(f, "{}", byte as char)?;
            } else {
                write!(f, "\\x{byte:02X}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ChunkTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ChunkTag(\"{self}\")")
    }
}

#[test]
fn displays_printable_and_escaped() {
    assert_eq!(ChunkTag::SOU.to_string(), "SOU ");
    assert_eq!(ChunkTag::new([b'M', 0, b'x', 0xFF]).to_string(), "M\\x00x\\xFF");
}
