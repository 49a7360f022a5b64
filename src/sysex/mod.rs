#![doc = r#"
System exclusive messages and the manufacturer-keyed sub-codec.

A sysex payload starts with a manufacturer ID: one byte, or three when the
first is `0x00`. The rest of the payload is handed to whatever
[`SysexParser`] the [`SysexRegistry`] holds for that manufacturer; without
one the payload stays opaque.

```text
F0 <len> | 7D | 30 | 02 | 00 03 00 01 ... | F7
         | id | type | ch | nibble-packed  |
```
"#]

pub mod imuse;
pub use imuse::{ImuseGeneration, ImuseMessage, ImuseParser};

pub mod nibble;
pub use nibble::Nibbles;

use std::{collections::HashMap, fmt, sync::Arc};
use thiserror::Error;

/// Protocol violations inside a sysex payload.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SysexError {
    /// The payload is too short to hold a manufacturer ID
    #[error("Missing manufacturer ID")]
    MissingManufacturer,
    /// No message-type byte after the manufacturer
    #[error("Missing message type")]
    MissingType,
    /// No channel byte where the message kind requires one
    #[error("Message type {0:#04X} is missing its channel byte")]
    MissingChannel(u8),
    /// A plain leading byte had its high bit set
    #[error("Leading byte {0:#04X} has its high bit set")]
    LeadingByte(u8),
    /// The high half of a nibble pair had its high bit set
    #[error("Nibble pair byte {index} ({byte:#04X}) has its high bit set")]
    NibbleHigh {
        /// Offset within the packed region
        index: usize,
        /// The offending byte
        byte: u8,
    },
    /// The low half of a nibble pair had bits above the low nibble
    #[error("Nibble pair byte {index} ({byte:#04X}) exceeds a nibble")]
    NibbleLow {
        /// Offset within the packed region
        index: usize,
        /// The offending byte
        byte: u8,
    },
    /// A fixed-layout message unpacked to the wrong number of bytes
    #[error("Message type {kind:#04X} needs {expected} unpacked bytes, found {found}")]
    Length {
        /// The message type byte
        kind: u8,
        /// Bytes the layout needs
        expected: usize,
        /// Bytes the payload held
        found: usize,
    },
    /// A fixed-layout message ended on an unpaired byte
    #[error("Message type {0:#04X} has an unpaired trailing byte")]
    UnpairedByte(u8),
    /// A boolean field held something other than 0 or 1
    #[error("Message type {kind:#04X} flag field holds {value}")]
    Flag {
        /// The message type byte
        kind: u8,
        /// The stored value
        value: u8,
    },
    /// A setup transfer ended before its checksum byte
    #[error("Message type {0:#04X} is missing its checksum")]
    MissingChecksum(u8),
    /// A setup transfer failed its checksum
    #[error("Checksum {found:#04X} does not match computed {expected:#04X}")]
    Checksum {
        /// Computed from the payload
        expected: u8,
        /// Carried by the payload
        found: u8,
    },
}

/// A sysex manufacturer ID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ManufacturerId {
    /// One byte, `0x01..=0x7F`
    Standard(u8),
    /// `0x00` followed by two bytes
    Extended([u8; 2]),
}

impl ManufacturerId {
    /// The ID the iMUSE engine uses (the non-commercial ID)
    pub const IMUSE: Self = Self::Standard(0x7D);

    /// Split a payload into its manufacturer ID and the remaining bytes.
    pub fn split(payload: &[u8]) -> Result<(Self, &[u8]), SysexError> {
        match payload {
            [0x00, a, b, rest @ ..] => Ok((Self::Extended([*a, *b]), rest)),
            [0x00, ..] | [] => Err(SysexError::MissingManufacturer),
            [id, rest @ ..] => Ok((Self::Standard(*id), rest)),
        }
    }

    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Standard(id) => out.push(*id),
            Self::Extended([a, b]) => out.extend_from_slice(&[0x00, *a, *b]),
        }
    }
}

impl fmt::Display for ManufacturerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Standard(id) => write!(f, "{id:02X}"),
            Self::Extended([a, b]) => write!(f, "00 {a:02X} {b:02X}"),
        }
    }
}

/// The manufacturer-specific part of a sysex message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SysexContent {
    /// No parser was registered for the manufacturer
    Opaque(Vec<u8>),
    /// Decoded by the iMUSE parser
    Imuse(ImuseMessage),
}

impl SysexContent {
    fn write(&self, out: &mut Vec<u8>) {
        match self {
            Self::Opaque(bytes) => out.extend_from_slice(bytes),
            Self::Imuse(msg) => msg.write(out),
        }
    }
}

/// Decodes the bytes that follow one manufacturer's ID.
pub trait SysexParser: Send + Sync {
    /// Decode `body`, the payload after the manufacturer ID and before `F7`.
    fn parse(&self, body: &[u8]) -> Result<SysexContent, SysexError>;
}

/// Parsers keyed by manufacturer, consulted while a file is loaded.
#[derive(Clone, Default)]
pub struct SysexRegistry {
    parsers: HashMap<ManufacturerId, Arc<dyn SysexParser>>,
}

impl fmt::Debug for SysexRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.parsers.keys()).finish()
    }
}

impl SysexRegistry {
    /// No parsers: every sysex stays opaque
    pub fn empty() -> Self {
        Self::default()
    }

    /// The first-generation iMUSE parser under [`ManufacturerId::IMUSE`]
    pub fn with_imuse() -> Self {
        Self::with_imuse_generation(ImuseGeneration::V1)
    }

    /// The iMUSE parser for `generation` under [`ManufacturerId::IMUSE`]
    pub fn with_imuse_generation(generation: ImuseGeneration) -> Self {
        let mut registry = Self::empty();
        registry.register(ManufacturerId::IMUSE, ImuseParser::new(generation));
        registry
    }

    /// Install `parser` for `id`, replacing any previous one.
    pub fn register(&mut self, id: ManufacturerId, parser: impl SysexParser + 'static) {
        self.parsers.insert(id, Arc::new(parser));
    }

    /// The parser for `id`
    pub fn get(&self, id: ManufacturerId) -> Option<&dyn SysexParser> {
        self.parsers.get(&id).map(|p| p.as_ref())
    }
}

/// A decoded `F0` message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SysExMessage {
    manufacturer: ManufacturerId,
    content: SysexContent,
    terminated: bool,
    /// The body as read, when `content` would not reproduce it
    verbatim: Option<Vec<u8>>,
}

impl SysExMessage {
    /// A complete message, terminated by `F7`.
    pub const fn new(manufacturer: ManufacturerId, content: SysexContent) -> Self {
        Self {
            manufacturer,
            content,
            terminated: true,
            verbatim: None,
        }
    }

    /// Decode the bytes that followed `F0` and its length.
    ///
    /// Nibble pairs whose high byte uses bits 4 to 6 decode as if those bits
    /// were clear. The original bytes are kept so the message still encodes
    /// to exactly what was read.
    pub fn decode(payload: &[u8], registry: &SysexRegistry) -> Result<Self, SysexError> {
        let (payload, terminated) = match payload.split_last() {
            Some((&0xF7, rest)) => (rest, true),
            _ => (payload, false),
        };
        let (manufacturer, body) = ManufacturerId::split(payload)?;
        let content = match registry.get(manufacturer) {
            Some(parser) => parser.parse(body)?,
            None => SysexContent::Opaque(body.to_vec()),
        };
        let mut rewritten = Vec::with_capacity(body.len());
        content.write(&mut rewritten);
        let verbatim = (rewritten != body).then(|| body.to_vec());
        Ok(Self {
            manufacturer,
            content,
            terminated,
            verbatim,
        })
    }

    /// The bytes that follow `F0` and its length.
    pub fn to_payload(&self) -> Vec<u8> {
        let mut out = Vec::new();
        self.manufacturer.write(&mut out);
        match &self.verbatim {
            Some(body) => out.extend_from_slice(body),
            None => self.content.write(&mut out),
        }
        if self.terminated {
            out.push(0xF7);
        }
        out
    }

    /// Who defined the payload
    pub const fn manufacturer(&self) -> ManufacturerId {
        self.manufacturer
    }

    /// The decoded payload
    pub const fn content(&self) -> &SysexContent {
        &self.content
    }

    /// The iMUSE message, if this is one
    pub const fn as_imuse(&self) -> Option<&ImuseMessage> {
        match &self.content {
            SysexContent::Imuse(msg) => Some(msg),
            SysexContent::Opaque(_) => None,
        }
    }

    /// True if the payload ended with `F7`
    pub const fn is_terminated(&self) -> bool {
        self.terminated
    }
}
