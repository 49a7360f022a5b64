use crate::{file::ChunkTag, sysex::SysexError};
use thiserror::Error;

#[doc = r#"
Everything that can be wrong with the bytes of a MIDI stream.

These are the format and protocol errors: they are fatal to the file or track
being parsed and are never recovered from. They reach the caller wrapped in a
[`ReaderError`](crate::reader::ReaderError), which adds the byte offset.
"#]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// Chunk framing
    #[error("Chunk: {0}")]
    Chunk(#[from] ChunkError),
    /// The `MThd` chunk
    #[error("Header: {0}")]
    Header(#[from] HeaderError),
    /// Sound-resource framing that precedes `MThd`
    #[error("Container: {0}")]
    Container(#[from] ContainerError),
    /// An `MTrk` event stream
    #[error("Malformed track: {0}")]
    MalformedTrack(#[from] TrackError),
    /// A meta message payload
    #[error("Meta: {0}")]
    Meta(#[from] MetaError),
    /// SMPTE timing or offset values
    #[error("SMPTE: {0}")]
    Smpte(#[from] SmpteError),
    /// A system exclusive payload
    #[error("Malformed sysex: {0}")]
    MalformedSysex(#[from] SysexError),
    /// File level consistency
    #[error("File: {0}")]
    File(#[from] FileError),
    /// A data byte had its high bit set
    #[error("Data byte {0:#04X} has its high bit set")]
    DataByte(u8),
    /// A variable-length quantity did not terminate within four bytes
    #[error("Variable-length quantity is longer than four bytes")]
    VlqTooLong,
}

/// Errors in the 8-byte `tag + length` framing of a chunk.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// A specific chunk was required here
    #[error("Expected chunk {expected}, found {found}")]
    UnexpectedTag {
        /// What the parser needed
        expected: ChunkTag,
        /// What the stream contained
        found: ChunkTag,
    },
    /// The declared length runs past the end of the stream
    #[error("Chunk {tag} declares {declared} bytes but only {available} remain")]
    Overrun {
        /// The chunk
        tag: ChunkTag,
        /// Declared body length
        declared: u32,
        /// Bytes left in the stream
        available: usize,
    },
}

/// Errors in the `MThd` chunk.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HeaderError {
    /// `MThd` must carry exactly six bytes
    #[error("Header chunk length must be 6, found {0}")]
    Length(u32),
    /// Format word outside 0..=2
    #[error("Invalid format {0}")]
    InvalidFormat(u16),
    /// A format 0 file with other than one track
    #[error("Format 0 requires exactly one track, header declares {0}")]
    SingleTrackCount(u16),
}

/// Errors in the sound-resource framing chunks that may precede `MThd`.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ContainerError {
    /// Not a container, target or parameter chunk
    #[error("Unrecognized leading chunk {0}")]
    UnknownTag(ChunkTag),
    /// A container or target chunk must span the rest of the stream
    #[error("Chunk {tag} declares {declared} bytes but encloses {actual}")]
    LengthMismatch {
        /// The chunk
        tag: ChunkTag,
        /// Declared body length
        declared: u32,
        /// Bytes actually enclosed
        actual: usize,
    },
    /// The same framing level appeared twice
    #[error("Duplicate framing chunk {0}")]
    Duplicate(ChunkTag),
    /// A container chunk after a target chunk
    #[error("Container chunk {0} must precede any target chunk")]
    Misordered(ChunkTag),
    /// `MDhd` must carry exactly eight bytes
    #[error("Parameter block must be 8 bytes, found {0}")]
    ParameterLength(u32),
}

/// Errors in the event stream of an `MTrk` chunk.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TrackError {
    /// A data byte where a status byte was needed, and no running status to reuse
    #[error("Data byte {0:#04X} with no running status")]
    RunningStatusWithoutStatus(u8),
    /// System common / realtime status bytes cannot appear in a file
    #[error("Status byte {0:#04X} is not valid in a track")]
    InvalidStatus(u8),
}

/// Errors in the payload of a meta message.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MetaError {
    /// A fixed-size meta message had the wrong payload length
    #[error("Meta type {kind:#04X} requires {expected} bytes, found {found}")]
    Length {
        /// The meta type byte
        kind: u8,
        /// The length the type requires
        expected: usize,
        /// The length the stream declared
        found: usize,
    },
}

#[doc = r#"
A set of errors that can occur when parsing SMPTE values
"#]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SmpteError {
    /// The division word's high byte must be -24, -25, -29 or -30
    #[error("Invalid SMPTE frame rate selector {0}")]
    HeaderFrameTime(i8),
    /// Offsets must be exactly 5 bytes
    #[error("SMPTE offset must be 5 bytes, found {0}")]
    Length(usize),
    /// The two frame rate bits of an offset
    #[error("Invalid SMPTE offset frame type {0}")]
    TrackFrame(u8),
    /// Hours above 23
    #[error("Invalid hour offset {0}")]
    HourOffset(u8),
    /// Minutes above 59
    #[error("Invalid minute offset {0}")]
    MinuteOffset(u8),
    /// Seconds above 59
    #[error("Invalid second offset {0}")]
    SecondOffset(u8),
    /// Subframes above 99
    #[error("Invalid subframe {0}")]
    Subframe(u8),
}

/// File level consistency errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FileError {
    /// Fewer tracks than the header declared
    #[error("Header declares {declared} tracks, found {found}")]
    TrackCount {
        /// From the header
        declared: u16,
        /// Parsed
        found: usize,
    },
    /// A second track pushed onto a format 0 file
    #[error("Format 0 files hold exactly one track")]
    SingleTrackFormat,
    /// An event was appended before the end of its track
    #[error("Event at tick {tick} precedes the end of the track at {last}")]
    OutOfOrder {
        /// The rejected event's tick
        tick: u64,
        /// The current last tick of the track
        last: u64,
    },
}
