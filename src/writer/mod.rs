#![doc = r#"
Byte-precise writing primitives.

The [`Writer`] mirrors the [`Reader`](crate::reader::Reader). Chunk lengths are
never computed ahead of time: [`Writer::begin_chunk`] writes the tag and a zero
placeholder, the body is written, and [`Writer::end_chunk`] backpatches the
real length. Chunks nest, which is how sound-resource framing wraps `MThd`.
"#]

use crate::{
    file::ChunkTag,
    vlq::{self, VlqError},
};
use std::io;
use thiserror::Error;

/// Errors that can occur while encoding
#[derive(Debug, Error)]
pub enum WriteError {
    /// A delta-time or payload length did not fit in a VLQ
    #[error("Value {0:#X} does not fit in a variable-length quantity")]
    VlqOutOfRange(u32),
    /// A delta-time larger than 28 bits
    #[error("Delta time {0} is too large to encode")]
    DeltaTooLarge(u64),
    /// A chunk body larger than 4 GiB
    #[error("Chunk {tag} body of {len} bytes does not fit a 32-bit length")]
    ChunkTooLarge {
        /// The chunk being closed
        tag: ChunkTag,
        /// Its body length
        len: usize,
    },
    /// More tracks than the header's 16-bit count can declare
    #[error("{0} tracks do not fit a 16-bit track count")]
    TrackCount(usize),
    /// A format 0 file must hold exactly one track
    #[error("Format 0 requires exactly one track, file has {0}")]
    SingleTrackFormat(usize),
    /// The underlying sink failed
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<VlqError> for WriteError {
    fn from(value: VlqError) -> Self {
        match value {
            VlqError::OutOfRange(v) => Self::VlqOutOfRange(v),
            // encode only ever reports OutOfRange
            VlqError::Truncated | VlqError::TooLong => Self::VlqOutOfRange(vlq::MAX),
        }
    }
}

/// Options that shape the bytes of an encoded file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WriteOptions {
    /// Omit a channel status byte when it repeats the previous one
    pub running_status: bool,
}

impl WriteOptions {
    /// Write every status byte.
    pub const fn explicit_status() -> Self {
        Self {
            running_status: false,
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self {
            running_status: true,
        }
    }
}

/// A chunk whose length is still a placeholder.
#[must_use = "an open chunk must be closed with Writer::end_chunk"]
#[derive(Debug)]
pub struct OpenChunk {
    tag: ChunkTag,
    length_at: usize,
}

/// Running status on the encode side.
#[derive(Debug, Default, Clone, Copy)]
pub struct RunningStatus {
    enabled: bool,
    current: Option<u8>,
}

impl RunningStatus {
    /// Track running status according to `options`.
    pub const fn new(options: WriteOptions) -> Self {
        Self {
            enabled: options.running_status,
            current: None,
        }
    }

    /// The status byte to emit for a message, or `None` to omit it.
    pub fn encode(&mut self, status: u8) -> Option<u8> {
        if status >= 0xF0 {
            self.current = None;
            return Some(status);
        }
        if self.enabled && self.current == Some(status) {
            return None;
        }
        self.current = Some(status);
        Some(status)
    }
}

/// Growable output buffer with chunk bookkeeping.
#[derive(Debug, Default)]
pub struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    /// An empty writer
    pub fn new() -> Self {
        Self::default()
    }

    /// Current length of the output, i.e. the next write position
    pub fn position(&self) -> usize {
        self.buf.len()
    }

    /// The bytes written so far
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    /// Finish writing.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    /// One byte
    pub fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    /// Big-endian u16
    pub fn write_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Big-endian u32
    pub fn write_u32(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    /// Raw bytes
    pub fn write_bytes(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// A chunk tag
    pub fn write_tag(&mut self, tag: ChunkTag) {
        self.buf.extend_from_slice(&tag.bytes());
    }

    /// A variable-length quantity
    pub fn write_vlq(&mut self, value: u32) -> Result<(), WriteError> {
        let encoded = vlq::encode(value)?;
        self.buf.extend_from_slice(encoded.as_bytes());
        Ok(())
    }

    /// A VLQ length prefix followed by `bytes`
    pub fn write_vlq_bytes(&mut self, bytes: &[u8]) -> Result<(), WriteError> {
        let len = u32::try_from(bytes.len()).map_err(|_| WriteError::VlqOutOfRange(u32::MAX))?;
        self.write_vlq(len)?;
        self.write_bytes(bytes);
        Ok(())
    }

    /// Write `tag` and a zero length placeholder.
    pub fn begin_chunk(&mut self, tag: ChunkTag) -> OpenChunk {
        self.write_tag(tag);
        let length_at = self.position();
        self.write_u32(0);
        OpenChunk { tag, length_at }
    }

    /// Backpatch the length of `chunk` and return it.
    pub fn end_chunk(&mut self, chunk: OpenChunk) -> Result<u32, WriteError> {
        let body = self.position() - chunk.length_at - 4;
        let len = u32::try_from(body).map_err(|_| WriteError::ChunkTooLarge {
            tag: chunk.tag,
            len: body,
        })?;
        self.buf[chunk.length_at..chunk.length_at + 4].copy_from_slice(&len.to_be_bytes());
        Ok(len)
    }
}
