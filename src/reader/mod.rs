#![doc = r#"
Byte-precise reading primitives.

A [`Reader`] walks a borrowed byte slice. Every read either returns a
complete value or fails with [`ReaderErrorKind::TruncatedStream`] without
moving the cursor, so a failed read never yields partial data.

Sub-readers created for chunk bodies remember their absolute offset, which
is what error positions report.
"#]

mod error;
pub use error::*;

use crate::{
    ChunkError, ParseError,
    file::ChunkTag,
    vlq::{self, VlqError},
};

/// A cursor over MIDI bytes.
#[derive(Debug, Clone)]
pub struct Reader<'a> {
    data: &'a [u8],
    position: usize,
    offset: usize,
}

/// A chunk's tag and body, still undecoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawChunk<'a> {
    tag: ChunkTag,
    body: &'a [u8],
    body_offset: usize,
}

impl<'a> RawChunk<'a> {
    /// The 4-character chunk type
    pub const fn tag(&self) -> ChunkTag {
        self.tag
    }
    /// The chunk body (without the 8-byte preamble)
    pub const fn body(&self) -> &'a [u8] {
        self.body
    }
    /// A reader positioned at the start of the body
    pub const fn reader(&self) -> Reader<'a> {
        Reader {
            data: self.body,
            position: 0,
            offset: self.body_offset,
        }
    }
}

impl<'a> Reader<'a> {
    /// Read from the start of `data`.
    pub const fn from_byte_slice(data: &'a [u8]) -> Self {
        Self {
            data,
            position: 0,
            offset: 0,
        }
    }

    /// Absolute offset of the cursor in the original input
    pub const fn buffer_position(&self) -> usize {
        self.offset + self.position
    }

    /// Bytes left before the end of this reader
    pub const fn remaining(&self) -> usize {
        self.data.len() - self.position
    }

    /// True when every byte has been consumed
    pub const fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    fn truncated(&self) -> ReaderError {
        ReaderError::truncated(self.buffer_position())
    }

    /// Look at the next byte without consuming it.
    pub fn peek_u8(&self) -> ReadResult<u8> {
        self.data
            .get(self.position)
            .copied()
            .ok_or_else(|| self.truncated())
    }

    /// Consume one byte.
    pub fn read_u8(&mut self) -> ReadResult<u8> {
        let byte = self.peek_u8()?;
        self.position += 1;
        Ok(byte)
    }

    /// Step the cursor back over bytes that were already consumed.
    ///
    /// Running status uses this to re-read a data byte that was first
    /// taken for a status byte.
    pub fn rewind(&mut self, count: usize) {
        self.position = self.position.saturating_sub(count);
    }

    /// Consume `len` bytes.
    pub fn read_exact(&mut self, len: usize) -> ReadResult<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.truncated());
        }
        let bytes = &self.data[self.position..self.position + len];
        self.position += len;
        Ok(bytes)
    }

    /// Consume exactly `N` bytes into an array.
    pub fn read_exact_size<const N: usize>(&mut self) -> ReadResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_exact(N)?);
        Ok(out)
    }

    /// Big-endian u16
    pub fn read_u16(&mut self) -> ReadResult<u16> {
        self.read_exact_size().map(u16::from_be_bytes)
    }

    /// Big-endian u32
    pub fn read_u32(&mut self) -> ReadResult<u32> {
        self.read_exact_size().map(u32::from_be_bytes)
    }

    /// A variable-length quantity.
    pub fn read_vlq(&mut self) -> ReadResult<u32> {
        match vlq::decode(&self.data[self.position..]) {
            Ok((value, used)) => {
                self.position += used;
                Ok(value)
            }
            Err(VlqError::Truncated) => Err(self.truncated()),
            Err(_) => Err(inv_data(self, ParseError::VlqTooLong)),
        }
    }

    /// A VLQ length followed by that many bytes.
    pub fn read_vlq_bytes(&mut self) -> ReadResult<&'a [u8]> {
        let start = self.position;
        let len = self.read_vlq()? as usize;
        self.read_exact(len).inspect_err(|_| self.position = start)
    }

    /// A 4-character chunk tag.
    pub fn read_tag(&mut self) -> ReadResult<ChunkTag> {
        self.read_exact_size().map(ChunkTag::new)
    }

    /// Look at the next chunk tag without consuming it.
    pub fn peek_tag(&self) -> ReadResult<ChunkTag> {
        self.clone().read_tag()
    }

    /// A whole chunk: tag, length and body.
    ///
    /// Fails if the declared length runs past the end of this reader.
    pub fn read_chunk(&mut self) -> ReadResult<RawChunk<'a>> {
        let start = self.position;
        let tag = self.read_tag()?;
        let declared = match self.read_u32() {
            Ok(len) => len,
            Err(e) => {
                self.position = start;
                return Err(e);
            }
        };
        let available = self.remaining();
        if declared as usize > available {
            let err = inv_data(
                self,
                ChunkError::Overrun {
                    tag,
                    declared,
                    available,
                },
            );
            self.position = start;
            return Err(err);
        }
        let body_offset = self.buffer_position();
        let body = self.read_exact(declared as usize)?;
        Ok(RawChunk {
            tag,
            body,
            body_offset,
        })
    }

    /// Read a chunk that must carry `expected` as its tag.
    pub fn read_chunk_tagged(&mut self, expected: ChunkTag) -> ReadResult<RawChunk<'a>> {
        let at = self.buffer_position();
        let chunk = self.read_chunk()?;
        if chunk.tag != expected {
            return Err(ReaderError::new(
                at,
                ReaderErrorKind::chunk(ChunkError::UnexpectedTag {
                    expected,
                    found: chunk.tag,
                }),
            ));
        }
        Ok(chunk)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_big_endian() {
        let mut reader = Reader::from_byte_slice(&[0x01, 0xE0, 0x00, 0x00, 0x00, 0x06]);
        assert_eq!(reader.read_u16().unwrap(), 480);
        assert_eq!(reader.read_u32().unwrap(), 6);
        assert!(reader.is_empty());
    }

    #[test]
    fn truncation_does_not_consume() {
        let mut reader = Reader::from_byte_slice(&[0x00, 0x01, 0x02]);
        let err = reader.read_u32().unwrap_err();
        assert!(err.is_truncated());
        assert_eq!(err.position(), 0);
        assert_eq!(reader.remaining(), 3);
        assert_eq!(reader.read_u16().unwrap(), 1);
    }

    #[test]
    fn vlq_truncated_mid_sequence() {
        let mut reader = Reader::from_byte_slice(&[0x81, 0x80]);
        assert!(reader.read_vlq().unwrap_err().is_truncated());
        assert_eq!(reader.remaining(), 2);
    }

    #[test]
    fn rewind_rereads() {
        let mut reader = Reader::from_byte_slice(&[0x3C, 0x40]);
        assert_eq!(reader.read_u8().unwrap(), 0x3C);
        reader.rewind(1);
        assert_eq!(reader.read_u8().unwrap(), 0x3C);
    }

    #[test]
    fn chunk_overrun_is_an_error() {
        let bytes = [b'M', b'T', b'r', b'k', 0, 0, 0, 9, 0x00];
        let mut reader = Reader::from_byte_slice(&bytes);
        let err = reader.read_chunk().unwrap_err();
        assert_eq!(
            err.parse_error(),
            Some(&ParseError::Chunk(ChunkError::Overrun {
                tag: ChunkTag::MTRK,
                declared: 9,
                available: 1,
            }))
        );
    }

    #[test]
    fn sub_reader_reports_absolute_positions() {
        let bytes = [b'M', b'T', b'r', b'k', 0, 0, 0, 2, 0x00, 0x81];
        let mut reader = Reader::from_byte_slice(&bytes);
        let chunk = reader.read_chunk().unwrap();
        let mut body = chunk.reader();
        assert_eq!(body.read_u8().unwrap(), 0);
        let err = body.read_vlq().unwrap_err();
        assert_eq!(err.position(), 9);
    }
}
