use super::{ChunkTag, Format, Timing};
use crate::{
    HeaderError,
    reader::{RawChunk, ReadResult, inv_data},
    writer::{WriteError, Writer},
};

#[doc = r#"
The decoded `MThd` chunk.

```text
MThd 00 00 00 06 | format u16 | track count u16 | division u16
```
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Header {
    /// The format word
    pub format: Format,
    /// How many `MTrk` chunks follow
    pub track_count: u16,
    /// The division word
    pub timing: Timing,
}

impl Header {
    pub(crate) fn read(chunk: RawChunk<'_>) -> ReadResult<Self> {
        let mut reader = chunk.reader();
        if chunk.body().len() != 6 {
            return Err(inv_data(
                &reader,
                HeaderError::Length(chunk.body().len() as u32),
            ));
        }
        let word = reader.read_u16()?;
        let format =
            Format::try_from(word).map_err(|_| inv_data(&reader, HeaderError::InvalidFormat(word)))?;
        let track_count = reader.read_u16()?;
        if format == Format::SingleMultiChannel && track_count != 1 {
            return Err(inv_data(&reader, HeaderError::SingleTrackCount(track_count)));
        }
        let timing = Timing::from_division(reader.read_u16()?).map_err(|e| inv_data(&reader, e))?;
        Ok(Self {
            format,
            track_count,
            timing,
        })
    }

    pub(crate) fn write(&self, writer: &mut Writer) -> Result<(), WriteError> {
        let chunk = writer.begin_chunk(ChunkTag::MTHD);
        writer.write_u16(self.format.into());
        writer.write_u16(self.track_count);
        writer.write_u16(self.timing.to_division());
        writer.end_chunk(chunk)?;
        Ok(())
    }
}
