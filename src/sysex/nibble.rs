#![doc = r#"
Nibble packing

Sysex data bytes must keep their high bit clear, so 8-bit values travel as
two bytes: the high nibble first, then the low nibble.

```text
0x5A  ->  05 0A
```

An odd trailing byte is carried as-is.
"#]

use super::SysexError;

/// Unpacked sysex data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Nibbles {
    /// Merged 8-bit values, one per `(hi, lo)` pair
    pub data: Vec<u8>,
    /// The unpaired last byte of an odd-length packed region
    pub tail: Option<u8>,
}

impl Nibbles {
    /// Wrap already merged values.
    pub fn new(data: Vec<u8>) -> Self {
        Self { data, tail: None }
    }

    /// Bytes this occupies once packed
    pub fn packed_len(&self) -> usize {
        self.data.len() * 2 + usize::from(self.tail.is_some())
    }
}

/// Merge `(hi, lo)` pairs into 8-bit values.
///
/// A `hi` byte with its high bit set, or a `lo` byte with bits above the low
/// nibble, is a protocol violation. Bits 4 to 6 of a `hi` byte are allowed
/// and shift out of the merged value.
pub fn unpack(packed: &[u8]) -> Result<Nibbles, SysexError> {
    let mut data = Vec::with_capacity(packed.len() / 2);
    let mut pairs = packed.chunks_exact(2);
    for (i, pair) in pairs.by_ref().enumerate() {
        let (hi, lo) = (pair[0], pair[1]);
        if hi & 0x80 != 0 {
            return Err(SysexError::NibbleHigh {
                index: i * 2,
                byte: hi,
            });
        }
        if lo & 0xF0 != 0 {
            return Err(SysexError::NibbleLow {
                index: i * 2 + 1,
                byte: lo,
            });
        }
        data.push((hi << 4) | (lo & 0x0F));
    }
    let tail = pairs.remainder().first().copied();
    Ok(Nibbles { data, tail })
}

/// Split `nibbles` back into `(hi, lo)` pairs, appending to `out`.
pub fn pack(nibbles: &Nibbles, out: &mut Vec<u8>) {
    out.reserve(nibbles.packed_len());
    for byte in &nibbles.data {
        out.push(byte >> 4);
        out.push(byte & 0x0F);
    }
    if let Some(tail) = nibbles.tail {
        out.push(tail);
    }
}

/// The 7-bit checksum that makes `packed` plus itself sum to zero mod 128.
pub fn checksum(packed: &[u8]) -> u8 {
    let sum = packed.iter().fold(0u8, |acc, b| acc.wrapping_add(*b)) & 0x7F;
    (0x80 - sum) & 0x7F
}
