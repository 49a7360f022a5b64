#![doc = r#"
Variable-length quantities

MIDI stores delta-times and payload lengths as big-endian groups of seven
bits. Every byte except the last has its high bit set:

```text
0x00000000 -> 00
0x00000040 -> 40
0x0000007F -> 7F
0x00000080 -> 81 00
0x00002000 -> C0 00
0x00003FFF -> FF 7F
0x001FFFFF -> FF FF 7F
0x08000000 -> C0 80 80 00
0x0FFFFFFF -> FF FF FF 7F
```
"#]

use thiserror::Error;

/// The largest value a four byte quantity can carry.
pub const MAX: u32 = 0x0FFF_FFFF;

/// Why a quantity could not be encoded or decoded.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum VlqError {
    /// The input ended while a continuation bit was still set
    #[error("Stream ended inside a variable-length quantity")]
    Truncated,
    /// The fourth byte still had its continuation bit set
    #[error("Variable-length quantity is longer than four bytes")]
    TooLong,
    /// The value does not fit in 28 bits
    #[error("{0:#X} does not fit in a variable-length quantity")]
    OutOfRange(u32),
}

/// The encoded form of one quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Encoded {
    bytes: [u8; 4],
    len: usize,
}

impl Encoded {
    /// The wire bytes, most significant group first.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

/// Encode `value` into one to four bytes.
pub const fn encode(value: u32) -> Result<Encoded, VlqError> {
    if value > MAX {
        return Err(VlqError::OutOfRange(value));
    }
    let mut groups = [0u8; 4];
    let mut len = 0;
    let mut rest = value;
    loop {
        groups[len] = (rest & 0x7F) as u8;
        len += 1;
        rest >>= 7;
        if rest == 0 {
            break;
        }
    }

    // groups were collected least significant first
    let mut bytes = [0u8; 4];
    let mut i = 0;
    while i < len {
        let group = groups[len - 1 - i];
        bytes[i] = if i + 1 < len { group | 0x80 } else { group };
        i += 1;
    }
    Ok(Encoded { bytes, len })
}

/// Decode a quantity from the front of `bytes`.
///
/// Returns the value and the number of bytes consumed.
pub const fn decode(bytes: &[u8]) -> Result<(u32, usize), VlqError> {
    let mut value: u32 = 0;
    let mut i = 0;
    while i < 4 {
        if i >= bytes.len() {
            return Err(VlqError::Truncated);
        }
        let byte = bytes[i];
        value = (value << 7) | (byte & 0x7F) as u32;
        i += 1;
        if byte & 0x80 == 0 {
            return Ok((value, i));
        }
    }
    Err(VlqError::TooLong)
}
