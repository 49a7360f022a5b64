use crate::ParseError;

/// A 7-bit MIDI data byte.
///
/// Every byte after a status byte in a channel message must have its
/// high bit clear.
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Debug, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DataByte(pub(crate) u8);

impl DataByte {
    /// Check for correctness (leading 0 bit).
    pub const fn new(byte: u8) -> Result<Self, ParseError> {
        if byte & 0x80 != 0 {
            return Err(ParseError::DataByte(byte));
        }
        Ok(Self(byte))
    }

    /// Wrap without checking. The high bit is masked off.
    pub const fn new_unchecked(byte: u8) -> Self {
        Self(byte & 0x7F)
    }

    /// The 7-bit value
    pub const fn value(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for DataByte {
    type Error = ParseError;
    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<DataByte> for u8 {
    fn from(value: DataByte) -> Self {
        value.0
    }
}

#[test]
fn rejects_status_bytes() {
    assert_eq!(DataByte::new(0x7F).unwrap().value(), 0x7F);
    assert_eq!(DataByte::new(0x80), Err(ParseError::DataByte(0x80)));
    assert_eq!(DataByte::new_unchecked(0x90).value(), 0x10);
}
