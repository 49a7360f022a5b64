use core::fmt;

use crate::{DataByte, ParseError};

#[doc = r#"
A key number read as a named pitch.

Key `0` is `C-1`, key `60` is `C4` and key `127` is `G9`.

# Example
```rust
# use imuse_midi::prelude::*;
let note = Note::from_databyte(61u8).unwrap();
assert_eq!(note.pitch_class(), PitchClass::CSharp);
assert_eq!(note.octave(), 4);
assert_eq!(note.to_string(), "C#4");
```
"#]
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Note(DataByte);

impl Note {
    /// Checks the leading bit.
    pub fn from_databyte<B>(rep: B) -> Result<Self, ParseError>
    where
        B: TryInto<DataByte, Error = ParseError>,
    {
        rep.try_into().map(Self)
    }

    /// The note `pitch_class` in `octave`, if it is in the key range.
    pub const fn new(pitch_class: PitchClass, octave: i8) -> Option<Self> {
        let key = (octave as i16 + 1) * 12 + pitch_class as i16;
        if key < 0 || key > 127 {
            return None;
        }
        Some(Self(DataByte::new_unchecked(key as u8)))
    }

    /// The name within the octave
    pub const fn pitch_class(&self) -> PitchClass {
        PitchClass::ALL[(self.0.value() % 12) as usize]
    }

    /// Octave number, -1 to 9
    pub const fn octave(&self) -> i8 {
        (self.0.value() / 12) as i8 - 1
    }

    /// The key number
    pub const fn byte(&self) -> u8 {
        self.0.value()
    }
}

impl From<DataByte> for Note {
    fn from(value: DataByte) -> Self {
        Self(value)
    }
}

impl fmt::Display for Note {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.pitch_class(), self.octave())
    }
}

/// The twelve pitch names, spelled with sharps.
#[derive(Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum PitchClass {
    C = 0,
    CSharp,
    D,
    DSharp,
    E,
    F,
    FSharp,
    G,
    GSharp,
    A,
    ASharp,
    B,
}

impl PitchClass {
    /// In ascending order from C
    pub const ALL: [Self; 12] = [
        Self::C,
        Self::CSharp,
        Self::D,
        Self::DSharp,
        Self::E,
        Self::F,
        Self::FSharp,
        Self::G,
        Self::GSharp,
        Self::A,
        Self::ASharp,
        Self::B,
    ];

    /// True for the black keys
    pub const fn is_sharp(&self) -> bool {
        matches!(
            self,
            Self::CSharp | Self::DSharp | Self::FSharp | Self::GSharp | Self::ASharp
        )
    }
}

impl fmt::Display for PitchClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::C => "C",
            Self::CSharp => "C#",
            Self::D => "D",
            Self::DSharp => "D#",
            Self::E => "E",
            Self::F => "F",
            Self::FSharp => "F#",
            Self::G => "G",
            Self::GSharp => "G#",
            Self::A => "A",
            Self::ASharp => "A#",
            Self::B => "B",
        })
    }
}

#[test]
fn names_the_key_range() {
    use pretty_assertions::assert_eq;
    assert_eq!(Note::from_databyte(0u8).unwrap().to_string(), "C-1");
    assert_eq!(Note::from_databyte(60u8).unwrap().to_string(), "C4");
    assert_eq!(Note::from_databyte(127u8).unwrap().to_string(), "G9");
    assert_eq!(Note::new(PitchClass::A, 4).map(|n| n.byte()), Some(69));
    assert_eq!(Note::new(PitchClass::GSharp, 9), None);
    assert!(Note::from_databyte(128u8).is_err());
}
