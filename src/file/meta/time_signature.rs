/// A time signature as carried by `FF 58 04 nn dd cc bb`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TimeSignature {
    /// Beats in a measure, as written
    pub numerator: u8,
    /// The denominator as a power of two (`3` means eighth notes)
    pub denominator_exponent: u8,
    /// MIDI clocks (24 per quarter note) per metronome click
    pub clocks_per_click: u8,
    /// Notated 32nd notes per MIDI quarter note
    pub thirty_seconds_per_quarter: u8,
}

impl TimeSignature {
    /// Common time: 4/4, a click every quarter note
    pub const COMMON: Self = Self {
        numerator: 4,
        denominator_exponent: 2,
        clocks_per_click: 24,
        thirty_seconds_per_quarter: 8,
    };

    /// The written denominator, or `None` if the exponent does not fit in 32 bits.
    pub const fn denominator(&self) -> Option<u32> {
        1u32.checked_shl(self.denominator_exponent as u32)
    }

    pub(crate) const fn from_bytes(bytes: [u8; 4]) -> Self {
        Self {
            numerator: bytes[0],
            denominator_exponent: bytes[1],
            clocks_per_click: bytes[2],
            thirty_seconds_per_quarter: bytes[3],
        }
    }

    pub(crate) const fn to_bytes(self) -> [u8; 4] {
        [
            self.numerator,
            self.denominator_exponent,
            self.clocks_per_click,
            self.thirty_seconds_per_quarter,
        ]
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::COMMON
    }
}

#[test]
fn denominator_from_exponent() {
    assert_eq!(TimeSignature::from_bytes([6, 3, 24, 8]).denominator(), Some(8));
    assert_eq!(TimeSignature::from_bytes([6, 40, 24, 8]).denominator(), None);
}
