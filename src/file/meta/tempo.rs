/// Microseconds per quarter note, as carried by `FF 51 03`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Tempo(u32);

impl Tempo {
    /// 120 beats per minute
    pub const DEFAULT: Self = Self(500_000);
    /// The largest value three bytes can hold
    pub const MAX_MICROS: u32 = 0x00FF_FFFF;

    /// From microseconds per quarter note. Bits above the 24th are discarded.
    pub const fn new(micros_per_quarter_note: u32) -> Self {
        Self(micros_per_quarter_note & Self::MAX_MICROS)
    }

    /// From beats per minute, rounded to the nearest microsecond.
    pub fn from_bpm(bpm: f64) -> Self {
        Self::new((60_000_000. / bpm).round() as u32)
    }

    /// Microseconds per quarter note
    pub const fn micros_per_quarter_note(&self) -> u32 {
        self.0
    }

    /// Quarter notes per minute
    pub fn bpm(&self) -> f64 {
        60_000_000. / self.0 as f64
    }

    pub(crate) const fn from_bytes(bytes: [u8; 3]) -> Self {
        Self(((bytes[0] as u32) << 16) | ((bytes[1] as u32) << 8) | bytes[2] as u32)
    }

    pub(crate) const fn to_bytes(self) -> [u8; 3] {
        [(self.0 >> 16) as u8, (self.0 >> 8) as u8, self.0 as u8]
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::DEFAULT
    }
}

#[test]
fn converts_bpm() {
    assert_eq!(Tempo::from_bpm(120.).micros_per_quarter_note(), 500_000);
    assert_eq!(Tempo::new(400_000).bpm(), 150.);
    assert_eq!(Tempo::from_bytes(Tempo::new(0x0A_BC_DE).to_bytes()), Tempo::new(0x0A_BC_DE));
}
