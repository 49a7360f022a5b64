use crate::DataByte;

/// The payload of a channel voice message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum VoiceEvent {
    /// `0x8n`
    NoteOff {
        /// Key number
        key: DataByte,
        /// Release velocity
        velocity: DataByte,
    },
    /// `0x9n`. A velocity of zero is a note off by convention but is kept as sent.
    NoteOn {
        /// Key number
        key: DataByte,
        /// Attack velocity
        velocity: DataByte,
    },
    /// `0xAn`
    PolyPressure {
        /// Key number
        key: DataByte,
        /// Pressure
        pressure: DataByte,
    },
    /// `0xBn`
    ControlChange {
        /// Controller number
        controller: DataByte,
        /// New value
        value: DataByte,
    },
    /// `0xCn`
    ProgramChange {
        /// Program number
        program: DataByte,
    },
    /// `0xDn`
    ChannelPressure {
        /// Pressure
        pressure: DataByte,
    },
    /// `0xEn`
    PitchBend(PitchBend),
}

impl VoiceEvent {
    /// The high nibble of the status byte
    pub const fn command(&self) -> u8 {
        match self {
            Self::NoteOff { .. } => 0x80,
            Self::NoteOn { .. } => 0x90,
            Self::PolyPressure { .. } => 0xA0,
            Self::ControlChange { .. } => 0xB0,
            Self::ProgramChange { .. } => 0xC0,
            Self::ChannelPressure { .. } => 0xD0,
            Self::PitchBend(_) => 0xE0,
        }
    }

    /// True for a note off, or a note on with zero velocity
    pub const fn is_note_release(&self) -> bool {
        match self {
            Self::NoteOff { .. } => true,
            Self::NoteOn { velocity, .. } => velocity.value() == 0,
            _ => false,
        }
    }

    /// The key of a note or poly pressure event
    pub const fn key(&self) -> Option<DataByte> {
        match self {
            Self::NoteOff { key, .. } | Self::NoteOn { key, .. } | Self::PolyPressure { key, .. } => {
                Some(*key)
            }
            _ => None,
        }
    }
}

/// A 14-bit pitch bend value, `0x2000` is centered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PitchBend(u16);

impl PitchBend {
    /// No bend
    pub const CENTER: Self = Self(0x2000);

    /// From the raw 14-bit value. Higher bits are discarded.
    pub const fn new(value: u16) -> Self {
        Self(value & 0x3FFF)
    }

    /// Combine the two wire bytes, least significant first.
    pub const fn from_bytes(lsb: DataByte, msb: DataByte) -> Self {
        Self(((msb.value() as u16) << 7) | lsb.value() as u16)
    }

    /// Split into the two wire bytes, least significant first.
    pub const fn to_bytes(self) -> (DataByte, DataByte) {
        (
            DataByte::new_unchecked((self.0 & 0x7F) as u8),
            DataByte::new_unchecked((self.0 >> 7) as u8),
        )
    }

    /// The raw 14-bit value
    pub const fn value(&self) -> u16 {
        self.0
    }

    /// Signed distance from center, -8192..=8191
    pub const fn centered(&self) -> i16 {
        self.0 as i16 - 0x2000
    }
}

#[test]
fn pitch_bend_bytes() {
    let bend = PitchBend::from_bytes(DataByte::new_unchecked(0x7F), DataByte::new_unchecked(0x7F));
    assert_eq!(bend.value(), 0x3FFF);
    assert_eq!(bend.centered(), 8191);
    let (lsb, msb) = PitchBend::new(0x1234).to_bytes();
    assert_eq!(PitchBend::from_bytes(lsb, msb).value(), 0x1234);
}
