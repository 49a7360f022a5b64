#![doc = r#"
Contains all Channel Message types

# Wire form
```text
|-------------|-------------|-------------|
| status      | data 1      | data 2      |
| 1kkk cccc   | 0xxx xxxx   | 0yyy yyyy   |
|-------------|-------------|-------------|
   kkk  = command (note off .. pitch bend)
   cccc = channel 0-15
```
Program change and channel pressure carry one data byte; every other command
carries two. Channel mode messages travel as control changes 120-127 and are
represented as such.
"#]
mod voice;
pub use voice::*;

use crate::{
    DataByte,
    gm,
    note::Note,
    reader::{ReadResult, Reader, inv_data},
    writer::{RunningStatus, Writer},
};
use core::fmt;
use num_enum::{IntoPrimitive, TryFromPrimitive};

/// One of the sixteen MIDI channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum Channel {
    /// 0b0000
    One = 0,
    /// 0b0001
    Two,
    /// 0b0010
    Three,
    /// 0b0011
    Four,
    /// 0b0100
    Five,
    /// 0b0101
    Six,
    /// 0b0110
    Seven,
    /// 0b0111
    Eight,
    /// 0b1000
    Nine,
    /// 0b1001
    Ten,
    /// 0b1010
    Eleven,
    /// 0b1011
    Twelve,
    /// 0b1100
    Thirteen,
    /// 0b1101
    Fourteen,
    /// 0b1110
    Fifteen,
    /// 0b1111
    Sixteen,
}

impl Channel {
    /// The channel encoded in the low nibble of a status byte
    pub fn from_status(status: u8) -> Self {
        // a nibble always converts
        Self::try_from(status & 0x0F).unwrap_or(Self::One)
    }

    /// The zero-based channel number
    pub fn index(self) -> u8 {
        self.into()
    }
}

#[doc = r#"
A channel voice message: a [`VoiceEvent`] addressed to a [`Channel`].
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ChannelVoiceMessage {
    channel: Channel,
    event: VoiceEvent,
}

impl ChannelVoiceMessage {
    /// Address `event` to `channel`.
    pub const fn new(channel: Channel, event: VoiceEvent) -> Self {
        Self { channel, event }
    }

    /// The addressed channel
    pub const fn channel(&self) -> Channel {
        self.channel
    }

    /// The event
    pub const fn event(&self) -> &VoiceEvent {
        &self.event
    }

    /// The status byte this message is sent with
    pub fn status(&self) -> u8 {
        self.event.command() | self.channel.index()
    }

    /// Decode the data bytes following `status` (0x80..=0xEF).
    pub(crate) fn read(status: u8, reader: &mut Reader<'_>) -> ReadResult<Self> {
        let channel = Channel::from_status(status);
        let mut data = || -> ReadResult<DataByte> {
            let byte = reader.read_u8()?;
            DataByte::new(byte).map_err(|e| {
                reader.rewind(1);
                inv_data(reader, e)
            })
        };
        let event = match status & 0xF0 {
            0x80 => VoiceEvent::NoteOff {
                key: data()?,
                velocity: data()?,
            },
            0x90 => VoiceEvent::NoteOn {
                key: data()?,
                velocity: data()?,
            },
            0xA0 => VoiceEvent::PolyPressure {
                key: data()?,
                pressure: data()?,
            },
            0xB0 => VoiceEvent::ControlChange {
                controller: data()?,
                value: data()?,
            },
            0xC0 => VoiceEvent::ProgramChange { program: data()? },
            0xD0 => VoiceEvent::ChannelPressure { pressure: data()? },
            _ => {
                let lsb = data()?;
                let msb = data()?;
                VoiceEvent::PitchBend(PitchBend::from_bytes(lsb, msb))
            }
        };
        Ok(Self { channel, event })
    }

    pub(crate) fn write(&self, writer: &mut Writer, running: &mut RunningStatus) {
        if let Some(status) = running.encode(self.status()) {
            writer.write_u8(status);
        }
        match self.event {
            VoiceEvent::NoteOff { key, velocity } | VoiceEvent::NoteOn { key, velocity } => {
                writer.write_u8(key.value());
                writer.write_u8(velocity.value());
            }
            VoiceEvent::PolyPressure { key, pressure } => {
                writer.write_u8(key.value());
                writer.write_u8(pressure.value());
            }
            VoiceEvent::ControlChange { controller, value } => {
                writer.write_u8(controller.value());
                writer.write_u8(value.value());
            }
            VoiceEvent::ProgramChange { program } => writer.write_u8(program.value()),
            VoiceEvent::ChannelPressure { pressure } => writer.write_u8(pressure.value()),
            VoiceEvent::PitchBend(bend) => {
                let (lsb, msb) = bend.to_bytes();
                writer.write_u8(lsb.value());
                writer.write_u8(msb.value());
            }
        }
    }
}

impl fmt::Display for ChannelVoiceMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ch = self.channel.index() + 1;
        match self.event {
            VoiceEvent::NoteOn { key, velocity } => {
                write!(f, "ch{ch} note on {} vel {}", Note::from(key), velocity.value())
            }
            VoiceEvent::NoteOff { key, velocity } => {
                write!(f, "ch{ch} note off {} vel {}", Note::from(key), velocity.value())
            }
            VoiceEvent::PolyPressure { key, pressure } => {
                write!(f, "ch{ch} aftertouch {} {}", Note::from(key), pressure.value())
            }
            VoiceEvent::ControlChange { controller, value } => {
                write!(f, "ch{ch} cc {} = {}", controller.value(), value.value())
            }
            VoiceEvent::ProgramChange { program } => {
                write!(f, "ch{ch} program {} ({})", program.value(), gm::program_name(program))
            }
            VoiceEvent::ChannelPressure { pressure } => {
                write!(f, "ch{ch} pressure {}", pressure.value())
            }
            VoiceEvent::PitchBend(bend) => write!(f, "ch{ch} pitch bend {}", bend.centered()),
        }
    }
}
