#![doc = r#"
The decoded form of everything a track can carry.

# Hierarchy
```text
                      |---------|
                      | Message |
                      |---------|
          /              |             |              \
|---------------|  |--------|  |----------------|  |------|
| Channel Voice |  | SysEx  |  | SysEx continue |  | Meta |
|---------------|  |--------|  |----------------|  |------|
                       |
             manufacturer-keyed content
               (opaque | iMUSE catalog)
```

The scheduler never looks inside a message; it only carries it to a sink.
"#]

pub mod channel;
pub use channel::{Channel, ChannelVoiceMessage, PitchBend, VoiceEvent};

mod byte;
pub use byte::*;

use crate::{
    file::meta::MetaMessage,
    sysex::SysExMessage,
    writer::{RunningStatus, WriteError, Writer},
};

/// Status byte of a sysex message
pub const SYSEX: u8 = 0xF0;
/// Status byte of a sysex continuation or escape packet
pub const SYSEX_CONTINUATION: u8 = 0xF7;
/// Status byte of a meta message
pub const META: u8 = 0xFF;

/// A decoded track message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Message {
    /// `0x80..=0xEF`
    ChannelVoice(ChannelVoiceMessage),
    /// `0xF0`
    SysEx(SysExMessage),
    /// `0xF7`, the raw packet bytes
    SysExContinuation(Vec<u8>),
    /// `0xFF`
    Meta(MetaMessage),
}

impl Message {
    /// The status byte the message is introduced by
    pub fn status(&self) -> u8 {
        match self {
            Self::ChannelVoice(cv) => cv.status(),
            Self::SysEx(_) => SYSEX,
            Self::SysExContinuation(_) => SYSEX_CONTINUATION,
            Self::Meta(_) => META,
        }
    }

    /// Encode the message (without a delta-time).
    pub fn write(&self, writer: &mut Writer, running: &mut RunningStatus) -> Result<(), WriteError> {
        match self {
            Self::ChannelVoice(cv) => cv.write(writer, running),
            Self::SysEx(sysex) => {
                running.encode(SYSEX);
                writer.write_u8(SYSEX);
                writer.write_vlq_bytes(&sysex.to_payload())?;
            }
            Self::SysExContinuation(bytes) => {
                running.encode(SYSEX_CONTINUATION);
                writer.write_u8(SYSEX_CONTINUATION);
                writer.write_vlq_bytes(bytes)?;
            }
            Self::Meta(meta) => {
                running.encode(META);
                writer.write_u8(META);
                writer.write_u8(meta.kind());
                writer.write_vlq_bytes(&meta.payload())?;
            }
        }
        Ok(())
    }

    /// The channel voice message, if this is one
    pub const fn as_channel_voice(&self) -> Option<&ChannelVoiceMessage> {
        match self {
            Self::ChannelVoice(cv) => Some(cv),
            _ => None,
        }
    }

    /// The meta message, if this is one
    pub const fn as_meta(&self) -> Option<&MetaMessage> {
        match self {
            Self::Meta(meta) => Some(meta),
            _ => None,
        }
    }
}

impl From<ChannelVoiceMessage> for Message {
    fn from(value: ChannelVoiceMessage) -> Self {
        Self::ChannelVoice(value)
    }
}

impl From<MetaMessage> for Message {
    fn from(value: MetaMessage) -> Self {
        Self::Meta(value)
    }
}

impl From<SysExMessage> for Message {
    fn from(value: SysExMessage) -> Self {
        Self::SysEx(value)
    }
}
