use num_enum::{IntoPrimitive, TryFromPrimitive};

#[doc = r#"
The format word of the `MThd` chunk.

Format 0 holds a single multi-channel track. Format 1 holds tracks that play
together, the first usually carrying tempo and meter. Format 2 holds
independent patterns, each with its own timing.
"#]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, TryFromPrimitive, IntoPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u16)]
pub enum Format {
    /// Format 0
    SingleMultiChannel = 0,
    /// Format 1
    #[default]
    Simultaneous = 1,
    /// Format 2
    SequentiallyIndependent = 2,
}

impl Format {
    /// True if the format allows more than one track
    pub const fn is_multi_track(&self) -> bool {
        !matches!(self, Self::SingleMultiChannel)
    }
}

#[test]
fn format_words() {
    assert_eq!(Format::try_from(2u16).unwrap(), Format::SequentiallyIndependent);
    assert!(Format::try_from(3u16).is_err());
    assert_eq!(u16::from(Format::SingleMultiChannel), 0);
}
