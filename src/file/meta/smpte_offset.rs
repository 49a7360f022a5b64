use crate::{SmpteError, file::SmpteFps};

/// Where a track starts, in SMPTE time code (`FF 54 05`).
///
/// ```text
/// 0rrhhhhh  mm  ss  ff  sf
/// ```
///
/// `rr` selects the frame rate (24, 25, 29.97 drop-frame, 30) and `hhhhh`
/// the hour. Frames are carried as written; subframes are hundredths.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SmpteOffset {
    /// Frame rate of the time code
    pub fps: SmpteFps,
    /// 0..=23
    pub hour: u8,
    /// 0..=59
    pub minute: u8,
    /// 0..=59
    pub second: u8,
    /// Frame within the second
    pub frame: u8,
    /// 0..=99
    pub subframe: u8,
}

const RATES: [SmpteFps; 4] = [
    SmpteFps::TwentyFour,
    SmpteFps::TwentyFive,
    SmpteFps::TwentyNine,
    SmpteFps::Thirty,
];

const fn rate_bits(fps: SmpteFps) -> u8 {
    match fps {
        SmpteFps::TwentyFour => 0,
        SmpteFps::TwentyFive => 1,
        SmpteFps::TwentyNine => 2,
        SmpteFps::Thirty => 3,
    }
}

impl SmpteOffset {
    /// Decode the five payload bytes.
    pub const fn parse(data: &[u8]) -> Result<Self, SmpteError> {
        let [rate_hour, minute, second, frame, subframe] = match data {
            [a, b, c, d, e] => [*a, *b, *c, *d, *e],
            _ => return Err(SmpteError::Length(data.len())),
        };
        if rate_hour & 0x80 != 0 {
            return Err(SmpteError::TrackFrame(rate_hour >> 5));
        }
        let fps = RATES[(rate_hour >> 5) as usize];
        let hour = rate_hour & 0x1F;

        if hour > 23 {
            Err(SmpteError::HourOffset(hour))
        } else if minute > 59 {
            Err(SmpteError::MinuteOffset(minute))
        } else if second > 59 {
            Err(SmpteError::SecondOffset(second))
        } else if subframe > 99 {
            Err(SmpteError::Subframe(subframe))
        } else {
            Ok(Self {
                fps,
                hour,
                minute,
                second,
                frame,
                subframe,
            })
        }
    }

    /// The five payload bytes.
    pub const fn to_bytes(&self) -> [u8; 5] {
        [
            (rate_bits(self.fps) << 5) | (self.hour & 0x1F),
            self.minute,
            self.second,
            self.frame,
            self.subframe,
        ]
    }

    /// Microseconds from 00:00:00:00 at the offset's own frame rate.
    pub fn as_micros(&self) -> f64 {
        let seconds = u32::from(self.hour) * 3600 + u32::from(self.minute) * 60 + u32::from(self.second);
        let frames = f64::from(self.frame) + f64::from(self.subframe) / 100.;
        f64::from(seconds) * 1_000_000. + frames * 1_000_000. / self.fps.as_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decodes_rate_and_time() {
        // 29.97 fps, 01:23:45, frame 12, subframe 34
        let bytes = [0x41, 0x17, 0x2D, 0x0C, 0x22];
        let offset = SmpteOffset::parse(&bytes).unwrap();
        assert_eq!(
            offset,
            SmpteOffset {
                fps: SmpteFps::TwentyNine,
                hour: 1,
                minute: 23,
                second: 45,
                frame: 12,
                subframe: 34,
            }
        );
        assert_eq!(offset.to_bytes(), bytes);
    }

    #[test]
    fn range_violations() {
        assert_eq!(
            SmpteOffset::parse(&[0x1F, 0, 0, 0, 0]),
            Err(SmpteError::HourOffset(31))
        );
        assert_eq!(
            SmpteOffset::parse(&[0x01, 0x50, 0, 0, 0]),
            Err(SmpteError::MinuteOffset(80))
        );
        assert_eq!(
            SmpteOffset::parse(&[0x01, 0, 60, 0, 0]),
            Err(SmpteError::SecondOffset(60))
        );
        assert_eq!(
            SmpteOffset::parse(&[0x01, 0, 0, 0, 100]),
            Err(SmpteError::Subframe(100))
        );
        assert_eq!(
            SmpteOffset::parse(&[0x81, 0, 0, 0, 0]),
            Err(SmpteError::TrackFrame(4))
        );
        assert_eq!(SmpteOffset::parse(&[0; 6]), Err(SmpteError::Length(6)));
    }

    #[test]
    fn converts_to_micros() {
        let offset = SmpteOffset::parse(&[0x20, 0, 1, 12, 50]).unwrap();
        // one second plus 12.5 frames at 25 fps
        assert_eq!(offset.as_micros(), 1_500_000.);
    }
}
