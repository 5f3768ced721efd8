use std::fmt;
use std::str::FromStr;

use serde_with::SerializeDisplay;

use crate::error::ValidationError;
use crate::protocol::{ESCAPE_BIAS, ESCAPE_MARKER};

use super::FrameCodecError;
use super::frame::response_byte;

/// FM frequency in hundredths of a megahertz.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay)]
pub struct FmFrequency(u16);

impl FmFrequency {
    /// Creates a frequency from hundredths of a megahertz.
    #[must_use]
    pub const fn from_centi_mhz(value: u16) -> Self {
        Self(value)
    }

    /// Creates a frequency from megahertz, rounding to two decimals.
    ///
    /// # Errors
    ///
    /// Returns an error when `mhz` is not finite or does not fit the device's
    /// 16-bit representation.
    ///
    /// ```
    /// use nad_tuner::FmFrequency;
    ///
    /// let frequency = FmFrequency::from_mhz(96.8)?;
    /// assert_eq!(9680, frequency.centi_mhz());
    /// assert_eq!("96.80 MHz", frequency.to_string());
    /// # Ok::<(), nad_tuner::ValidationError>(())
    /// ```
    pub fn from_mhz(mhz: f64) -> Result<Self, ValidationError> {
        let scaled = (mhz * 100.0).round();
        if !scaled.is_finite() || !(0.0..=f64::from(u16::MAX)).contains(&scaled) {
            return Err(ValidationError::UnrepresentableFm { mhz });
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let value = scaled as u16;
        Ok(Self(value))
    }

    /// Hundredths of a megahertz.
    #[must_use]
    pub const fn centi_mhz(self) -> u16 {
        self.0
    }

    /// Frequency in megahertz.
    #[must_use]
    pub fn mhz(self) -> f64 {
        f64::from(self.0) / 100.0
    }
}

impl fmt::Display for FmFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02} MHz", self.0 / 100, self.0 % 100)
    }
}

impl FromStr for FmFrequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::from_mhz(parse_mhz(value)?)
    }
}

/// Parses a megahertz value with an optional `MHz` suffix.
pub(crate) fn parse_mhz(value: &str) -> Result<f64, ValidationError> {
    value
        .trim()
        .trim_end_matches("MHz")
        .trim()
        .parse::<f64>()
        .map_err(|_| ValidationError::NotANumber {
            value: value.to_string(),
        })
}

/// AM frequency in kilohertz.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash, SerializeDisplay)]
pub struct AmFrequency(u16);

impl AmFrequency {
    /// Creates a frequency from kilohertz.
    #[must_use]
    pub const fn from_khz(value: u16) -> Self {
        Self(value)
    }

    /// Frequency in kilohertz.
    #[must_use]
    pub const fn khz(self) -> u16 {
        self.0
    }
}

impl fmt::Display for AmFrequency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} kHz", self.0)
    }
}

impl FromStr for AmFrequency {
    type Err = ValidationError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        value
            .trim()
            .trim_end_matches("kHz")
            .trim()
            .parse::<u16>()
            .map(Self)
            .map_err(|_| ValidationError::NotANumber {
                value: value.to_string(),
            })
    }
}

/// Conversions between frequencies and the device's raw byte pairs.
pub struct FrequencyCodec;

impl FrequencyCodec {
    /// Little-endian raw bytes of an FM frequency.
    ///
    /// ```
    /// use nad_tuner::{FmFrequency, FrequencyCodec};
    ///
    /// let raw = FrequencyCodec::fm_to_raw(FmFrequency::from_centi_mhz(9680));
    /// assert_eq!([208, 37], raw);
    /// ```
    #[must_use]
    pub fn fm_to_raw(frequency: FmFrequency) -> [u8; 2] {
        frequency.0.to_le_bytes()
    }

    /// FM frequency from little-endian raw bytes.
    #[must_use]
    pub fn fm_from_raw(raw: [u8; 2]) -> FmFrequency {
        FmFrequency(u16::from_le_bytes(raw))
    }

    /// Little-endian raw bytes of an AM frequency.
    #[must_use]
    pub fn am_to_raw(frequency: AmFrequency) -> [u8; 2] {
        frequency.0.to_le_bytes()
    }

    /// AM frequency from little-endian raw bytes.
    #[must_use]
    pub fn am_from_raw(raw: [u8; 2]) -> AmFrequency {
        AmFrequency(u16::from_le_bytes(raw))
    }

    /// Decodes the FM frequency from a query response.
    ///
    /// An escape marker at offset 3 shifts the raw pair one byte to the right.
    ///
    /// # Errors
    ///
    /// Returns an error when the response is too short.
    pub fn decode_fm(response: &[u8]) -> Result<FmFrequency, FrameCodecError> {
        let start = if response_byte(response, 3)? == ESCAPE_MARKER {
            4
        } else {
            3
        };
        let raw = [
            response_byte(response, start)?,
            response_byte(response, start + 1)?,
        ];
        Ok(Self::fm_from_raw(raw))
    }

    /// Decodes the AM frequency from a query response.
    ///
    /// # Errors
    ///
    /// Returns an error when the response is too short.
    pub fn decode_am(response: &[u8]) -> Result<AmFrequency, FrameCodecError> {
        let raw = if response_byte(response, 4)? == ESCAPE_MARKER {
            [
                response_byte(response, 3)?,
                response_byte(response, 5)?.wrapping_sub(ESCAPE_BIAS),
            ]
        } else {
            [
                response_byte(response, 4)?.wrapping_sub(ESCAPE_BIAS),
                response_byte(response, 6)?.wrapping_sub(ESCAPE_BIAS),
            ]
        };
        Ok(Self::am_from_raw(raw))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(96.8, 9680)]
    #[case(87.5, 8750)]
    #[case(108.0, 10800)]
    #[case(87.98, 8798)]
    #[case(101.1, 10110)]
    fn fm_from_mhz_rounds_to_hundredths(#[case] mhz: f64, #[case] expected: u16) {
        let frequency = FmFrequency::from_mhz(mhz).expect("frequency should be representable");
        assert_eq!(expected, frequency.centi_mhz());
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(-1.0)]
    #[case(700.0)]
    fn fm_from_mhz_rejects_unrepresentable_values(#[case] mhz: f64) {
        assert_matches!(
            FmFrequency::from_mhz(mhz),
            Err(ValidationError::UnrepresentableFm { .. })
        );
    }

    #[test]
    fn frequencies_parse_with_optional_units() {
        assert_eq!(Ok(FmFrequency(9680)), "96.80 MHz".parse());
        assert_eq!(Ok(AmFrequency(1008)), "1008kHz".parse());
        assert_matches!(
            "ninety".parse::<FmFrequency>(),
            Err(ValidationError::NotANumber { .. })
        );
    }

    #[test]
    fn frequencies_render_with_units() {
        assert_eq!("87.50 MHz", FmFrequency(8750).to_string());
        assert_eq!("531 kHz", AmFrequency(531).to_string());
    }

    #[rstest]
    fn raw_pairs_round_trip(#[values(0, 1, 37, 208, 255)] low: u8, #[values(0, 3, 37, 255)] high: u8) {
        let raw = [low, high];
        assert_eq!(raw, FrequencyCodec::fm_to_raw(FrequencyCodec::fm_from_raw(raw)));
        assert_eq!(raw, FrequencyCodec::am_to_raw(FrequencyCodec::am_from_raw(raw)));
    }

    #[rstest]
    #[case(&[1, 20, 45, 208, 37], 9680)]
    #[case(&[1, 20, 45, 94, 94, 34], 8798)]
    #[case(&[1, 20, 45, 48, 42], 10800)]
    fn decode_fm_follows_escape_marker(#[case] response: &[u8], #[case] expected: u16) {
        let frequency = FrequencyCodec::decode_fm(response).expect("response should decode");
        assert_eq!(FmFrequency(expected), frequency);
    }

    #[rstest]
    #[case(&[1, 20, 44, 240, 94, 67], 1008)]
    #[case(&[1, 20, 44, 46, 94, 66], 558)]
    #[case(&[1, 20, 44, 94, 66, 94, 68], 1026)]
    #[case(&[1, 20, 44, 94, 83, 94, 66], 531)]
    fn decode_am_removes_escape_bias(#[case] response: &[u8], #[case] expected: u16) {
        let frequency = FrequencyCodec::decode_am(response).expect("response should decode");
        assert_eq!(AmFrequency(expected), frequency);
    }

    #[test]
    fn decode_rejects_short_responses() {
        assert_matches!(
            FrequencyCodec::decode_fm(&[1, 20, 45, 94, 94]),
            Err(FrameCodecError::ResponseTooShort {
                needed: 6,
                actual: 5
            })
        );
        assert_matches!(
            FrequencyCodec::decode_am(&[1, 20, 44]),
            Err(FrameCodecError::ResponseTooShort {
                needed: 5,
                actual: 3
            })
        );
    }
}
