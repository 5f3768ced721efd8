use std::fmt;

use serde_with::SerializeDisplay;

use crate::protocol::TunerBand;

use super::FrameCodecError;
use super::frame::response_byte;

/// Offset of the status byte in power, blend, mute and band responses.
pub const STATUS_OFFSET: usize = 4;

const STATE_OFF: u8 = 64;
const STATE_ON: u8 = 65;
const DEVICE_ID_RANGE: std::ops::Range<usize> = 3..7;

/// Reported state of a binary field.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, SerializeDisplay)]
pub enum SwitchState {
    Off,
    On,
    /// Any byte other than the two known states, typically a transitional
    /// reading.
    Unknown(u8),
}

impl SwitchState {
    /// Whether the field is reported as on.
    #[must_use]
    pub fn is_on(self) -> bool {
        self == Self::On
    }
}

impl fmt::Display for SwitchState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Off => write!(f, "Off"),
            Self::On => write!(f, "On"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Reported reception band.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, SerializeDisplay)]
pub enum Band {
    Am,
    Fm,
    Unknown(u8),
}

impl Band {
    /// The tunable band, if the reading is a known one.
    #[must_use]
    pub fn tuner_band(self) -> Option<TunerBand> {
        match self {
            Self::Am => Some(TunerBand::Am),
            Self::Fm => Some(TunerBand::Fm),
            Self::Unknown(_) => None,
        }
    }
}

impl fmt::Display for Band {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Am => write!(f, "AM"),
            Self::Fm => write!(f, "FM"),
            Self::Unknown(_) => write!(f, "Unknown"),
        }
    }
}

/// Model identifier reported by the tuner.
#[derive(Debug, Clone, Eq, PartialEq, Hash, derive_more::Display, SerializeDisplay)]
#[display("{_0}")]
pub struct DeviceId(String);

impl DeviceId {
    /// The identifier text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Interprets status bytes in query responses.
pub struct StatusDecoder;

impl StatusDecoder {
    /// Maps a raw status byte to a switch state.
    ///
    /// ```
    /// use nad_tuner::{StatusDecoder, SwitchState};
    ///
    /// assert_eq!(SwitchState::On, StatusDecoder::switch_state(65));
    /// assert_eq!(SwitchState::Unknown(200), StatusDecoder::switch_state(200));
    /// ```
    #[must_use]
    pub fn switch_state(byte: u8) -> SwitchState {
        match byte {
            STATE_OFF => SwitchState::Off,
            STATE_ON => SwitchState::On,
            other => SwitchState::Unknown(other),
        }
    }

    /// Maps a raw status byte to a band.
    #[must_use]
    pub fn band(byte: u8) -> Band {
        match byte {
            STATE_OFF => Band::Am,
            STATE_ON => Band::Fm,
            other => Band::Unknown(other),
        }
    }

    /// Decodes the switch state stored at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the response is too short.
    pub fn decode_switch(response: &[u8], offset: usize) -> Result<SwitchState, FrameCodecError> {
        response_byte(response, offset).map(Self::switch_state)
    }

    /// Decodes the band stored at `offset`.
    ///
    /// # Errors
    ///
    /// Returns an error only when the response is too short.
    pub fn decode_band(response: &[u8], offset: usize) -> Result<Band, FrameCodecError> {
        response_byte(response, offset).map(Self::band)
    }

    /// Decodes the model identifier from a device-id response.
    ///
    /// # Errors
    ///
    /// Returns an error when the response is too short.
    pub fn decode_device_id(response: &[u8]) -> Result<DeviceId, FrameCodecError> {
        let bytes = response
            .get(DEVICE_ID_RANGE)
            .ok_or(FrameCodecError::ResponseTooShort {
                needed: DEVICE_ID_RANGE.end,
                actual: response.len(),
            })?;
        Ok(DeviceId(String::from_utf8_lossy(bytes).into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case(64, SwitchState::Off)]
    #[case(65, SwitchState::On)]
    #[case(200, SwitchState::Unknown(200))]
    #[case(0, SwitchState::Unknown(0))]
    fn switch_bytes_decode_without_errors(#[case] byte: u8, #[case] expected: SwitchState) {
        let response = [1, 20, 21, 94, byte];
        assert_eq!(Ok(expected), StatusDecoder::decode_switch(&response, STATUS_OFFSET));
    }

    #[rstest]
    #[case(64, Band::Am)]
    #[case(65, Band::Fm)]
    #[case(66, Band::Unknown(66))]
    fn band_bytes_decode_without_errors(#[case] byte: u8, #[case] expected: Band) {
        let response = [1, 20, 43, 94, byte];
        assert_eq!(Ok(expected), StatusDecoder::decode_band(&response, STATUS_OFFSET));
    }

    #[test]
    fn unknown_states_render_as_unknown() {
        assert_eq!("Unknown", SwitchState::Unknown(3).to_string());
        assert_eq!("Unknown", Band::Unknown(3).to_string());
        assert_eq!(None, Band::Unknown(3).tuner_band());
    }

    #[test]
    fn device_id_reads_four_bytes_after_header() {
        let response = [1, 20, 20, b'T', b'7', b'4', b'3'];
        let device_id =
            StatusDecoder::decode_device_id(&response).expect("device id should decode");
        assert_eq!("T743", device_id.as_str());
    }

    #[test]
    fn short_responses_are_errors() {
        assert_matches!(
            StatusDecoder::decode_switch(&[1, 20, 21], STATUS_OFFSET),
            Err(FrameCodecError::ResponseTooShort {
                needed: 5,
                actual: 3
            })
        );
        assert_matches!(
            StatusDecoder::decode_device_id(&[1, 20, 20, b'T']),
            Err(FrameCodecError::ResponseTooShort {
                needed: 7,
                actual: 4
            })
        );
    }
}
