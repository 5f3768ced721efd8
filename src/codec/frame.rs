use thiserror::Error;
use tracing::warn;

use crate::protocol::{
    self, DELIMITER, Opcode, Parameter, TunerBand, frequency_write_header,
};
use crate::utils::format_frame;

use super::checksum::checksum;
use super::stuffing::ByteStuffer;

const HEADER_LEN: usize = 3;

/// Errors returned by frame encoding and decoding.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FrameCodecError {
    /// A response did not contain the byte a decoder reads.
    #[error("response is too short: expected at least {needed} bytes, got {actual}")]
    ResponseTooShort { needed: usize, actual: usize },
    /// A stuffed frequency body has a shape the stuffer never produces.
    #[error("malformed {band} frequency body of {len} bytes")]
    MalformedFrequencyTail { band: TunerBand, len: usize },
    /// A command frame is shorter than its header.
    #[error("command frame is too short: expected at least 3 header bytes, got {actual}")]
    CommandTooShort { actual: usize },
    /// No delimiter followed the command payload.
    #[error("command frame has no delimiter")]
    MissingDelimiter,
    /// The delimiter was not followed by a checksum byte.
    #[error("command frame has no checksum byte")]
    MissingChecksum,
}

/// Reads one byte of a response, reporting short responses as errors.
pub(crate) fn response_byte(response: &[u8], index: usize) -> Result<u8, FrameCodecError> {
    response
        .get(index)
        .copied()
        .ok_or(FrameCodecError::ResponseTooShort {
            needed: index + 1,
            actual: response.len(),
        })
}

/// One outgoing frame, together with the logical command it carries.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CommandFrame {
    logical: Vec<u8>,
    checksum: u8,
    wire: Vec<u8>,
}

impl CommandFrame {
    /// Command bytes before stuffing; the checksum covers exactly these.
    #[must_use]
    pub fn logical(&self) -> &[u8] {
        &self.logical
    }

    /// Checksum of [`Self::logical`].
    #[must_use]
    pub fn checksum(&self) -> u8 {
        self.checksum
    }

    /// Bytes written to the link.
    #[must_use]
    pub fn wire(&self) -> &[u8] {
        &self.wire
    }
}

/// A command frame as seen by the receiving side.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct DecodedCommand {
    opcode: Option<Opcode>,
    parameter: Option<Parameter>,
    logical: Vec<u8>,
    checksum: u8,
    trailer: Vec<u8>,
}

impl DecodedCommand {
    /// Opcode, if it is one the tuner knows.
    #[must_use]
    pub fn opcode(&self) -> Option<Opcode> {
        self.opcode
    }

    /// Parameter, if it is one the tuner knows.
    #[must_use]
    pub fn parameter(&self) -> Option<Parameter> {
        self.parameter
    }

    /// Unstuffed command bytes.
    #[must_use]
    pub fn logical(&self) -> &[u8] {
        &self.logical
    }

    /// Data bytes following the header.
    #[must_use]
    pub fn data(&self) -> &[u8] {
        &self.logical[HEADER_LEN..]
    }

    /// Bytes received after the checksum.
    #[must_use]
    pub fn trailer(&self) -> &[u8] {
        &self.trailer
    }

    /// Whether the received checksum authenticates the logical command.
    #[must_use]
    pub fn checksum_matches(&self) -> bool {
        checksum(&self.logical) == self.checksum
    }
}

/// Builds and parses command frames.
pub struct FrameCodec;

impl FrameCodec {
    /// Frames a logical payload that needs no stuffing.
    ///
    /// ```
    /// use nad_tuner::FrameCodec;
    ///
    /// let frame = FrameCodec::encode(&[1, 20, 21]);
    /// assert_eq!(&[1, 20, 21, 2, 214], frame.wire());
    /// ```
    #[must_use]
    pub fn encode(payload: &[u8]) -> CommandFrame {
        assemble(payload.to_vec(), payload, None)
    }

    /// Frames a fixed command from the command table.
    #[must_use]
    pub fn encode_command(command: protocol::CommandId) -> CommandFrame {
        Self::encode(&protocol::command_spec(command).payload())
    }

    /// Frames a frequency write.
    ///
    /// The checksum is computed over the unstuffed command and the stuffed
    /// bytes are only substituted on the wire.
    ///
    /// ```
    /// use nad_tuner::{FrameCodec, TunerBand};
    ///
    /// let frame = FrameCodec::encode_frequency_write(TunerBand::Am, [46, 2]);
    /// assert_eq!(&[1, 21, 44, 46, 2], frame.logical());
    /// assert_eq!(&[1, 21, 44, 46, 94, 66, 2, 142], frame.wire());
    /// ```
    #[must_use]
    pub fn encode_frequency_write(band: TunerBand, raw: [u8; 2]) -> CommandFrame {
        let header = frequency_write_header(band);
        let mut logical = header.to_vec();
        logical.extend_from_slice(&raw);

        let tail = ByteStuffer::stuff(band, raw);
        let mut stuffed = header.to_vec();
        stuffed.extend_from_slice(tail.body());

        assemble(logical, &stuffed, tail.trailer())
    }

    /// Parses a command frame the way the tuner reads it.
    ///
    /// Frequency writes are measured from their escape markers, so a raw
    /// delimiter value inside the frequency body does not end the payload.
    ///
    /// # Errors
    ///
    /// Returns an error when the frame is truncated or a stuffed frequency
    /// body is malformed.
    pub fn decode_command(wire: &[u8]) -> Result<DecodedCommand, FrameCodecError> {
        if wire.len() < HEADER_LEN {
            return Err(FrameCodecError::CommandTooShort { actual: wire.len() });
        }
        let opcode = Opcode::from_byte(wire[1]);
        let parameter = Parameter::from_byte(wire[2]);
        let rest = &wire[HEADER_LEN..];

        let frequency_band = match (opcode, parameter) {
            (Some(Opcode::Write), Some(Parameter::FmFrequency)) => Some(TunerBand::Fm),
            (Some(Opcode::Write), Some(Parameter::AmFrequency)) => Some(TunerBand::Am),
            _ => None,
        };

        let (data, after_data) = match frequency_band {
            Some(band) => {
                let body_len = ByteStuffer::body_len(band, rest)
                    .filter(|len| *len <= rest.len())
                    .ok_or(FrameCodecError::MalformedFrequencyTail {
                        band,
                        len: rest.len(),
                    })?;
                let raw = ByteStuffer::unstuff(band, &rest[..body_len])?;
                (raw.to_vec(), &rest[body_len..])
            }
            None => {
                let delimiter_at = rest
                    .iter()
                    .position(|byte| *byte == DELIMITER)
                    .ok_or(FrameCodecError::MissingDelimiter)?;
                (rest[..delimiter_at].to_vec(), &rest[delimiter_at..])
            }
        };

        let [first, tail @ ..] = after_data else {
            return Err(FrameCodecError::MissingDelimiter);
        };
        if *first != DELIMITER {
            return Err(FrameCodecError::MissingDelimiter);
        }
        let [checksum, trailer @ ..] = tail else {
            return Err(FrameCodecError::MissingChecksum);
        };

        let mut logical = wire[..HEADER_LEN].to_vec();
        logical.extend(data);

        Ok(DecodedCommand {
            opcode,
            parameter,
            logical,
            checksum: *checksum,
            trailer: trailer.to_vec(),
        })
    }
}

fn assemble(logical: Vec<u8>, stuffed: &[u8], trailer: Option<u8>) -> CommandFrame {
    let checksum = checksum(&logical);
    if checksum == DELIMITER {
        warn!(
            logical = %format_frame(&logical),
            "checksum collides with the frame delimiter"
        );
    }

    let mut wire = Vec::with_capacity(stuffed.len() + 3);
    wire.extend_from_slice(stuffed);
    wire.push(DELIMITER);
    wire.push(checksum);
    wire.extend(trailer);

    CommandFrame {
        logical,
        checksum,
        wire,
    }
}
