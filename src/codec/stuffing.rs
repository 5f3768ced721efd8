use crate::protocol::{DELIMITER, ESCAPE_BIAS, ESCAPE_MARKER, TunerBand};

use super::FrameCodecError;

/// FM low bytes that the tuner expects to be followed by an extra escape
/// marker after the checksum.
const FM_TRAILER_LOW_BYTES: [u8; 4] = [60, 58, 56, 54];

/// Frequency bytes as placed on the wire, plus any byte that must follow the
/// checksum.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct StuffedTail {
    body: Vec<u8>,
    trailer: Option<u8>,
}

impl StuffedTail {
    fn plain(raw: [u8; 2]) -> Self {
        Self {
            body: raw.to_vec(),
            trailer: None,
        }
    }

    /// Bytes written between the command header and the delimiter.
    #[must_use]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Byte appended after the checksum, if any.
    #[must_use]
    pub fn trailer(&self) -> Option<u8> {
        self.trailer
    }
}

/// Escapes raw frequency bytes for frequency writes.
///
/// Only the byte values the tuner is known to special-case are rewritten.
pub struct ByteStuffer;

impl ByteStuffer {
    /// Stuffs the little-endian raw FM value `[low, high]`.
    ///
    /// ```
    /// use nad_tuner::ByteStuffer;
    ///
    /// let tail = ByteStuffer::stuff_fm([94, 34]);
    /// assert_eq!(&[94, 94, 34], tail.body());
    /// assert_eq!(None, tail.trailer());
    /// ```
    #[must_use]
    pub fn stuff_fm(raw: [u8; 2]) -> StuffedTail {
        let [low, high] = raw;
        match low {
            ESCAPE_MARKER => StuffedTail {
                body: vec![ESCAPE_MARKER, ESCAPE_MARKER, high],
                trailer: None,
            },
            value if FM_TRAILER_LOW_BYTES.contains(&value) => StuffedTail {
                body: vec![low, high],
                trailer: Some(ESCAPE_MARKER),
            },
            DELIMITER => StuffedTail {
                body: vec![ESCAPE_MARKER, DELIMITER + ESCAPE_BIAS, high],
                trailer: None,
            },
            _ => StuffedTail::plain(raw),
        }
    }

    /// Stuffs the little-endian raw AM value `[low, high]`.
    ///
    /// ```
    /// use nad_tuner::ByteStuffer;
    ///
    /// let tail = ByteStuffer::stuff_am([46, 2]);
    /// assert_eq!(&[46, 94, 66], tail.body());
    /// ```
    #[must_use]
    pub fn stuff_am(raw: [u8; 2]) -> StuffedTail {
        let [low, high] = raw;
        match high {
            DELIMITER => StuffedTail {
                body: vec![low, ESCAPE_MARKER, DELIMITER + ESCAPE_BIAS],
                trailer: None,
            },
            _ => StuffedTail::plain(raw),
        }
    }

    /// Stuffs raw frequency bytes for `band`.
    #[must_use]
    pub fn stuff(band: TunerBand, raw: [u8; 2]) -> StuffedTail {
        match band {
            TunerBand::Am => Self::stuff_am(raw),
            TunerBand::Fm => Self::stuff_fm(raw),
        }
    }

    /// Number of body bytes a stuffed frequency occupies, judged from the
    /// first bytes after the command header.
    ///
    /// Returns `None` when `body` is too short to tell.
    #[must_use]
    pub fn body_len(band: TunerBand, body: &[u8]) -> Option<usize> {
        let marker = match band {
            TunerBand::Fm => *body.first()?,
            TunerBand::Am => *body.get(1)?,
        };
        Some(if marker == ESCAPE_MARKER { 3 } else { 2 })
    }

    /// Recovers the raw frequency bytes from a stuffed body.
    ///
    /// # Errors
    ///
    /// Returns an error when `body` is not a shape produced by [`Self::stuff`].
    ///
    /// ```
    /// use nad_tuner::{ByteStuffer, TunerBand};
    ///
    /// let tail = ByteStuffer::stuff(TunerBand::Fm, [2, 35]);
    /// assert_eq!([2, 35], ByteStuffer::unstuff(TunerBand::Fm, tail.body())?);
    /// # Ok::<(), nad_tuner::FrameCodecError>(())
    /// ```
    pub fn unstuff(band: TunerBand, body: &[u8]) -> Result<[u8; 2], FrameCodecError> {
        const ESCAPED_DELIMITER: u8 = DELIMITER + ESCAPE_BIAS;

        let raw = match (band, body) {
            (TunerBand::Fm, [ESCAPE_MARKER, ESCAPE_MARKER, high]) => Some([ESCAPE_MARKER, *high]),
            (TunerBand::Fm, [ESCAPE_MARKER, ESCAPED_DELIMITER, high]) => Some([DELIMITER, *high]),
            (TunerBand::Am, [low, ESCAPE_MARKER, ESCAPED_DELIMITER]) => Some([*low, DELIMITER]),
            (_, [low, high]) => Some([*low, *high]),
            _ => None,
        };

        raw.ok_or(FrameCodecError::MalformedFrequencyTail {
            band,
            len: body.len(),
        })
    }
}
