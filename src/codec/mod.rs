mod checksum;
mod deframer;
mod frame;
mod frequency;
mod status;
mod stuffing;

pub use self::checksum::checksum;
pub use self::deframer::{DeframeStep, ResponseDeframer, ResponseFrame};
pub use self::frame::{CommandFrame, DecodedCommand, FrameCodec, FrameCodecError};
pub(crate) use self::frequency::parse_mhz;
pub use self::frequency::{AmFrequency, FmFrequency, FrequencyCodec};
pub use self::status::{Band, DeviceId, STATUS_OFFSET, StatusDecoder, SwitchState};
pub use self::stuffing::{ByteStuffer, StuffedTail};
