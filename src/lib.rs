mod app;
mod channel;
mod cli;
mod codec;
mod error;
mod protocol;
mod telemetry;
mod tuner;
mod utils;

pub use app::{run, run_with_channel, run_with_log_level};
pub use channel::{
    ChannelBackend, DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_READ_TIMEOUT, FakeChannel,
    FakeTunerProbe, FakeTunerState, SerialChannel, SerialConfig, TunerChannel, fake_channel,
    open_channel,
};
pub use cli::{Args, BandChoice, Command, LogLevel, OnOff, OutputFormat};
pub use codec::{
    AmFrequency, Band, ByteStuffer, CommandFrame, DecodedCommand, DeframeStep, DeviceId,
    FmFrequency, FrameCodec, FrameCodecError, FrequencyCodec, ResponseDeframer, ResponseFrame,
    STATUS_OFFSET, StatusDecoder, StuffedTail, SwitchState, checksum,
};
pub use error::{ChannelError, FixtureError, ProtocolError, ValidationError};
pub use protocol::{
    CommandId, CommandSpec, DELIMITER, DEVICE_ADDRESS, ESCAPE_BIAS, ESCAPE_MARKER, Opcode,
    Parameter, Setting, Switch, TunerBand, command_spec, frequency_write_header,
};
pub use tuner::{
    AM_CHANNEL_SPACING_KHZ, AM_MAX, AM_MIN, DEFAULT_SETTLE_DELAY, FM_MAX, FM_MIN, TuneOutcome,
    TunerConfig, TunerProtocol, TunerStatus, validate_am, validate_fm, validate_fm_mhz,
};
