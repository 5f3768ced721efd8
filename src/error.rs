use std::time::Duration;

use derive_more::From;
use thiserror::Error;

use crate::codec::{AmFrequency, FmFrequency, FrameCodecError};

/// Errors raised by the byte channel to the tuner.
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to open serial port `{port}`")]
    Open {
        port: String,
        source: tokio_serial::Error,
    },
    #[error("timed out after {} waiting for the tuner", humantime::format_duration(*timeout))]
    Timeout { timeout: Duration },
    #[error("failed to read from the tuner")]
    Read { source: std::io::Error },
    #[error("failed to write to the tuner")]
    Write { source: std::io::Error },
    #[error("failed to discard buffered input")]
    Discard { source: tokio_serial::Error },
    #[error("the link to the tuner is closed")]
    Closed,
}

/// Errors returned when a requested frequency cannot be tuned.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationError {
    #[error("`{value}` is not a frequency")]
    NotANumber { value: String },
    #[error("{mhz} MHz cannot be represented in hundredths of a megahertz")]
    UnrepresentableFm { mhz: f64 },
    #[error("frequency should be between {min} and {max}, got {value}")]
    FmOutOfRange {
        value: FmFrequency,
        min: FmFrequency,
        max: FmFrequency,
    },
    #[error("frequency should be between {min} and {max}, got {mhz} MHz")]
    FmRequestOutOfRange {
        mhz: f64,
        min: FmFrequency,
        max: FmFrequency,
    },
    #[error("frequency should be between {min} and {max}, got {value}")]
    AmOutOfRange {
        value: AmFrequency,
        min: AmFrequency,
        max: AmFrequency,
    },
    #[error("{value} is not on the {spacing_khz} kHz channel grid starting at {base}")]
    AmOffGrid {
        value: AmFrequency,
        base: AmFrequency,
        spacing_khz: u16,
    },
}

/// Errors returned when parsing simulated tuner fixtures.
#[derive(Debug, Error, Clone, Eq, PartialEq)]
pub enum FixtureError {
    #[error("the simulated tuner fixture is empty")]
    EmptyFixture,
    #[error("fixture entry `{entry}` is not a `key=value` pair")]
    InvalidEntry { entry: String },
    #[error("unknown fixture key `{key}`")]
    UnknownKey { key: String },
    #[error("invalid value `{value}` for fixture key `{key}`")]
    InvalidValue { key: String, value: String },
}

/// Errors returned by telemetry initialisation.
#[derive(Debug, Error)]
pub(crate) enum TelemetryError {
    #[error("failed to install tracing subscriber")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Top-level protocol errors wrapping module-specific error types.
#[derive(Debug, Error, From)]
pub enum ProtocolError {
    #[error(transparent)]
    #[from(ChannelError, Box<ChannelError>)]
    Channel(Box<ChannelError>),
    #[error(transparent)]
    #[from(ValidationError, Box<ValidationError>)]
    Validation(Box<ValidationError>),
    #[error(transparent)]
    #[from(FrameCodecError, Box<FrameCodecError>)]
    FrameCodec(Box<FrameCodecError>),
}
