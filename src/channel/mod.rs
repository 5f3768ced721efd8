mod fake_backend;
mod link;
mod serial_backend;

pub use self::fake_backend::{FakeChannel, FakeTunerProbe, FakeTunerState};
pub use self::link::{ChannelBackend, TunerChannel, open_channel};
pub use self::serial_backend::{
    DEFAULT_BAUD_RATE, DEFAULT_PORT, DEFAULT_READ_TIMEOUT, SerialChannel, SerialConfig,
};

/// Creates a simulated tuner channel together with its probe.
#[must_use]
pub fn fake_channel(state: FakeTunerState) -> (FakeChannel, FakeTunerProbe) {
    FakeChannel::new(state)
}
