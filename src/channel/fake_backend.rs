use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use bon::Builder;
use tracing::{debug, trace, warn};

use super::TunerChannel;
use super::serial_backend::DEFAULT_READ_TIMEOUT;
use crate::codec::{AmFrequency, FmFrequency, FrameCodec, FrequencyCodec, checksum};
use crate::error::{ChannelError, FixtureError};
use crate::protocol::{
    DELIMITER, DEVICE_ADDRESS, ESCAPE_BIAS, ESCAPE_MARKER, Opcode, Parameter, TunerBand,
};
use crate::utils::format_frame;

const DEFAULT_DEVICE_ID: &str = "T743";
const DEFAULT_FM: FmFrequency = FmFrequency::from_centi_mhz(9680);
const DEFAULT_AM: AmFrequency = AmFrequency::from_khz(1008);
const DEVICE_ID_LEN: usize = 4;
/// Bytes below this value travel caret-escaped in status and AM replies.
const CONTROL_BYTE_LIMIT: u8 = 0x20;

/// Settings of the simulated tuner.
#[derive(Debug, Clone, Eq, PartialEq, Builder)]
pub struct FakeTunerState {
    #[builder(default = true)]
    power: bool,
    #[builder(default)]
    blend: bool,
    #[builder(default)]
    mute: bool,
    #[builder(default = TunerBand::Fm)]
    band: TunerBand,
    #[builder(default = DEFAULT_FM)]
    fm: FmFrequency,
    #[builder(default = DEFAULT_AM)]
    am: AmFrequency,
    #[builder(into, default = DEFAULT_DEVICE_ID.to_string())]
    device_id: String,
}

impl Default for FakeTunerState {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl FakeTunerState {
    /// Power state.
    #[must_use]
    pub fn power(&self) -> bool {
        self.power
    }

    /// Blend state.
    #[must_use]
    pub fn blend(&self) -> bool {
        self.blend
    }

    /// Mute state.
    #[must_use]
    pub fn mute(&self) -> bool {
        self.mute
    }

    /// Selected band.
    #[must_use]
    pub fn band(&self) -> TunerBand {
        self.band
    }

    /// Tuned FM frequency.
    #[must_use]
    pub fn fm(&self) -> FmFrequency {
        self.fm
    }

    /// Tuned AM frequency.
    #[must_use]
    pub fn am(&self) -> AmFrequency {
        self.am
    }

    /// Four-character model code answered to device ID queries.
    #[must_use]
    pub fn device_id(&self) -> &str {
        &self.device_id
    }
}

impl FromStr for FakeTunerState {
    type Err = FixtureError;

    /// Parses `key=value` pairs separated by commas, e.g.
    /// `power=on,band=am,am=1008`. Unlisted keys keep their defaults.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim().is_empty() {
            return Err(FixtureError::EmptyFixture);
        }

        let mut state = Self::default();
        for entry in value.split(',').map(str::trim) {
            let Some((key, raw_value)) = entry.split_once('=') else {
                return Err(FixtureError::InvalidEntry {
                    entry: entry.to_string(),
                });
            };
            let (key, raw_value) = (key.trim(), raw_value.trim());
            let invalid = || FixtureError::InvalidValue {
                key: key.to_string(),
                value: raw_value.to_string(),
            };

            match key {
                "power" => state.power = parse_on_off(raw_value).ok_or_else(invalid)?,
                "blend" => state.blend = parse_on_off(raw_value).ok_or_else(invalid)?,
                "mute" => state.mute = parse_on_off(raw_value).ok_or_else(invalid)?,
                "band" => state.band = parse_band(raw_value).ok_or_else(invalid)?,
                "fm" => state.fm = raw_value.parse().map_err(|_| invalid())?,
                "am" => state.am = raw_value.parse().map_err(|_| invalid())?,
                "id" => {
                    if raw_value.len() != DEVICE_ID_LEN
                        || !raw_value.bytes().all(|byte| byte.is_ascii_alphanumeric())
                    {
                        return Err(invalid());
                    }
                    state.device_id = raw_value.to_string();
                }
                _ => {
                    return Err(FixtureError::UnknownKey {
                        key: key.to_string(),
                    });
                }
            }
        }
        Ok(state)
    }
}

#[derive(Debug)]
struct FakeTuner {
    state: FakeTunerState,
    connected: bool,
    received: Vec<Vec<u8>>,
    rejected: Vec<Vec<u8>>,
}

impl FakeTuner {
    /// Applies one received frame and returns the reply block, if the tuner
    /// answers.
    fn handle(&mut self, wire: &[u8]) -> Option<Vec<u8>> {
        self.received.push(wire.to_vec());

        let command = match FrameCodec::decode_command(wire) {
            Ok(command) if command.checksum_matches() => command,
            Ok(_command) => {
                warn!(frame = %format_frame(wire), "simulated tuner rejected checksum");
                self.rejected.push(wire.to_vec());
                return None;
            }
            Err(error) => {
                warn!(frame = %format_frame(wire), %error, "simulated tuner rejected frame");
                self.rejected.push(wire.to_vec());
                return None;
            }
        };

        let reply = match (command.opcode(), command.parameter(), command.data()) {
            (Some(Opcode::Read), Some(parameter), []) => self.query(parameter),
            (Some(Opcode::Write), Some(Parameter::FmFrequency), [low, high]) => {
                self.state.fm = FrequencyCodec::fm_from_raw([*low, *high]);
                debug!(frequency = %self.state.fm, "simulated tuner retuned");
                return None;
            }
            (Some(Opcode::Write), Some(Parameter::AmFrequency), [low, high]) => {
                self.state.am = FrequencyCodec::am_from_raw([*low, *high]);
                debug!(frequency = %self.state.am, "simulated tuner retuned");
                return None;
            }
            (Some(Opcode::Write), Some(parameter), [argument]) => {
                self.write(parameter, *argument)
            }
            (Some(Opcode::ModeSwitch), Some(Parameter::BandToggle), []) => {
                self.state.band = match self.state.band {
                    TunerBand::Am => TunerBand::Fm,
                    TunerBand::Fm => TunerBand::Am,
                };
                self.query(Parameter::Band)
            }
            _ => None,
        };

        if reply.is_none() {
            self.rejected.push(wire.to_vec());
        }
        reply
    }

    fn query(&self, parameter: Parameter) -> Option<Vec<u8>> {
        let data = match parameter {
            Parameter::DeviceId => self.state.device_id.as_bytes().to_vec(),
            Parameter::Power => caret_escape(&[u8::from(self.state.power)]),
            Parameter::Blend => caret_escape(&[u8::from(self.state.blend)]),
            Parameter::Mute => caret_escape(&[u8::from(self.state.mute)]),
            Parameter::Band => caret_escape(&[u8::from(self.state.band == TunerBand::Fm)]),
            Parameter::FmFrequency => fm_escape(&FrequencyCodec::fm_to_raw(self.state.fm)),
            Parameter::AmFrequency => caret_escape(&FrequencyCodec::am_to_raw(self.state.am)),
            Parameter::BandToggle => return None,
        };
        Some(reply_block(Opcode::Read, parameter, &data))
    }

    fn write(&mut self, parameter: Parameter, argument: u8) -> Option<Vec<u8>> {
        let on = match argument {
            0 => false,
            1 => true,
            _ => return None,
        };
        match parameter {
            Parameter::Power => self.state.power = on,
            Parameter::Blend => self.state.blend = on,
            Parameter::Mute => self.state.mute = on,
            Parameter::Band => self.state.band = if on { TunerBand::Fm } else { TunerBand::Am },
            _ => return None,
        }
        Some(reply_block(
            Opcode::Write,
            parameter,
            &caret_escape(&[argument]),
        ))
    }
}

/// Channel end of the simulated tuner.
///
/// Each reply arrives as two bursts: the echo (reply block, delimiter and
/// checksum) and, once the echo has been consumed, the reply block again.
#[derive(Debug)]
pub struct FakeChannel {
    tuner: Arc<Mutex<FakeTuner>>,
    current: VecDeque<u8>,
    bursts: VecDeque<Vec<u8>>,
}

impl FakeChannel {
    /// Creates a simulated tuner and a probe for inspecting it.
    #[must_use]
    pub fn new(state: FakeTunerState) -> (Self, FakeTunerProbe) {
        let tuner = Arc::new(Mutex::new(FakeTuner {
            state,
            connected: true,
            received: Vec::new(),
            rejected: Vec::new(),
        }));
        let channel = Self {
            tuner: Arc::clone(&tuner),
            current: VecDeque::new(),
            bursts: VecDeque::new(),
        };
        (channel, FakeTunerProbe { tuner })
    }

    fn tuner(&self) -> MutexGuard<'_, FakeTuner> {
        self.tuner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn ensure_connected(&self) -> Result<(), ChannelError> {
        if self.tuner().connected {
            Ok(())
        } else {
            Err(ChannelError::Closed)
        }
    }
}

#[async_trait]
impl TunerChannel for FakeChannel {
    async fn write_all(&mut self, bytes: &[u8]) -> Result<(), ChannelError> {
        self.ensure_connected()?;
        trace!(frame = %format_frame(bytes), "simulated tuner received frame");
        let reply = self.tuner().handle(bytes);
        if let Some(block) = reply {
            let mut echo = block.clone();
            echo.push(DELIMITER);
            echo.push(checksum(&block));
            self.bursts.push_back(echo);
            self.bursts.push_back(block);
        }
        Ok(())
    }

    async fn read_byte(&mut self) -> Result<u8, ChannelError> {
        self.ensure_connected()?;
        if self.current.is_empty()
            && let Some(burst) = self.bursts.pop_front()
        {
            self.current = burst.into();
        }
        self.current.pop_front().ok_or(ChannelError::Timeout {
            timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    async fn discard_input(&mut self) -> Result<(), ChannelError> {
        self.ensure_connected()?;
        self.current.clear();
        Ok(())
    }
}

/// Test-side view of a simulated tuner.
#[derive(Debug, Clone)]
pub struct FakeTunerProbe {
    tuner: Arc<Mutex<FakeTuner>>,
}

impl FakeTunerProbe {
    fn tuner(&self) -> MutexGuard<'_, FakeTuner> {
        self.tuner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Current tuner settings.
    #[must_use]
    pub fn state(&self) -> FakeTunerState {
        self.tuner().state.clone()
    }

    /// Every frame written to the tuner, in order.
    #[must_use]
    pub fn received_frames(&self) -> Vec<Vec<u8>> {
        self.tuner().received.clone()
    }

    /// Frames the tuner ignored.
    #[must_use]
    pub fn rejected_frames(&self) -> Vec<Vec<u8>> {
        self.tuner().rejected.clone()
    }

    /// Drops the link; later reads and writes fail.
    pub fn disconnect(&self) {
        self.tuner().connected = false;
    }
}

fn reply_block(opcode: Opcode, parameter: Parameter, data: &[u8]) -> Vec<u8> {
    let mut block = vec![DEVICE_ADDRESS, opcode.as_byte(), parameter.as_byte()];
    block.extend_from_slice(data);
    block
}

/// Caret notation: control bytes become `[94, byte + 64]`, the marker doubles.
fn caret_escape(data: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len() * 2);
    for byte in data {
        match *byte {
            ESCAPE_MARKER => escaped.extend([ESCAPE_MARKER, ESCAPE_MARKER]),
            value if value < CONTROL_BYTE_LIMIT => {
                escaped.extend([ESCAPE_MARKER, value + ESCAPE_BIAS]);
            }
            value => escaped.push(value),
        }
    }
    escaped
}

/// FM readings only escape the marker itself and the delimiter.
fn fm_escape(data: &[u8]) -> Vec<u8> {
    let mut escaped = Vec::with_capacity(data.len() * 2);
    for byte in data {
        match *byte {
            ESCAPE_MARKER => escaped.extend([ESCAPE_MARKER, ESCAPE_MARKER]),
            DELIMITER => escaped.extend([ESCAPE_MARKER, DELIMITER + ESCAPE_BIAS]),
            value => escaped.push(value),
        }
    }
    escaped
}

fn parse_on_off(value: &str) -> Option<bool> {
    match value {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

fn parse_band(value: &str) -> Option<TunerBand> {
    match value {
        "am" => Some(TunerBand::Am),
        "fm" => Some(TunerBand::Fm),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::codec::{FrequencyCodec, STATUS_OFFSET, StatusDecoder, SwitchState};

    fn tuner(state: FakeTunerState) -> FakeTuner {
        FakeTuner {
            state,
            connected: true,
            received: Vec::new(),
            rejected: Vec::new(),
        }
    }

    #[test]
    fn fixture_parses_listed_keys_and_keeps_defaults() {
        let state: FakeTunerState = "power=off, band=am, am=558, id=C425"
            .parse()
            .expect("fixture should parse");

        assert!(!state.power());
        assert_eq!(TunerBand::Am, state.band());
        assert_eq!(AmFrequency::from_khz(558), state.am());
        assert_eq!(DEFAULT_FM, state.fm());
        assert_eq!("C425", state.device_id());
    }

    #[rstest]
    #[case("", FixtureError::EmptyFixture)]
    #[case("power", FixtureError::InvalidEntry { entry: "power".to_string() })]
    #[case("volume=3", FixtureError::UnknownKey { key: "volume".to_string() })]
    #[case("band=lw", FixtureError::InvalidValue { key: "band".to_string(), value: "lw".to_string() })]
    #[case("id=T7", FixtureError::InvalidValue { key: "id".to_string(), value: "T7".to_string() })]
    fn fixture_rejects_malformed_entries(#[case] fixture: &str, #[case] expected: FixtureError) {
        assert_eq!(Err(expected), fixture.parse::<FakeTunerState>());
    }

    #[test]
    fn status_replies_decode_at_status_offset() {
        let mut tuner = tuner(FakeTunerState::builder().mute(true).build());

        let reply = tuner
            .handle(&[1, 20, 47, 2, 188])
            .expect("mute query should be answered");

        assert_eq!(vec![1, 20, 47, 94, 65], reply);
        assert_eq!(
            Ok(SwitchState::On),
            StatusDecoder::decode_switch(&reply, STATUS_OFFSET)
        );
    }

    #[rstest]
    #[case(531)]
    #[case(558)]
    #[case(1008)]
    #[case(1026)]
    #[case(1602)]
    fn am_replies_decode_back_to_the_tuned_frequency(#[case] khz: u16) {
        let mut tuner = tuner(FakeTunerState::builder().am(AmFrequency::from_khz(khz)).build());

        let reply = tuner
            .handle(&[1, 20, 44, 2, 191])
            .expect("AM query should be answered");

        assert_eq!(
            Ok(AmFrequency::from_khz(khz)),
            FrequencyCodec::decode_am(&reply)
        );
    }

    #[rstest]
    #[case(8750)]
    #[case(8798)]
    #[case(9680)]
    #[case(10800)]
    fn fm_replies_decode_back_to_the_tuned_frequency(#[case] centi_mhz: u16) {
        let frequency = FmFrequency::from_centi_mhz(centi_mhz);
        let mut tuner = tuner(FakeTunerState::builder().fm(frequency).build());

        let reply = tuner
            .handle(&[1, 20, 45, 2, 190])
            .expect("FM query should be answered");

        assert_eq!(Ok(frequency), FrequencyCodec::decode_fm(&reply));
    }

    #[test]
    fn stuffed_frequency_writes_retune_without_reply() {
        let mut tuner = tuner(FakeTunerState::default());

        let reply = tuner.handle(&[1, 21, 45, 94, 94, 34, 2, 61]);

        assert_eq!(None, reply);
        assert_eq!(FmFrequency::from_centi_mhz(8798), tuner.state.fm);
        assert!(tuner.rejected.is_empty());
    }

    #[test]
    fn frames_with_checksum_over_stuffed_bytes_are_rejected() {
        let mut tuner = tuner(FakeTunerState::default());
        let wrong_checksum = checksum(&[1, 21, 45, 94, 94, 34]);

        let reply = tuner.handle(&[1, 21, 45, 94, 94, 34, 2, wrong_checksum]);

        assert_eq!(None, reply);
        assert_eq!(DEFAULT_FM, tuner.state.fm);
        assert_eq!(1, tuner.rejected.len());
    }

    #[test]
    fn caret_escape_shifts_control_bytes() {
        assert_eq!(vec![94, 64, 94, 94, 240], caret_escape(&[0, 94, 240]));
        assert_eq!(vec![94, 66, 94, 94, 37], fm_escape(&[2, 94, 37]));
    }

    #[tokio::test]
    async fn disconnected_channel_fails_reads_and_writes() {
        let (mut channel, probe) = FakeChannel::new(FakeTunerState::default());
        probe.disconnect();

        assert_matches!(channel.write_all(&[1, 20, 21, 2, 214]).await, Err(ChannelError::Closed));
        assert_matches!(channel.read_byte().await, Err(ChannelError::Closed));
    }

    #[tokio::test]
    async fn silent_tuner_times_out() {
        let (mut channel, _probe) = FakeChannel::new(FakeTunerState::default());

        assert_matches!(channel.read_byte().await, Err(ChannelError::Timeout { .. }));
    }
}
