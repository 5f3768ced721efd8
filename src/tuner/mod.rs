mod validation;

use std::time::Duration;

use bon::Builder;
use owo_colors::OwoColorize;
use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, instrument, trace};
use tracing_indicatif::span_ext::IndicatifSpanExt;

use crate::channel::TunerChannel;
use crate::codec::{
    AmFrequency, Band, CommandFrame, DeviceId, FmFrequency, FrameCodec, FrequencyCodec,
    ResponseDeframer, ResponseFrame, STATUS_OFFSET, StatusDecoder, SwitchState,
};
use crate::error::ProtocolError;
use crate::protocol::{CommandId, Setting, Switch, TunerBand};
use crate::utils::format_frame;

pub use self::validation::{
    AM_CHANNEL_SPACING_KHZ, AM_MAX, AM_MIN, FM_MAX, FM_MIN, validate_am, validate_fm,
    validate_fm_mhz,
};

/// Time the tuner needs after a band change before it answers reliably.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_secs(2);

/// Orchestration settings.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Builder)]
pub struct TunerConfig {
    #[builder(default = DEFAULT_SETTLE_DELAY)]
    settle_delay: Duration,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}

impl TunerConfig {
    /// Pause after every band change.
    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        self.settle_delay
    }
}

/// Result of an idempotent tune request.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum TuneOutcome<F> {
    /// The tuner was already on the requested frequency; nothing was written.
    AlreadyTuned,
    /// A frequency write was sent.
    Retuned { previous: F },
}

/// Snapshot of the tuner, read the way `show` presents it.
///
/// Band and band-specific fields are only read while the tuner is powered on.
#[derive(Debug, Clone, Eq, PartialEq, Serialize)]
pub struct TunerStatus {
    device_id: DeviceId,
    power: SwitchState,
    #[serde(skip_serializing_if = "Option::is_none")]
    band: Option<Band>,
    #[serde(skip_serializing_if = "Option::is_none")]
    blend: Option<SwitchState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mute: Option<SwitchState>,
    #[serde(skip_serializing_if = "Option::is_none")]
    fm_frequency: Option<FmFrequency>,
    #[serde(skip_serializing_if = "Option::is_none")]
    am_frequency: Option<AmFrequency>,
}

impl TunerStatus {
    #[must_use]
    pub fn device_id(&self) -> &DeviceId {
        &self.device_id
    }

    #[must_use]
    pub fn power(&self) -> SwitchState {
        self.power
    }

    #[must_use]
    pub fn band(&self) -> Option<Band> {
        self.band
    }

    #[must_use]
    pub fn blend(&self) -> Option<SwitchState> {
        self.blend
    }

    #[must_use]
    pub fn mute(&self) -> Option<SwitchState> {
        self.mute
    }

    #[must_use]
    pub fn fm_frequency(&self) -> Option<FmFrequency> {
        self.fm_frequency
    }

    #[must_use]
    pub fn am_frequency(&self) -> Option<AmFrequency> {
        self.am_frequency
    }
}

/// Get and set operations against a tuner reachable over `C`.
///
/// Every query discards stale input, writes one frame and reads one response.
/// Frequency writes are fire-and-forget; whatever the tuner answers is purged
/// by the next transaction.
#[derive(Debug)]
pub struct TunerProtocol<C> {
    channel: C,
    config: TunerConfig,
}

impl<C> TunerProtocol<C>
where
    C: TunerChannel,
{
    /// Wraps `channel` with the default configuration.
    #[must_use]
    pub fn new(channel: C) -> Self {
        Self::with_config(channel, TunerConfig::default())
    }

    /// Wraps `channel` with an explicit configuration.
    #[must_use]
    pub fn with_config(channel: C, config: TunerConfig) -> Self {
        Self { channel, config }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Returns the underlying channel.
    pub fn into_channel(self) -> C {
        self.channel
    }

    /// Reads the power state.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    pub async fn power(&mut self) -> Result<SwitchState, ProtocolError> {
        self.switch_state(Switch::Power).await
    }

    /// Switches power, returning the state the tuner reports back.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    pub async fn set_power(&mut self, setting: Setting) -> Result<SwitchState, ProtocolError> {
        self.set_switch(Switch::Power, setting).await
    }

    /// Reads the FM blend state.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    pub async fn blend(&mut self) -> Result<SwitchState, ProtocolError> {
        self.switch_state(Switch::Blend).await
    }

    /// Switches FM blend.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    pub async fn set_blend(&mut self, setting: Setting) -> Result<SwitchState, ProtocolError> {
        self.set_switch(Switch::Blend, setting).await
    }

    /// Reads the FM mute state.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    pub async fn mute(&mut self) -> Result<SwitchState, ProtocolError> {
        self.switch_state(Switch::Mute).await
    }

    /// Switches FM mute.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    pub async fn set_mute(&mut self, setting: Setting) -> Result<SwitchState, ProtocolError> {
        self.set_switch(Switch::Mute, setting).await
    }

    /// Reads any binary field.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "debug")]
    pub async fn switch_state(&mut self, switch: Switch) -> Result<SwitchState, ProtocolError> {
        let response = self.transact(CommandId::QuerySwitch(switch)).await?;
        Ok(StatusDecoder::decode_switch(response.bytes(), STATUS_OFFSET)?)
    }

    /// Writes any binary field.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "info")]
    pub async fn set_switch(
        &mut self,
        switch: Switch,
        setting: Setting,
    ) -> Result<SwitchState, ProtocolError> {
        let response = self.transact(CommandId::SetSwitch(switch, setting)).await?;
        let state = StatusDecoder::decode_switch(response.bytes(), STATUS_OFFSET)?;
        info!(%switch, %state, "switch applied");
        Ok(state)
    }

    /// Reads the selected band.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "debug")]
    pub async fn band(&mut self) -> Result<Band, ProtocolError> {
        let response = self.transact(CommandId::QueryBand).await?;
        Ok(StatusDecoder::decode_band(response.bytes(), STATUS_OFFSET)?)
    }

    /// Selects `band`, then waits for the tuner to settle.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "info")]
    pub async fn switch_band(&mut self, band: TunerBand) -> Result<Band, ProtocolError> {
        let response = self.transact(CommandId::SelectBand(band)).await?;
        let reported = StatusDecoder::decode_band(response.bytes(), STATUS_OFFSET)?;
        self.settle().await;
        Ok(reported)
    }

    /// Flips between AM and FM, then waits for the tuner to settle.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "info")]
    pub async fn toggle_band(&mut self) -> Result<Band, ProtocolError> {
        let response = self.transact(CommandId::ToggleBand).await?;
        let reported = StatusDecoder::decode_band(response.bytes(), STATUS_OFFSET)?;
        self.settle().await;
        Ok(reported)
    }

    /// Reads the model identifier.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "debug")]
    pub async fn device_id(&mut self) -> Result<DeviceId, ProtocolError> {
        let response = self.transact(CommandId::QueryDeviceId).await?;
        Ok(StatusDecoder::decode_device_id(response.bytes())?)
    }

    /// Reads the FM frequency.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "debug")]
    pub async fn fm_frequency(&mut self) -> Result<FmFrequency, ProtocolError> {
        let response = self.transact(CommandId::QueryFrequency(TunerBand::Fm)).await?;
        Ok(FrequencyCodec::decode_fm(response.bytes())?)
    }

    /// Reads the AM frequency.
    ///
    /// # Errors
    ///
    /// Returns an error when the exchange fails or the reply is too short.
    #[instrument(skip(self), level = "debug")]
    pub async fn am_frequency(&mut self) -> Result<AmFrequency, ProtocolError> {
        let response = self.transact(CommandId::QueryFrequency(TunerBand::Am)).await?;
        Ok(FrequencyCodec::decode_am(response.bytes())?)
    }

    /// Tunes FM to `frequency`, switching band first when needed.
    ///
    /// Nothing is written when the tuner already reports `frequency`.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O when `frequency` is outside
    /// the FM band, and a channel or decode error when an exchange fails.
    #[instrument(skip(self, frequency), level = "info", fields(frequency = %frequency))]
    pub async fn set_fm_frequency(
        &mut self,
        frequency: FmFrequency,
    ) -> Result<TuneOutcome<FmFrequency>, ProtocolError> {
        let frequency = validate_fm(frequency)?;
        self.ensure_band(TunerBand::Fm).await?;

        let current = self.fm_frequency().await?;
        if current == frequency {
            debug!("tuner already on requested frequency");
            return Ok(TuneOutcome::AlreadyTuned);
        }

        let frame =
            FrameCodec::encode_frequency_write(TunerBand::Fm, FrequencyCodec::fm_to_raw(frequency));
        self.send(&frame).await?;
        info!(%current, "tuned");
        Ok(TuneOutcome::Retuned { previous: current })
    }

    /// Tunes AM to `frequency`, switching band first when needed.
    ///
    /// # Errors
    ///
    /// Returns a validation error before any I/O when `frequency` is outside
    /// the AM band or off its channel grid, and a channel or decode error when
    /// an exchange fails.
    #[instrument(skip(self, frequency), level = "info", fields(frequency = %frequency))]
    pub async fn set_am_frequency(
        &mut self,
        frequency: AmFrequency,
    ) -> Result<TuneOutcome<AmFrequency>, ProtocolError> {
        let frequency = validate_am(frequency)?;
        self.ensure_band(TunerBand::Am).await?;

        let current = self.am_frequency().await?;
        if current == frequency {
            debug!("tuner already on requested frequency");
            return Ok(TuneOutcome::AlreadyTuned);
        }

        let frame =
            FrameCodec::encode_frequency_write(TunerBand::Am, FrequencyCodec::am_to_raw(frequency));
        self.send(&frame).await?;
        info!(%current, "tuned");
        Ok(TuneOutcome::Retuned { previous: current })
    }

    /// Reads device ID and power, and while powered on the band and the
    /// fields of the active band.
    ///
    /// # Errors
    ///
    /// Returns an error when any exchange fails.
    #[instrument(skip(self), level = "info")]
    pub async fn status(&mut self) -> Result<TunerStatus, ProtocolError> {
        let device_id = self.device_id().await?;
        let power = self.power().await?;
        let mut status = TunerStatus {
            device_id,
            power,
            band: None,
            blend: None,
            mute: None,
            fm_frequency: None,
            am_frequency: None,
        };
        if !power.is_on() {
            return Ok(status);
        }

        let band = self.band().await?;
        status.band = Some(band);
        match band {
            Band::Fm => {
                status.blend = Some(self.blend().await?);
                status.mute = Some(self.mute().await?);
                status.fm_frequency = Some(self.fm_frequency().await?);
            }
            Band::Am => {
                status.am_frequency = Some(self.am_frequency().await?);
            }
            Band::Unknown(_) => {}
        }
        Ok(status)
    }

    async fn ensure_band(&mut self, band: TunerBand) -> Result<(), ProtocolError> {
        let current = self.band().await?;
        if current.tuner_band() != Some(band) {
            debug!(%current, requested = %band, "switching band before tuning");
            self.switch_band(band).await?;
        }
        Ok(())
    }

    async fn settle(&self) {
        let delay = self.config.settle_delay;
        if delay.is_zero() {
            return;
        }
        let span = info_span!("settle", delay = %humantime::format_duration(delay));
        span.pb_set_message("Waiting for the tuner to settle");
        span.pb_set_finish_message(&format!("{} Band changed", "✓".green()));
        tokio::time::sleep(delay).instrument(span).await;
    }

    async fn transact(&mut self, command: CommandId) -> Result<ResponseFrame, ProtocolError> {
        trace!(%command, "transaction");
        self.exchange(&FrameCodec::encode_command(command)).await
    }

    async fn exchange(&mut self, frame: &CommandFrame) -> Result<ResponseFrame, ProtocolError> {
        self.send(frame).await?;
        Ok(ResponseDeframer::read_frame(&mut self.channel).await?)
    }

    async fn send(&mut self, frame: &CommandFrame) -> Result<(), ProtocolError> {
        self.channel.discard_input().await?;
        trace!(frame = %format_frame(frame.wire()), "sending");
        self.channel.write_all(frame.wire()).await?;
        Ok(())
    }
}
