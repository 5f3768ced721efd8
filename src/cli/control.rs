use std::io;

use anyhow::{Context, Result};
use clap::ValueEnum;
use serde::Serialize;
use tracing::instrument;

use crate::channel::TunerChannel;
use crate::cli::OutputFormat;
use crate::codec::{AmFrequency, Band, FmFrequency, SwitchState};
use crate::protocol::{Setting, Switch, TunerBand};
use crate::tuner::{TuneOutcome, TunerProtocol};

/// JSON result emitted by a control command.
#[derive(Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
enum ControlResult {
    Power {
        state: SwitchState,
    },
    Blend {
        state: SwitchState,
    },
    Mute {
        state: SwitchState,
    },
    Band {
        band: Band,
    },
    Fm {
        frequency: FmFrequency,
        retuned: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<FmFrequency>,
    },
    Am {
        frequency: AmFrequency,
        retuned: bool,
        #[serde(skip_serializing_if = "Option::is_none")]
        previous: Option<AmFrequency>,
    },
}

/// Requested value of a switch.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum OnOff {
    Off,
    On,
}

impl From<OnOff> for Setting {
    fn from(value: OnOff) -> Self {
        match value {
            OnOff::Off => Self::Off,
            OnOff::On => Self::On,
        }
    }
}

/// Band requested by `band`.
#[derive(Debug, Clone, Copy, Eq, PartialEq, ValueEnum)]
pub enum BandChoice {
    Am,
    Fm,
    /// Flip to whichever band is not active.
    Toggle,
}

/// Switches one binary field and reports the state the tuner answers with.
#[instrument(skip(tuner, out), level = "debug")]
pub(crate) async fn set_switch<C, W>(
    tuner: &mut TunerProtocol<C>,
    switch: Switch,
    state: OnOff,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    C: TunerChannel,
    W: io::Write,
{
    let reported = tuner
        .set_switch(switch, state.into())
        .await
        .with_context(|| format!("failed to switch {switch}"))?;

    match output_format {
        OutputFormat::Pretty => {
            writeln!(out, "{}: {reported}", capitalised(switch))?;
        }
        OutputFormat::Json => {
            let result = match switch {
                Switch::Power => ControlResult::Power { state: reported },
                Switch::Blend => ControlResult::Blend { state: reported },
                Switch::Mute => ControlResult::Mute { state: reported },
            };
            write_json_line(out, &result)?;
        }
    }
    Ok(())
}

/// Selects or toggles the band.
#[instrument(skip(tuner, out), level = "debug")]
pub(crate) async fn select_band<C, W>(
    tuner: &mut TunerProtocol<C>,
    choice: BandChoice,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    C: TunerChannel,
    W: io::Write,
{
    let reported = match choice {
        BandChoice::Am => tuner.switch_band(TunerBand::Am).await,
        BandChoice::Fm => tuner.switch_band(TunerBand::Fm).await,
        BandChoice::Toggle => tuner.toggle_band().await,
    }
    .context("failed to change band")?;

    match output_format {
        OutputFormat::Pretty => writeln!(out, "Band: {reported}")?,
        OutputFormat::Json => write_json_line(out, &ControlResult::Band { band: reported })?,
    }
    Ok(())
}

/// Tunes FM unless the tuner is already there.
#[instrument(skip(tuner, out), level = "debug")]
pub(crate) async fn tune_fm<C, W>(
    tuner: &mut TunerProtocol<C>,
    frequency: FmFrequency,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    C: TunerChannel,
    W: io::Write,
{
    let outcome = tuner
        .set_fm_frequency(frequency)
        .await
        .with_context(|| format!("failed to tune to {frequency}"))?;

    match output_format {
        OutputFormat::Pretty => write_tune_line(out, TunerBand::Fm, frequency, outcome)?,
        OutputFormat::Json => write_json_line(
            out,
            &ControlResult::Fm {
                frequency,
                retuned: outcome != TuneOutcome::AlreadyTuned,
                previous: previous(outcome),
            },
        )?,
    }
    Ok(())
}

/// Tunes AM unless the tuner is already there.
#[instrument(skip(tuner, out), level = "debug")]
pub(crate) async fn tune_am<C, W>(
    tuner: &mut TunerProtocol<C>,
    frequency: AmFrequency,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    C: TunerChannel,
    W: io::Write,
{
    let outcome = tuner
        .set_am_frequency(frequency)
        .await
        .with_context(|| format!("failed to tune to {frequency}"))?;

    match output_format {
        OutputFormat::Pretty => write_tune_line(out, TunerBand::Am, frequency, outcome)?,
        OutputFormat::Json => write_json_line(
            out,
            &ControlResult::Am {
                frequency,
                retuned: outcome != TuneOutcome::AlreadyTuned,
                previous: previous(outcome),
            },
        )?,
    }
    Ok(())
}

fn write_tune_line<F>(
    out: &mut impl io::Write,
    band: TunerBand,
    frequency: F,
    outcome: TuneOutcome<F>,
) -> Result<()>
where
    F: std::fmt::Display,
{
    match outcome {
        TuneOutcome::AlreadyTuned => {
            writeln!(out, "{band} frequency: {frequency} (already tuned)")?;
        }
        TuneOutcome::Retuned { previous } => {
            writeln!(out, "{band} frequency: {frequency} (was {previous})")?;
        }
    }
    Ok(())
}

fn previous<F>(outcome: TuneOutcome<F>) -> Option<F> {
    match outcome {
        TuneOutcome::AlreadyTuned => None,
        TuneOutcome::Retuned { previous } => Some(previous),
    }
}

fn capitalised(switch: Switch) -> &'static str {
    match switch {
        Switch::Power => "Power",
        Switch::Blend => "Blend",
        Switch::Mute => "Mute",
    }
}

pub(crate) fn write_json_line(out: &mut impl io::Write, value: &impl Serialize) -> Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)?;
    Ok(())
}
