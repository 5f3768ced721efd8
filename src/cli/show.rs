use std::io;

use anyhow::{Context, Result};
use tracing::instrument;

use crate::channel::TunerChannel;
use crate::cli::OutputFormat;
use crate::cli::control::write_json_line;
use crate::tuner::{TunerProtocol, TunerStatus};

/// Executes the `show` command.
#[instrument(skip(tuner, out), level = "info")]
pub(crate) async fn run<C, W>(
    tuner: &mut TunerProtocol<C>,
    out: &mut W,
    output_format: OutputFormat,
) -> Result<()>
where
    C: TunerChannel,
    W: io::Write,
{
    let status = tuner.status().await.context("failed to read tuner status")?;

    match output_format {
        OutputFormat::Pretty => write_pretty(out, &status),
        OutputFormat::Json => write_json_line(out, &status),
    }
}

fn write_pretty(out: &mut impl io::Write, status: &TunerStatus) -> Result<()> {
    writeln!(
        out,
        "Detected tuner: NAD {} | Power: {}",
        status.device_id(),
        status.power()
    )?;
    if let Some(band) = status.band() {
        writeln!(out, "Band: {band}")?;
    }
    if let (Some(blend), Some(mute)) = (status.blend(), status.mute()) {
        writeln!(out, "FM switches (Blend: {blend} | Mute: {mute})")?;
    }
    if let Some(frequency) = status.fm_frequency() {
        writeln!(out, "FM frequency: {frequency}")?;
    }
    if let Some(frequency) = status.am_frequency() {
        writeln!(out, "AM frequency: {frequency}")?;
    }
    Ok(())
}
