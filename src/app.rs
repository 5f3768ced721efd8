use std::io::{self, IsTerminal};

use anyhow::{Context, Result};
use tracing::instrument;

use crate::channel::{ChannelBackend, TunerChannel, open_channel};
use crate::cli::{Command, LogLevel, OutputFormat};
use crate::protocol::Switch;
use crate::telemetry;
use crate::tuner::{TunerConfig, TunerProtocol};

/// Runs one CLI command against the selected backend.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use clap::Parser;
///
/// let args = nad_tuner::Args::try_parse_from(["nad-tuner", "--fake", "show"])?;
/// let tuner_config = args.tuner_config();
/// let (command, backend) = args.into_command_and_backend();
/// let mut out = Vec::new();
/// nad_tuner::run(
///     command,
///     &mut out,
///     backend,
///     tuner_config,
///     nad_tuner::OutputFormat::Pretty,
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the channel cannot be
/// opened, a tuner exchange fails, or output writing fails.
pub async fn run<W>(
    command: Command,
    out: &mut W,
    backend: ChannelBackend,
    tuner_config: TunerConfig,
    output_format: OutputFormat,
) -> Result<()>
where
    W: io::Write,
{
    run_with_log_level(command, out, backend, tuner_config, output_format, None).await
}

/// Runs one CLI command with an explicit telemetry log-level override.
///
/// # Errors
///
/// Returns an error if tracing initialisation fails, the channel cannot be
/// opened, a tuner exchange fails, or output writing fails.
#[instrument(
    skip(command, out, backend, tuner_config),
    level = "info",
    fields(command = command.name())
)]
pub async fn run_with_log_level<W>(
    command: Command,
    out: &mut W,
    backend: ChannelBackend,
    tuner_config: TunerConfig,
    output_format: OutputFormat,
    log_level: Option<LogLevel>,
) -> Result<()>
where
    W: io::Write,
{
    telemetry::initialise_tracing(
        "nad-tuner",
        io::stderr().is_terminal(),
        log_level.map(LogLevel::as_level_filter),
    )?;

    let channel = open_channel(backend)
        .await
        .context("failed to connect to the tuner")?;

    run_with_channel(command, out, channel, tuner_config, output_format).await
}

/// Runs one CLI command over an already open channel.
///
/// In pretty output, commands that change tuner state are followed by the
/// `show` status block.
///
/// ```
/// # async fn run() -> anyhow::Result<()> {
/// use nad_tuner::{Command, FakeTunerState, OutputFormat, TunerConfig, fake_channel};
///
/// let (channel, _probe) = fake_channel(FakeTunerState::default());
/// let mut out = Vec::new();
/// nad_tuner::run_with_channel(
///     Command::Show,
///     &mut out,
///     channel,
///     TunerConfig::default(),
///     OutputFormat::Pretty,
/// )
/// .await?;
/// assert!(String::from_utf8(out)?.starts_with("Detected tuner: NAD T743"));
/// # Ok(())
/// # }
/// ```
///
/// # Errors
///
/// Returns an error if a tuner exchange fails or output writing fails.
pub async fn run_with_channel<C, W>(
    command: Command,
    out: &mut W,
    channel: C,
    tuner_config: TunerConfig,
    output_format: OutputFormat,
) -> Result<()>
where
    C: TunerChannel,
    W: io::Write,
{
    let mut tuner = TunerProtocol::with_config(channel, tuner_config);
    let follow_with_status =
        output_format == OutputFormat::Pretty && command.reports_status_after();

    match command {
        Command::Show => crate::cli::show::run(&mut tuner, out, output_format).await,
        Command::Power { state } => {
            crate::cli::control::set_switch(&mut tuner, Switch::Power, state, out, output_format)
                .await
        }
        Command::Blend { state } => {
            crate::cli::control::set_switch(&mut tuner, Switch::Blend, state, out, output_format)
                .await
        }
        Command::Mute { state } => {
            crate::cli::control::set_switch(&mut tuner, Switch::Mute, state, out, output_format)
                .await
        }
        Command::Band { band } => {
            crate::cli::control::select_band(&mut tuner, band, out, output_format).await
        }
        Command::Fm { frequency } => {
            crate::cli::control::tune_fm(&mut tuner, frequency, out, output_format).await
        }
        Command::Am { frequency } => {
            crate::cli::control::tune_am(&mut tuner, frequency, out, output_format).await
        }
    }?;

    if follow_with_status {
        crate::cli::show::run(&mut tuner, out, output_format).await?;
    }
    Ok(())
}
