use std::time::Duration;

use clap::{Parser, Subcommand};

use crate::channel::{
    ChannelBackend, DEFAULT_BAUD_RATE, DEFAULT_PORT, FakeTunerState, SerialConfig,
};
use crate::cli::control::{BandChoice, OnOff};
use crate::cli::{LogLevel, OutputFormat};
use crate::codec::{AmFrequency, FmFrequency, parse_mhz};
use crate::error::ValidationError;
use crate::tuner::{TunerConfig, validate_fm_mhz};

/// Command-line options for the NAD tuner tool.
#[derive(Debug, Parser)]
#[command(name = "nad-tuner", about = "Control a NAD tuner over its serial port.")]
pub struct Args {
    /// Serial device the tuner is attached to.
    #[arg(long, global = true, default_value = DEFAULT_PORT)]
    port: String,
    /// Serial baud rate.
    #[arg(long, global = true, default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,
    /// Time to wait for each byte from the tuner (e.g. `500ms`, `1s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    timeout: Option<Duration>,
    /// Pause after a band change (e.g. `2s`, `0s`).
    #[arg(long, global = true, value_parser = parse_duration)]
    settle_delay: Option<Duration>,
    /// Log verbosity; overrides `RUST_LOG`.
    #[arg(long, global = true, value_enum)]
    log_level: Option<LogLevel>,
    /// Result format; defaults to `pretty` on a terminal and `json` otherwise.
    #[arg(long, global = true, value_enum)]
    output: Option<OutputFormat>,
    /// Talks to an in-memory simulated tuner instead of a serial port.
    #[arg(long, global = true)]
    fake: bool,
    /// Simulated tuner settings in the form `power=on,band=fm,fm=96.80,...`.
    #[arg(long, global = true, requires = "fake")]
    fake_state: Option<FakeTunerState>,
    #[command(subcommand)]
    command: Command,
}

impl Args {
    /// Requested log level, if any.
    #[must_use]
    pub fn log_level(&self) -> Option<LogLevel> {
        self.log_level
    }

    /// Requested output format, if any.
    #[must_use]
    pub fn output_format(&self) -> Option<OutputFormat> {
        self.output
    }

    /// Orchestration settings derived from the flags.
    #[must_use]
    pub fn tuner_config(&self) -> TunerConfig {
        TunerConfig::builder()
            .maybe_settle_delay(self.settle_delay)
            .build()
    }

    /// Splits parsed arguments into the command and the channel backend.
    ///
    /// ```
    /// use clap::Parser;
    /// use nad_tuner::{Args, ChannelBackend, Command};
    ///
    /// let args = Args::try_parse_from(["nad-tuner", "--fake", "show"])?;
    /// let (command, backend) = args.into_command_and_backend();
    /// assert!(matches!(command, Command::Show));
    /// assert!(matches!(backend, ChannelBackend::Fake(_)));
    /// # Ok::<(), clap::Error>(())
    /// ```
    #[must_use]
    pub fn into_command_and_backend(self) -> (Command, ChannelBackend) {
        let Args {
            port,
            baud,
            timeout,
            fake,
            fake_state,
            command,
            ..
        } = self;

        let backend = if fake {
            ChannelBackend::Fake(fake_state.unwrap_or_default())
        } else {
            ChannelBackend::Serial(
                SerialConfig::builder()
                    .port(port)
                    .baud_rate(baud)
                    .maybe_read_timeout(timeout)
                    .build(),
            )
        };

        (command, backend)
    }
}

/// Supported CLI commands.
#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Print the model, power state and, while on, the active band's settings.
    Show,
    /// Switch the tuner on or off.
    Power {
        #[arg(value_enum)]
        state: OnOff,
    },
    /// Switch FM blend.
    Blend {
        #[arg(value_enum)]
        state: OnOff,
    },
    /// Switch FM mute.
    Mute {
        #[arg(value_enum)]
        state: OnOff,
    },
    /// Select a band, or flip between AM and FM.
    Band {
        #[arg(value_enum)]
        band: BandChoice,
    },
    /// Tune to an FM frequency in MHz (87.50 to 108.00).
    Fm {
        #[arg(value_parser = parse_fm_request)]
        frequency: FmFrequency,
    },
    /// Tune to an AM frequency in kHz (531 to 1602, 9 kHz steps).
    Am { frequency: AmFrequency },
}

impl Command {
    pub(crate) fn name(&self) -> &'static str {
        match self {
            Self::Show => "show",
            Self::Power { .. } => "power",
            Self::Blend { .. } => "blend",
            Self::Mute { .. } => "mute",
            Self::Band { .. } => "band",
            Self::Fm { .. } => "fm",
            Self::Am { .. } => "am",
        }
    }

    /// Whether pretty output follows the action with the `show` block.
    ///
    /// Switching power off and AM tuning report only their own result.
    pub(crate) fn reports_status_after(&self) -> bool {
        matches!(
            self,
            Self::Power { state: OnOff::On }
                | Self::Blend { .. }
                | Self::Mute { .. }
                | Self::Band { .. }
                | Self::Fm { .. }
        )
    }
}

fn parse_fm_request(value: &str) -> Result<FmFrequency, ValidationError> {
    validate_fm_mhz(parse_mhz(value)?)
}

fn parse_duration(value: &str) -> Result<Duration, String> {
    humantime::parse_duration(value).map_err(|error| error.to_string())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use clap::error::ErrorKind;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    use super::*;
    use crate::protocol::TunerBand;

    #[test]
    fn fake_state_requires_fake_mode() {
        let result = Args::try_parse_from(["nad-tuner", "--fake-state", "power=off", "show"]);

        let error = result.expect_err("--fake-state should require --fake");
        assert_eq!(ErrorKind::MissingRequiredArgument, error.kind());
    }

    #[test]
    fn malformed_fake_state_is_rejected() {
        let result =
            Args::try_parse_from(["nad-tuner", "--fake", "--fake-state", "volume=3", "show"]);

        let error = result.expect_err("unknown fixture keys should fail argument parsing");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }

    #[test]
    fn fake_mode_builds_simulated_backend() {
        let args = Args::try_parse_from(["nad-tuner", "--fake", "--fake-state", "band=am", "show"])
            .expect("valid fake arguments should parse");

        let (command, backend) = args.into_command_and_backend();

        assert_matches!(command, Command::Show);
        assert_matches!(backend, ChannelBackend::Fake(state) if state.band() == TunerBand::Am);
    }

    #[test]
    fn serial_flags_build_serial_config() {
        let args = Args::try_parse_from([
            "nad-tuner",
            "--port",
            "/dev/ttyS3",
            "--timeout",
            "250ms",
            "power",
            "on",
        ])
        .expect("serial arguments should parse");

        let (command, backend) = args.into_command_and_backend();

        assert_matches!(command, Command::Power { state: OnOff::On });
        let ChannelBackend::Serial(config) = backend else {
            panic!("serial backend expected");
        };
        assert_eq!("/dev/ttyS3", config.port());
        assert_eq!(9600, config.baud_rate());
        assert_eq!(Duration::from_millis(250), config.read_timeout());
    }

    #[test]
    fn settle_delay_flag_overrides_default() {
        let args = Args::try_parse_from(["nad-tuner", "--settle-delay", "0s", "band", "toggle"])
            .expect("settle delay should parse");

        assert_eq!(Duration::ZERO, args.tuner_config().settle_delay());
        assert_eq!(
            Duration::from_secs(2),
            Args::try_parse_from(["nad-tuner", "show"])
                .expect("show should parse")
                .tuner_config()
                .settle_delay()
        );
    }

    #[rstest]
    #[case(&["nad-tuner", "power", "on"], true)]
    #[case(&["nad-tuner", "power", "off"], false)]
    #[case(&["nad-tuner", "blend", "off"], true)]
    #[case(&["nad-tuner", "mute", "on"], true)]
    #[case(&["nad-tuner", "band", "toggle"], true)]
    #[case(&["nad-tuner", "fm", "96.8"], true)]
    #[case(&["nad-tuner", "am", "558"], false)]
    #[case(&["nad-tuner", "show"], false)]
    fn status_follows_state_changing_commands(#[case] argv: &[&str], #[case] expected: bool) {
        let args = Args::try_parse_from(argv).expect("arguments should parse");
        let (command, _backend) = args.into_command_and_backend();
        assert_eq!(expected, command.reports_status_after());
    }

    #[test]
    fn frequency_arguments_parse_with_units() {
        let args = Args::try_parse_from(["nad-tuner", "fm", "96.8"]).expect("fm should parse");
        assert_matches!(
            args.into_command_and_backend().0,
            Command::Fm { frequency } if frequency == FmFrequency::from_centi_mhz(9680)
        );

        let result = Args::try_parse_from(["nad-tuner", "fm", "108.004"]);
        let error = result.expect_err("108.004 MHz is above the FM band");
        assert_eq!(ErrorKind::ValueValidation, error.kind());

        let result = Args::try_parse_from(["nad-tuner", "am", "loud"]);
        let error = result.expect_err("non-numeric AM frequency should fail");
        assert_eq!(ErrorKind::ValueValidation, error.kind());
    }
}
