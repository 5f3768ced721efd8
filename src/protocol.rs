use std::collections::HashMap;
use std::sync::LazyLock;

use strum::IntoEnumIterator;
use strum_macros::{Display, EnumIter};

/// Address byte that prefixes every command sent to the tuner.
pub const DEVICE_ADDRESS: u8 = 1;
/// Frame delimiter; precedes the trailing checksum byte.
pub const DELIMITER: u8 = 0x02;
/// Escape marker (`^`).
pub const ESCAPE_MARKER: u8 = 94;
/// Bias added to a byte that travels behind an escape marker.
pub const ESCAPE_BIAS: u8 = 64;

/// Command opcodes understood by the tuner.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display)]
pub enum Opcode {
    #[strum(to_string = "read")]
    Read,
    #[strum(to_string = "write")]
    Write,
    #[strum(to_string = "mode_switch")]
    ModeSwitch,
}

impl Opcode {
    /// Raw opcode byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::Read => 20,
            Self::Write => 21,
            Self::ModeSwitch => 22,
        }
    }

    pub(crate) fn from_byte(value: u8) -> Option<Self> {
        match value {
            20 => Some(Self::Read),
            21 => Some(Self::Write),
            22 => Some(Self::ModeSwitch),
            _ => None,
        }
    }
}

/// Field selected by a command.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, Display)]
pub enum Parameter {
    #[strum(to_string = "device_id")]
    DeviceId,
    #[strum(to_string = "power")]
    Power,
    #[strum(to_string = "band")]
    Band,
    #[strum(to_string = "am_frequency")]
    AmFrequency,
    #[strum(to_string = "fm_frequency")]
    FmFrequency,
    #[strum(to_string = "mute")]
    Mute,
    #[strum(to_string = "blend")]
    Blend,
    #[strum(to_string = "band_toggle")]
    BandToggle,
}

impl Parameter {
    /// Raw parameter byte.
    #[must_use]
    pub const fn as_byte(self) -> u8 {
        match self {
            Self::DeviceId => 20,
            Self::Power => 21,
            Self::Band => 43,
            Self::AmFrequency => 44,
            Self::FmFrequency => 45,
            Self::Mute => 47,
            Self::Blend => 49,
            Self::BandToggle => 129,
        }
    }

    pub(crate) fn from_byte(value: u8) -> Option<Self> {
        match value {
            20 => Some(Self::DeviceId),
            21 => Some(Self::Power),
            43 => Some(Self::Band),
            44 => Some(Self::AmFrequency),
            45 => Some(Self::FmFrequency),
            47 => Some(Self::Mute),
            49 => Some(Self::Blend),
            129 => Some(Self::BandToggle),
            _ => None,
        }
    }
}

/// Reception band the tuner can be switched to.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
pub enum TunerBand {
    #[strum(to_string = "AM")]
    Am,
    #[strum(to_string = "FM")]
    Fm,
}

impl TunerBand {
    fn select_argument(self) -> u8 {
        match self {
            Self::Am => 0,
            Self::Fm => 1,
        }
    }

    fn frequency_parameter(self) -> Parameter {
        match self {
            Self::Am => Parameter::AmFrequency,
            Self::Fm => Parameter::FmFrequency,
        }
    }
}

/// Binary tuner fields that can be read and switched.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
pub enum Switch {
    #[strum(to_string = "power")]
    Power,
    #[strum(to_string = "blend")]
    Blend,
    #[strum(to_string = "mute")]
    Mute,
}

impl Switch {
    fn parameter(self) -> Parameter {
        match self {
            Self::Power => Parameter::Power,
            Self::Blend => Parameter::Blend,
            Self::Mute => Parameter::Mute,
        }
    }
}

/// Requested value for a [`Switch`].
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, EnumIter, Display)]
pub enum Setting {
    #[strum(to_string = "off")]
    Off,
    #[strum(to_string = "on")]
    On,
}

impl Setting {
    fn argument(self) -> u8 {
        match self {
            Self::Off => 0,
            Self::On => 1,
        }
    }
}

/// Every fixed command the tool issues.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, derive_more::Display)]
pub enum CommandId {
    #[display("query_device_id")]
    QueryDeviceId,
    #[display("query_{_0}")]
    QuerySwitch(Switch),
    #[display("set_{_0}_{_1}")]
    SetSwitch(Switch, Setting),
    #[display("query_band")]
    QueryBand,
    #[display("select_{_0}")]
    SelectBand(TunerBand),
    #[display("toggle_band")]
    ToggleBand,
    #[display("query_{_0}_frequency")]
    QueryFrequency(TunerBand),
}

impl CommandId {
    fn all() -> Vec<Self> {
        let mut commands = vec![Self::QueryDeviceId, Self::QueryBand, Self::ToggleBand];
        for switch in Switch::iter() {
            commands.push(Self::QuerySwitch(switch));
            commands.extend(Setting::iter().map(|setting| Self::SetSwitch(switch, setting)));
        }
        for band in TunerBand::iter() {
            commands.push(Self::SelectBand(band));
            commands.push(Self::QueryFrequency(band));
        }
        commands
    }
}

/// Logical layout of one fixed command.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub struct CommandSpec {
    opcode: Opcode,
    parameter: Parameter,
    argument: Option<u8>,
}

impl CommandSpec {
    /// Command opcode.
    #[must_use]
    pub fn opcode(self) -> Opcode {
        self.opcode
    }

    /// Targeted parameter.
    #[must_use]
    pub fn parameter(self) -> Parameter {
        self.parameter
    }

    /// Logical payload, before delimiter and checksum.
    #[must_use]
    pub fn payload(self) -> Vec<u8> {
        let mut payload = header(self.opcode, self.parameter).to_vec();
        payload.extend(self.argument);
        payload
    }
}

/// Command layouts keyed by command ID.
pub(crate) static COMMANDS_BY_ID: LazyLock<HashMap<CommandId, CommandSpec>> =
    LazyLock::new(|| {
        CommandId::all()
            .into_iter()
            .map(|command| (command, spec_for(command)))
            .collect()
    });

/// Returns the layout of one fixed command.
#[must_use]
pub fn command_spec(command: CommandId) -> CommandSpec {
    COMMANDS_BY_ID
        .get(&command)
        .copied()
        .unwrap_or_else(|| spec_for(command))
}

/// Header of a frequency write for `band`; the raw frequency bytes follow it.
#[must_use]
pub fn frequency_write_header(band: TunerBand) -> [u8; 3] {
    header(Opcode::Write, band.frequency_parameter())
}

fn header(opcode: Opcode, parameter: Parameter) -> [u8; 3] {
    [DEVICE_ADDRESS, opcode.as_byte(), parameter.as_byte()]
}

fn spec_for(command: CommandId) -> CommandSpec {
    let (opcode, parameter, argument) = match command {
        CommandId::QueryDeviceId => (Opcode::Read, Parameter::DeviceId, None),
        CommandId::QuerySwitch(switch) => (Opcode::Read, switch.parameter(), None),
        CommandId::SetSwitch(switch, setting) => {
            (Opcode::Write, switch.parameter(), Some(setting.argument()))
        }
        CommandId::QueryBand => (Opcode::Read, Parameter::Band, None),
        CommandId::SelectBand(band) => (Opcode::Write, Parameter::Band, Some(band.select_argument())),
        CommandId::ToggleBand => (Opcode::ModeSwitch, Parameter::BandToggle, None),
        CommandId::QueryFrequency(band) => (Opcode::Read, band.frequency_parameter(), None),
    };

    CommandSpec {
        opcode,
        parameter,
        argument,
    }
}
