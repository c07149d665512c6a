//! Core domain types
//!
//! Every setting the module accepts is a validated newtype or enum, so a
//! value that reaches the encoder is already known to be legal on the wire.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::{Hc12Error, Hc12Result};

/// Serial port baud rates the module can be switched to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum BaudRate {
    B1200,
    B2400,
    B4800,
    B9600,
    B19200,
    B38400,
    B57600,
    B115200,
}

impl BaudRate {
    pub const ALL: [BaudRate; 8] = [
        BaudRate::B1200,
        BaudRate::B2400,
        BaudRate::B4800,
        BaudRate::B9600,
        BaudRate::B19200,
        BaudRate::B38400,
        BaudRate::B57600,
        BaudRate::B115200,
    ];

    pub fn bps(self) -> u32 {
        match self {
            BaudRate::B1200 => 1_200,
            BaudRate::B2400 => 2_400,
            BaudRate::B4800 => 4_800,
            BaudRate::B9600 => 9_600,
            BaudRate::B19200 => 19_200,
            BaudRate::B38400 => 38_400,
            BaudRate::B57600 => 57_600,
            BaudRate::B115200 => 115_200,
        }
    }
}

impl TryFrom<u32> for BaudRate {
    type Error = Hc12Error;

    fn try_from(bps: u32) -> Hc12Result<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|b| b.bps() == bps)
            .ok_or(Hc12Error::InvalidBaud(bps))
    }
}

impl From<BaudRate> for u32 {
    fn from(baud: BaudRate) -> u32 {
        baud.bps()
    }
}

impl fmt::Display for BaudRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.bps())
    }
}

/// Wireless channel, 1–127. Channel 1 sits at 433.4 MHz, 400 kHz per step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u16", into = "u16")]
pub struct Channel(u8);

impl Channel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 127;

    const BASE_FREQ_KHZ: u32 = 433_400;
    const STEP_KHZ: u32 = 400;

    pub fn new(channel: u16) -> Hc12Result<Self> {
        if (Self::MIN as u16..=Self::MAX as u16).contains(&channel) {
            Ok(Self(channel as u8))
        } else {
            Err(Hc12Error::InvalidChannel(channel))
        }
    }

    pub fn number(self) -> u8 {
        self.0
    }

    /// Working frequency of this channel in kHz.
    pub fn frequency_khz(self) -> u32 {
        Self::BASE_FREQ_KHZ + (u32::from(self.0) - 1) * Self::STEP_KHZ
    }
}

impl TryFrom<u16> for Channel {
    type Error = Hc12Error;

    fn try_from(channel: u16) -> Hc12Result<Self> {
        Self::new(channel)
    }
}

impl From<Channel> for u16 {
    fn from(channel: Channel) -> u16 {
        u16::from(channel.0)
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}", self.0)
    }
}

/// Transmit power index, 1–8. See `protocol::power` for the dBm mapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct PowerLevel(u8);

impl PowerLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 8;

    pub fn new(index: u8) -> Hc12Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&index) {
            Ok(Self(index))
        } else {
            Err(Hc12Error::InvalidPower(index))
        }
    }

    pub fn index(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for PowerLevel {
    type Error = Hc12Error;

    fn try_from(index: u8) -> Hc12Result<Self> {
        Self::new(index)
    }
}

impl From<PowerLevel> for u8 {
    fn from(level: PowerLevel) -> u8 {
        level.0
    }
}

/// Serial port transparent transmission mode (FU1–FU4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TransmissionMode {
    Fu1,
    Fu2,
    Fu3,
    Fu4,
}

impl TransmissionMode {
    pub fn number(self) -> u8 {
        match self {
            TransmissionMode::Fu1 => 1,
            TransmissionMode::Fu2 => 2,
            TransmissionMode::Fu3 => 3,
            TransmissionMode::Fu4 => 4,
        }
    }
}

impl TryFrom<u8> for TransmissionMode {
    type Error = Hc12Error;

    fn try_from(mode: u8) -> Hc12Result<Self> {
        match mode {
            1 => Ok(TransmissionMode::Fu1),
            2 => Ok(TransmissionMode::Fu2),
            3 => Ok(TransmissionMode::Fu3),
            4 => Ok(TransmissionMode::Fu4),
            other => Err(Hc12Error::InvalidTransmissionMode(other)),
        }
    }
}

impl fmt::Display for TransmissionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FU{}", self.number())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DataBits {
    Five,
    Six,
    Seven,
    Eight,
}

impl DataBits {
    pub fn bits(self) -> u8 {
        match self {
            DataBits::Five => 5,
            DataBits::Six => 6,
            DataBits::Seven => 7,
            DataBits::Eight => 8,
        }
    }
}

impl TryFrom<u8> for DataBits {
    type Error = Hc12Error;

    fn try_from(bits: u8) -> Hc12Result<Self> {
        match bits {
            5 => Ok(DataBits::Five),
            6 => Ok(DataBits::Six),
            7 => Ok(DataBits::Seven),
            8 => Ok(DataBits::Eight),
            other => Err(Hc12Error::InvalidDataBits(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Parity {
    None,
    Odd,
    Even,
}

impl Parity {
    /// Single-letter wire code: `N`, `O` or `E`.
    pub fn code(self) -> char {
        match self {
            Parity::None => 'N',
            Parity::Odd => 'O',
            Parity::Even => 'E',
        }
    }
}

impl TryFrom<char> for Parity {
    type Error = Hc12Error;

    fn try_from(code: char) -> Hc12Result<Self> {
        match code {
            'N' => Ok(Parity::None),
            'O' => Ok(Parity::Odd),
            'E' => Ok(Parity::Even),
            other => Err(Hc12Error::InvalidParity(other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StopBits {
    One,
    OnePointFive,
    Two,
}

impl StopBits {
    /// Wire digit: the module encodes 1.5 stop bits as `3`.
    pub fn code(self) -> char {
        match self {
            StopBits::One => '1',
            StopBits::Two => '2',
            StopBits::OnePointFive => '3',
        }
    }

    pub fn from_code(code: char) -> Option<Self> {
        match code {
            '1' => Some(StopBits::One),
            '2' => Some(StopBits::Two),
            '3' => Some(StopBits::OnePointFive),
            _ => None,
        }
    }

    pub fn count(self) -> f32 {
        match self {
            StopBits::One => 1.0,
            StopBits::OnePointFive => 1.5,
            StopBits::Two => 2.0,
        }
    }
}

impl TryFrom<f32> for StopBits {
    type Error = Hc12Error;

    fn try_from(count: f32) -> Hc12Result<Self> {
        [StopBits::One, StopBits::OnePointFive, StopBits::Two]
            .into_iter()
            .find(|s| s.count() == count)
            .ok_or(Hc12Error::InvalidStopBits(count))
    }
}

/// Serial framing of the module's UART, e.g. 8N1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SerialFraming {
    pub data_bits: DataBits,
    pub parity: Parity,
    pub stop_bits: StopBits,
}

impl SerialFraming {
    /// Validate caller-supplied framing. Data bits are checked first, then
    /// parity, then stop bits.
    pub fn new(data_bits: u8, parity: char, stop_bits: f32) -> Hc12Result<Self> {
        Ok(Self {
            data_bits: DataBits::try_from(data_bits)?,
            parity: Parity::try_from(parity)?,
            stop_bits: StopBits::try_from(stop_bits)?,
        })
    }
}

impl Default for SerialFraming {
    fn default() -> Self {
        Self {
            data_bits: DataBits::Eight,
            parity: Parity::None,
            stop_bits: StopBits::One,
        }
    }
}

impl fmt::Display for SerialFraming {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}{}",
            self.data_bits.bits(),
            self.parity.code(),
            self.stop_bits.code()
        )
    }
}

/// Firmware version reported by the `HC-12_V<major>.<minor>` banner.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FirmwareVersion {
    pub major: u8,
    pub minor: u8,
}

impl fmt::Display for FirmwareVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "V{}.{}", self.major, self.minor)
    }
}

/// Which state the driver believes the module is in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OperatingMode {
    /// SET released: serial bytes are relayed over the air.
    Transparent,
    /// SET pulled low: the module accepts AT commands.
    Command,
    /// `AT+UPDATE` was sent; the module ignores AT traffic until power-cycled.
    FirmwareUpdate,
}

/// Shadow of the module's configuration.
///
/// Only ever holds values the module confirmed: factory defaults at start,
/// then whatever a completed exchange reported back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfiguration {
    pub baud: BaudRate,
    pub channel: Channel,
    pub power: PowerLevel,
    pub mode: TransmissionMode,
    pub framing: SerialFraming,
    pub firmware: FirmwareVersion,
}

impl ModuleConfiguration {
    /// 9600 bps 8N1, channel 001, 20 dBm, FU3.
    pub fn factory_default() -> Self {
        Self {
            baud: BaudRate::B9600,
            channel: Channel(1),
            power: PowerLevel(8),
            mode: TransmissionMode::Fu3,
            framing: SerialFraming::default(),
            firmware: FirmwareVersion::default(),
        }
    }
}

impl Default for ModuleConfiguration {
    fn default() -> Self {
        Self::factory_default()
    }
}

/// Information about a serial port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SerialPortInfo {
    pub name: String,
    pub port_type: String,
}
