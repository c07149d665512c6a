//! Validation and encoding: caller values → `AtCommand` → AT wire string.
//!
//! The constructors check each field against the module's rules before any
//! I/O happens; `encode` is then a pure, infallible render.

use crate::domain::{BaudRate, Channel, Hc12Result, PowerLevel, SerialFraming, TransmissionMode};

use super::AtCommand;

/// Every request is terminated by a single newline.
pub const TERMINATOR: char = '\n';

impl AtCommand {
    pub fn set_baud(bps: u32) -> Hc12Result<Self> {
        Ok(AtCommand::SetBaud(BaudRate::try_from(bps)?))
    }

    pub fn set_channel(channel: u16) -> Hc12Result<Self> {
        Ok(AtCommand::SetChannel(Channel::new(channel)?))
    }

    pub fn set_transmission_mode(mode: u8) -> Hc12Result<Self> {
        Ok(AtCommand::SetTransmissionMode(TransmissionMode::try_from(mode)?))
    }

    pub fn set_power(index: u8) -> Hc12Result<Self> {
        Ok(AtCommand::SetPower(PowerLevel::new(index)?))
    }

    pub fn set_power_dbm(dbm: i16) -> Hc12Result<Self> {
        Ok(AtCommand::SetPower(PowerLevel::from_dbm(dbm)?))
    }

    pub fn set_serial_framing(data_bits: u8, parity: char, stop_bits: f32) -> Hc12Result<Self> {
        Ok(AtCommand::SetSerialFraming(SerialFraming::new(
            data_bits, parity, stop_bits,
        )?))
    }
}

/// Encode an AtCommand into the HC-12 wire string (including the newline).
pub fn encode(cmd: &AtCommand) -> String {
    use AtCommand::*;
    let request = cmd.entry().request;
    let args = match cmd {
        Test | RestoreDefaults | Sleep | FirmwareUpdate => String::new(),
        GetBaud | GetChannel | GetTransmissionMode | GetPower | GetAll | GetVersion => {
            String::new()
        }
        SetBaud(baud) => baud.bps().to_string(),
        SetChannel(channel) => format!("{:03}", channel.number()),
        SetTransmissionMode(mode) => mode.number().to_string(),
        SetPower(level) => level.index().to_string(),
        SetSerialFraming(framing) => framing.to_string(),
    };
    format!("{request}{args}{TERMINATOR}")
}
