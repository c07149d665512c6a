//! AT command layer for the HC-12.
//!
//! This module separates the concerns of one AT exchange:
//! - `encode`: validate caller values and render `AtCommand` → wire string
//! - `decode`: classify and parse one reply line → `Reply` (pure, no I/O)
//! - `exchange`: per-command outcome state machine, owns the pending update
//! - `session`: own the serial connection, drive the read loop and draining
//! - `power`: the static power index ↔ dBm table
//!
//! encode/decode/exchange are pure so they can be tested without any
//! mock serial port.

pub mod decode;
pub mod encode;
pub mod exchange;
pub mod power;
pub mod session;

pub use decode::{classify, decode_line, ConfirmTag, Reply, ReplyKind};
pub use encode::encode;
pub use exchange::{ConfigUpdate, Exchange, Outcome, Progress};
pub use session::AtSession;

use std::fmt;

use crate::domain::{BaudRate, Channel, PowerLevel, SerialFraming, TransmissionMode};

/// Operations understood by the HC-12.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtCommand {
    Test,
    RestoreDefaults,
    Sleep,
    FirmwareUpdate,
    SetBaud(BaudRate),
    SetChannel(Channel),
    SetTransmissionMode(TransmissionMode),
    SetPower(PowerLevel),
    SetSerialFraming(SerialFraming),
    GetBaud,
    GetChannel,
    GetTransmissionMode,
    GetPower,
    GetAll,
    GetVersion,
}

/// Numeric operation identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    Test = 20,
    RestoreDefaults = 21,
    Sleep = 22,
    FirmwareUpdate = 23,
    SetBaud = 24,
    SetChannel = 25,
    SetTransmissionMode = 26,
    SetPower = 27,
    SetSerialFraming = 29,
    GetBaud = 30,
    GetChannel = 31,
    GetTransmissionMode = 32,
    GetPower = 33,
    GetAll = 34,
    GetVersion = 36,
}

/// Catalog metadata for one operation.
///
/// `request` is the fixed request text the encoder appends arguments to;
/// `reply` documents the confirmation shape in printf notation.
#[derive(Debug, PartialEq, Eq)]
pub struct CatalogEntry {
    pub code: CommandCode,
    pub request: &'static str,
    pub reply: &'static str,
    /// Decoded fields that make the exchange complete
    pub reply_fields: usize,
}

impl CommandCode {
    pub const ALL: [CommandCode; 15] = [
        CommandCode::Test,
        CommandCode::RestoreDefaults,
        CommandCode::Sleep,
        CommandCode::FirmwareUpdate,
        CommandCode::SetBaud,
        CommandCode::SetChannel,
        CommandCode::SetTransmissionMode,
        CommandCode::SetPower,
        CommandCode::SetSerialFraming,
        CommandCode::GetBaud,
        CommandCode::GetChannel,
        CommandCode::GetTransmissionMode,
        CommandCode::GetPower,
        CommandCode::GetAll,
        CommandCode::GetVersion,
    ];

    pub fn entry(self) -> &'static CatalogEntry {
        use CommandCode::*;
        match self {
            Test => &CatalogEntry {
                code: Test,
                request: "AT",
                reply: "OK",
                reply_fields: 0,
            },
            RestoreDefaults => &CatalogEntry {
                code: RestoreDefaults,
                request: "AT+DEFAULT",
                reply: "OK+DEFAULT",
                reply_fields: 0,
            },
            Sleep => &CatalogEntry {
                code: Sleep,
                request: "AT+SLEEP",
                reply: "OK+SLEEP",
                reply_fields: 0,
            },
            FirmwareUpdate => &CatalogEntry {
                code: FirmwareUpdate,
                request: "AT+UPDATE",
                reply: "",
                reply_fields: 0,
            },
            SetBaud => &CatalogEntry {
                code: SetBaud,
                request: "AT+B",
                reply: "OK+B%d",
                reply_fields: 1,
            },
            SetChannel => &CatalogEntry {
                code: SetChannel,
                request: "AT+C",
                reply: "OK+C%03d",
                reply_fields: 1,
            },
            SetTransmissionMode => &CatalogEntry {
                code: SetTransmissionMode,
                request: "AT+FU",
                reply: "OK+FU%d",
                reply_fields: 1,
            },
            SetPower => &CatalogEntry {
                code: SetPower,
                request: "AT+P",
                reply: "OK+P%d",
                reply_fields: 1,
            },
            SetSerialFraming => &CatalogEntry {
                code: SetSerialFraming,
                request: "AT+U",
                reply: "OK+U%d%c%d",
                reply_fields: 3,
            },
            GetBaud => &CatalogEntry {
                code: GetBaud,
                request: "AT+RB",
                reply: "OK+B%d",
                reply_fields: 1,
            },
            GetChannel => &CatalogEntry {
                code: GetChannel,
                request: "AT+RC",
                reply: "OK+RC%03d",
                reply_fields: 1,
            },
            GetTransmissionMode => &CatalogEntry {
                code: GetTransmissionMode,
                request: "AT+RF",
                reply: "OK+FU%d",
                reply_fields: 1,
            },
            GetPower => &CatalogEntry {
                code: GetPower,
                request: "AT+RP",
                reply: "OK+RP:%ddBm",
                reply_fields: 1,
            },
            GetAll => &CatalogEntry {
                code: GetAll,
                request: "AT+RX",
                reply: "OK+B%d\\r\\nOK+RC%03d\\r\\nOK+RP:%ddBm\\r\\nOK+FU%d",
                reply_fields: 4,
            },
            GetVersion => &CatalogEntry {
                code: GetVersion,
                request: "AT+V",
                reply: "HC-12_V%c.%c",
                reply_fields: 2,
            },
        }
    }
}

impl AtCommand {
    pub fn code(&self) -> CommandCode {
        use AtCommand::*;
        match self {
            Test => CommandCode::Test,
            RestoreDefaults => CommandCode::RestoreDefaults,
            Sleep => CommandCode::Sleep,
            FirmwareUpdate => CommandCode::FirmwareUpdate,
            SetBaud(_) => CommandCode::SetBaud,
            SetChannel(_) => CommandCode::SetChannel,
            SetTransmissionMode(_) => CommandCode::SetTransmissionMode,
            SetPower(_) => CommandCode::SetPower,
            SetSerialFraming(_) => CommandCode::SetSerialFraming,
            GetBaud => CommandCode::GetBaud,
            GetChannel => CommandCode::GetChannel,
            GetTransmissionMode => CommandCode::GetTransmissionMode,
            GetPower => CommandCode::GetPower,
            GetAll => CommandCode::GetAll,
            GetVersion => CommandCode::GetVersion,
        }
    }

    pub fn entry(&self) -> &'static CatalogEntry {
        self.code().entry()
    }

    /// `AT+UPDATE` is the one request the module never answers.
    pub fn expects_reply(&self) -> bool {
        !matches!(self, AtCommand::FirmwareUpdate)
    }
}

impl fmt::Display for AtCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.code())
    }
}
