//! Domain error types

use thiserror::Error;

use super::OperatingMode;

/// Errors that can occur while driving an HC-12 module
#[derive(Error, Debug)]
pub enum Hc12Error {
    // --- Validation (detected before any I/O) ---
    #[error("bad baud rate: {0} bps")]
    InvalidBaud(u32),

    #[error("bad channel: {0} (expected 1-127)")]
    InvalidChannel(u16),

    #[error("bad power index: {0} (expected 1-8)")]
    InvalidPower(u8),

    #[error("bad transmission mode: FU{0} (expected FU1-FU4)")]
    InvalidTransmissionMode(u8),

    #[error("bad data bits: {0} (expected 5-8)")]
    InvalidDataBits(u8),

    #[error("bad parity: '{0}' (expected N, O or E)")]
    InvalidParity(char),

    #[error("bad stop bits: {0} (expected 1, 1.5 or 2)")]
    InvalidStopBits(f32),

    #[error("no power level for {0} dBm")]
    UnknownDbm(i16),

    // --- Operating mode ---
    #[error("module is in {0:?} mode, AT commands need command mode")]
    NotInCommandMode(OperatingMode),

    // --- Transport ---
    #[error("no serial connection bound")]
    NotConnected,

    #[error("Serial port error: {0}")]
    Serial(String),

    #[error("read timed out")]
    ReadTimeout,

    #[error("no power line wired to the module")]
    NoPowerLine,

    // --- Protocol ---
    #[error("{command}: expected {expected} reply field(s), decoded {decoded}")]
    FieldCount {
        command: String,
        expected: usize,
        decoded: usize,
    },

    #[error("{command}: requested {requested}, module confirmed {confirmed}")]
    Mismatch {
        command: String,
        requested: String,
        confirmed: String,
    },

    #[error("{command}: unexpected reply '{reply}'")]
    UnexpectedReply { command: String, reply: String },

    #[error("malformed reply: '{0}'")]
    BadReply(String),

    #[error("unrecognized reply: '{0}'")]
    Unrecognized(String),

    // --- Settings ---
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Hc12Error {
    /// Classic numeric result code: negative, grouped by failure kind.
    pub fn code(&self) -> i32 {
        use Hc12Error::*;
        match self {
            Mismatch { .. } => -1,
            UnexpectedReply { .. } | Unrecognized(_) => -2,
            FieldCount { .. } | BadReply(_) => -3,
            NotInCommandMode(_) => -4,
            NotConnected => -5,
            Serial(_) => -6,
            ReadTimeout => -7,
            NoPowerLine => -8,
            InvalidBaud(_) => -10,
            InvalidParity(_) => -11,
            InvalidDataBits(_) => -12,
            InvalidStopBits(_) => -13,
            InvalidTransmissionMode(_) => -15,
            InvalidChannel(_) => -16,
            InvalidPower(_) => -17,
            UnknownDbm(_) => -18,
            Config(_) => -30,
        }
    }

    /// True for errors raised before anything touched the transport.
    pub fn is_validation(&self) -> bool {
        (-18..=-10).contains(&self.code())
    }
}

/// Result type alias for HC-12 operations
pub type Hc12Result<T> = Result<T, Hc12Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn validation_codes_are_field_specific() {
        assert_eq!(Hc12Error::InvalidBaud(300).code(), -10);
        assert_eq!(Hc12Error::InvalidChannel(0).code(), -16);
        assert_eq!(Hc12Error::InvalidPower(9).code(), -17);
        assert!(Hc12Error::InvalidParity('X').is_validation());
        assert!(!Hc12Error::ReadTimeout.is_validation());
        assert!(!Hc12Error::NotInCommandMode(OperatingMode::Transparent).is_validation());
    }

    #[test]
    fn error_messages_name_the_field() {
        assert_eq!(
            Hc12Error::InvalidBaud(300).to_string(),
            "bad baud rate: 300 bps"
        );
        assert!(Hc12Error::InvalidChannel(128).to_string().contains("128"));
    }

    #[test]
    fn transport_codes_are_distinct() {
        let codes = [
            Hc12Error::NotConnected.code(),
            Hc12Error::Serial(String::new()).code(),
            Hc12Error::ReadTimeout.code(),
            Hc12Error::NoPowerLine.code(),
        ];
        assert_eq!(codes, [-5, -6, -7, -8]);
        assert!(!Hc12Error::NoPowerLine.is_validation());
    }
}
