//! Pure decoding: one reply line → typed `Reply`.
//!
//! Decoding happens in two steps. `classify` looks at the line once and
//! produces a `ReplyKind`; several confirmation replies share leading
//! characters (`OK+C…` / `OK+RC…` / `OK+RP:…`), so the sub-tag is resolved
//! here and nowhere else. `decode_line` then matches exhaustively on the
//! kind and parses the fields. No I/O and no state survives between calls.

use std::str::FromStr;

use crate::domain::{
    BaudRate, Channel, DataBits, FirmwareVersion, Hc12Error, Hc12Result, Parity, PowerLevel,
    SerialFraming, StopBits, TransmissionMode,
};

/// Firmware banner, e.g. `HC-12_V2.4` (sometimes preceded by a vendor URL).
pub const BANNER_MARKER: &str = "HC-12_V";

/// Confirmation replies start with this, followed by a sub-tag.
pub const CONFIRM_MARKER: &str = "OK+";

/// Bare affirmative answer to `AT`.
pub const AFFIRMATIVE: &str = "OK";

/// Which setting a confirmation line reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmTag {
    /// `OK+B<rate>`
    Baud,
    /// `OK+C<nnn>`
    Channel,
    /// `OK+RC<nnn>`
    ChannelReport,
    /// `OK+FU<n>`
    Mode,
    /// `OK+P<n>`
    Power,
    /// `OK+RP:<dBm>dBm`
    PowerReport,
    /// `OK+U<d><p><s>`
    Framing,
    /// `OK+DEFAULT`
    Defaults,
    /// `OK+SLEEP`
    Sleep,
}

/// Shape of a reply line, decided before any field is parsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyKind {
    Version,
    Confirm(ConfirmTag),
    Affirmative,
    Unrecognized,
}

/// A fully decoded reply line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reply {
    Ok,
    Defaults,
    Sleep,
    Baud(BaudRate),
    Channel(Channel),
    ChannelReport(Channel),
    Mode(TransmissionMode),
    Power(PowerLevel),
    /// Reported transmit power in dBm, not yet mapped to an index
    PowerReport(i16),
    Framing(SerialFraming),
    Version(FirmwareVersion),
}

impl Reply {
    /// Number of fields this line contributes to an exchange.
    pub fn field_count(&self) -> usize {
        match self {
            Reply::Ok | Reply::Defaults | Reply::Sleep => 0,
            Reply::Baud(_)
            | Reply::Channel(_)
            | Reply::ChannelReport(_)
            | Reply::Mode(_)
            | Reply::Power(_)
            | Reply::PowerReport(_) => 1,
            Reply::Version(_) => 2,
            Reply::Framing(_) => 3,
        }
    }
}

/// Classify a reply line. Banner wins over confirmation, confirmation over
/// the bare `OK`.
pub fn classify(line: &str) -> ReplyKind {
    let line = line.trim();
    if line.contains(BANNER_MARKER) {
        return ReplyKind::Version;
    }
    if let Some(body) = confirm_body(line) {
        return match confirm_tag(body) {
            Some(tag) => ReplyKind::Confirm(tag),
            None => ReplyKind::Unrecognized,
        };
    }
    if line == AFFIRMATIVE {
        ReplyKind::Affirmative
    } else {
        ReplyKind::Unrecognized
    }
}

/// Decode one reply line.
///
/// Returns `Err(Unrecognized)` when the line has no known shape and
/// `Err(BadReply)` when the shape is known but a field does not parse.
pub fn decode_line(line: &str) -> Hc12Result<Reply> {
    let line = line.trim();
    match classify(line) {
        ReplyKind::Version => parse_version(line),
        ReplyKind::Confirm(tag) => parse_confirm(tag, confirm_body(line).unwrap_or_default(), line),
        ReplyKind::Affirmative => Ok(Reply::Ok),
        ReplyKind::Unrecognized => Err(Hc12Error::Unrecognized(line.to_string())),
    }
}

/// Everything after the confirmation marker, if present.
fn confirm_body(line: &str) -> Option<&str> {
    line.find(CONFIRM_MARKER)
        .map(|pos| &line[pos + CONFIRM_MARKER.len()..])
}

fn confirm_tag(body: &str) -> Option<ConfirmTag> {
    let mut chars = body.chars();
    match chars.next()? {
        'B' => Some(ConfirmTag::Baud),
        'C' => Some(ConfirmTag::Channel),
        'P' => Some(ConfirmTag::Power),
        'U' => Some(ConfirmTag::Framing),
        'F' if body.starts_with("FU") => Some(ConfirmTag::Mode),
        'D' if body.starts_with("DEFAULT") => Some(ConfirmTag::Defaults),
        'S' if body.starts_with("SLEEP") => Some(ConfirmTag::Sleep),
        'R' => match chars.next()? {
            'C' => Some(ConfirmTag::ChannelReport),
            'P' => Some(ConfirmTag::PowerReport),
            _ => None,
        },
        _ => None,
    }
}

fn parse_confirm(tag: ConfirmTag, body: &str, line: &str) -> Hc12Result<Reply> {
    let bad = || Hc12Error::BadReply(line.to_string());
    match tag {
        ConfirmTag::Baud => {
            let bps: u32 = digits(&body[1..], line)?;
            BaudRate::try_from(bps).map(Reply::Baud).map_err(|_| bad())
        }
        ConfirmTag::Channel => {
            let channel: u16 = digits(&body[1..], line)?;
            Channel::new(channel).map(Reply::Channel).map_err(|_| bad())
        }
        ConfirmTag::ChannelReport => {
            let channel: u16 = digits(&body[2..], line)?;
            Channel::new(channel)
                .map(Reply::ChannelReport)
                .map_err(|_| bad())
        }
        ConfirmTag::Mode => {
            let mode: u8 = digits(&body[2..], line)?;
            TransmissionMode::try_from(mode)
                .map(Reply::Mode)
                .map_err(|_| bad())
        }
        ConfirmTag::Power => {
            let index: u8 = digits(&body[1..], line)?;
            PowerLevel::new(index).map(Reply::Power).map_err(|_| bad())
        }
        ConfirmTag::PowerReport => {
            // "RP:+20dBm" / "RP:-1dBm"
            let value = body[2..]
                .strip_prefix(':')
                .and_then(|v| v.strip_suffix("dBm"))
                .ok_or_else(bad)?;
            value
                .trim()
                .parse::<i16>()
                .map(Reply::PowerReport)
                .map_err(|_| bad())
        }
        ConfirmTag::Framing => parse_framing(&body[1..]).ok_or_else(bad),
        ConfirmTag::Defaults if body == "DEFAULT" => Ok(Reply::Defaults),
        ConfirmTag::Sleep if body == "SLEEP" => Ok(Reply::Sleep),
        ConfirmTag::Defaults | ConfirmTag::Sleep => Err(bad()),
    }
}

/// Parse `8O1` style framing.
fn parse_framing(field: &str) -> Option<Reply> {
    let mut chars = field.chars();
    let data_bits = chars.next()?.to_digit(10)?;
    let parity = chars.next()?;
    let stop_bits = chars.next()?;
    if chars.next().is_some() {
        return None;
    }
    Some(Reply::Framing(SerialFraming {
        data_bits: DataBits::try_from(data_bits as u8).ok()?,
        parity: Parity::try_from(parity).ok()?,
        stop_bits: StopBits::from_code(stop_bits)?,
    }))
}

/// Parse `HC-12_V2.4` → major 2, minor 4.
fn parse_version(line: &str) -> Hc12Result<Reply> {
    let bad = || Hc12Error::BadReply(line.to_string());
    let start = line.find(BANNER_MARKER).ok_or_else(bad)? + BANNER_MARKER.len();
    let (major, rest) = line[start..].split_once('.').ok_or_else(bad)?;
    let minor_len = rest
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(rest.len());
    Ok(Reply::Version(FirmwareVersion {
        major: digits(major, line)?,
        minor: digits(&rest[..minor_len], line)?,
    }))
}

/// Parse a run of ASCII digits. Signs and whitespace are not accepted.
fn digits<T: FromStr>(text: &str, line: &str) -> Hc12Result<T> {
    if text.is_empty() || !text.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Hc12Error::BadReply(line.to_string()));
    }
    text.parse()
        .map_err(|_| Hc12Error::BadReply(line.to_string()))
}
