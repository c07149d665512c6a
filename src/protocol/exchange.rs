//! Outcome state machine for one in-flight AT command.
//!
//! `Idle → Requested → Active → Done | Failed | Unknown → Idle`
//!
//! Decoded fields are collected into a `ConfigUpdate` that only leaves the
//! exchange on `Done`, so a failed or half-answered command never touches
//! the configuration shadow. `Unknown` (unrecognized reply) and `Failed`
//! are sticky for the rest of the exchange.

use std::fmt::Debug;
use std::mem;

use crate::domain::{
    BaudRate, Channel, FirmwareVersion, Hc12Error, Hc12Result, ModuleConfiguration, PowerLevel,
    SerialFraming, TransmissionMode,
};

use super::{encode, AtCommand, Reply};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Idle,
    Requested,
    Active,
    Done,
    Failed,
    Unknown,
}

/// What the read loop should do after feeding a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// Keep reading, more fields are expected
    TryMore,
    /// All expected fields arrived
    Complete,
    /// The exchange failed; stop and resynchronise
    Abort,
}

/// Values confirmed by one exchange, applied to the shadow in one step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ConfigUpdate {
    pub baud: Option<BaudRate>,
    pub channel: Option<Channel>,
    pub power: Option<PowerLevel>,
    pub mode: Option<TransmissionMode>,
    pub framing: Option<SerialFraming>,
    pub firmware: Option<FirmwareVersion>,
    /// Module confirmed `AT+DEFAULT`
    pub restore_defaults: bool,
}

impl ConfigUpdate {
    /// Commit into `config`. Factory reset applies first, then any
    /// confirmed fields; the firmware version survives a reset.
    pub fn apply_to(&self, config: &mut ModuleConfiguration) {
        let mut next = *config;
        if self.restore_defaults {
            next = ModuleConfiguration {
                firmware: config.firmware,
                ..ModuleConfiguration::factory_default()
            };
        }
        if let Some(baud) = self.baud {
            next.baud = baud;
        }
        if let Some(channel) = self.channel {
            next.channel = channel;
        }
        if let Some(power) = self.power {
            next.power = power;
        }
        if let Some(mode) = self.mode {
            next.mode = mode;
        }
        if let Some(framing) = self.framing {
            next.framing = framing;
        }
        if let Some(firmware) = self.firmware {
            next.firmware = firmware;
        }
        *config = next;
    }
}

/// One command's lifecycle.
#[derive(Debug)]
pub struct Exchange {
    command: AtCommand,
    outcome: Outcome,
    fields: usize,
    update: ConfigUpdate,
    error: Option<Hc12Error>,
}

impl Exchange {
    pub fn new(command: AtCommand) -> Self {
        Self {
            command,
            outcome: Outcome::Idle,
            fields: 0,
            update: ConfigUpdate::default(),
            error: None,
        }
    }

    pub fn command(&self) -> AtCommand {
        self.command
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    /// Fields decoded so far in this exchange
    pub fn fields(&self) -> usize {
        self.fields
    }

    pub fn expected_fields(&self) -> usize {
        self.command.entry().reply_fields
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, Outcome::Failed | Outcome::Unknown)
    }

    /// Render the request; `Idle → Requested`.
    pub fn request(&mut self) -> String {
        self.outcome = Outcome::Requested;
        encode(&self.command)
    }

    /// The request went out; `Requested → Active`. Commands the module never
    /// answers are complete at this point.
    pub fn mark_written(&mut self) {
        self.outcome = if self.command.expects_reply() {
            Outcome::Active
        } else {
            Outcome::Done
        };
        log::debug!("{}: {:?}", self.command, self.outcome);
    }

    /// Record a transport failure.
    pub fn fail(&mut self, error: Hc12Error) {
        log::debug!("{}: failed: {error}", self.command);
        self.outcome = Outcome::Failed;
        self.error = Some(error);
    }

    /// Feed one decoded line.
    pub fn accept(&mut self, decoded: Hc12Result<Reply>) -> Progress {
        match self.outcome {
            Outcome::Failed | Outcome::Unknown => return Progress::Abort,
            Outcome::Done => return Progress::Complete,
            Outcome::Idle | Outcome::Requested | Outcome::Active => {}
        }

        let reply = match decoded {
            Ok(reply) => reply,
            Err(e @ Hc12Error::Unrecognized(_)) => {
                log::warn!("{}: {e}", self.command);
                self.outcome = Outcome::Unknown;
                self.error = Some(e);
                return Progress::Abort;
            }
            Err(e) => {
                log::warn!("{}: {e}", self.command);
                self.fail(e);
                return Progress::Abort;
            }
        };

        match self.absorb(reply) {
            Ok(added) => {
                self.fields += added;
                if self.fields >= self.expected_fields() {
                    self.outcome = Outcome::Done;
                    log::debug!("{}: Done ({} field(s))", self.command, self.fields);
                    Progress::Complete
                } else {
                    Progress::TryMore
                }
            }
            Err(e) => {
                log::warn!("{}: {e}", self.command);
                self.fail(e);
                Progress::Abort
            }
        }
    }

    /// Called when the transport went quiet. An exchange still waiting for
    /// fields fails here.
    pub fn conclude(&mut self) {
        if matches!(
            self.outcome,
            Outcome::Idle | Outcome::Requested | Outcome::Active
        ) {
            let error = if self.fields == 0 {
                Hc12Error::ReadTimeout
            } else {
                Hc12Error::FieldCount {
                    command: self.command.to_string(),
                    expected: self.expected_fields(),
                    decoded: self.fields,
                }
            };
            self.fail(error);
        }
    }

    /// Hand the result to the caller and return to `Idle`.
    pub fn finish(&mut self) -> Hc12Result<ConfigUpdate> {
        self.conclude();
        let result = match self.outcome {
            Outcome::Done => Ok(mem::take(&mut self.update)),
            _ => Err(self.error.take().unwrap_or_else(|| Hc12Error::FieldCount {
                command: self.command.to_string(),
                expected: self.expected_fields(),
                decoded: self.fields,
            })),
        };
        self.outcome = Outcome::Idle;
        self.fields = 0;
        self.update = ConfigUpdate::default();
        result
    }

    /// Match a reply against the pending command. Returns how many new
    /// fields it contributed.
    fn absorb(&mut self, reply: Reply) -> Hc12Result<usize> {
        use AtCommand as C;
        let fields = reply.field_count();
        match (self.command, reply) {
            (C::Test, Reply::Ok) | (C::Sleep, Reply::Sleep) => Ok(fields),
            (C::RestoreDefaults, Reply::Defaults) => {
                self.update.restore_defaults = true;
                Ok(fields)
            }

            (C::SetBaud(requested), Reply::Baud(confirmed)) => {
                self.confirm(requested, confirmed)?;
                self.update.baud = Some(confirmed);
                Ok(fields)
            }
            (C::SetChannel(requested), Reply::Channel(confirmed)) => {
                self.confirm(requested, confirmed)?;
                self.update.channel = Some(confirmed);
                Ok(fields)
            }
            (C::SetTransmissionMode(requested), Reply::Mode(confirmed)) => {
                self.confirm(requested, confirmed)?;
                self.update.mode = Some(confirmed);
                Ok(fields)
            }
            (C::SetPower(requested), Reply::Power(confirmed)) => {
                self.confirm(requested, confirmed)?;
                self.update.power = Some(confirmed);
                Ok(fields)
            }
            (C::SetSerialFraming(requested), Reply::Framing(confirmed)) => {
                self.confirm(requested, confirmed)?;
                self.update.framing = Some(confirmed);
                Ok(fields)
            }

            (C::GetBaud, Reply::Baud(baud)) => {
                self.update.baud = Some(baud);
                Ok(fields)
            }
            (C::GetChannel, Reply::ChannelReport(channel) | Reply::Channel(channel)) => {
                self.update.channel = Some(channel);
                Ok(fields)
            }
            (C::GetTransmissionMode, Reply::Mode(mode)) => {
                self.update.mode = Some(mode);
                Ok(fields)
            }
            (C::GetPower, Reply::PowerReport(dbm)) => {
                self.update.power = Some(PowerLevel::from_dbm(dbm)?);
                Ok(fields)
            }
            (C::GetVersion, Reply::Version(version)) => {
                self.update.firmware = Some(version);
                Ok(fields)
            }

            // Read-all: four lines, any order; a repeated line overwrites
            // but does not count twice.
            (C::GetAll, Reply::Baud(baud)) => Ok(record(&mut self.update.baud, baud)),
            (C::GetAll, Reply::ChannelReport(channel) | Reply::Channel(channel)) => {
                Ok(record(&mut self.update.channel, channel))
            }
            (C::GetAll, Reply::PowerReport(dbm)) => {
                let power = PowerLevel::from_dbm(dbm)?;
                Ok(record(&mut self.update.power, power))
            }
            (C::GetAll, Reply::Mode(mode)) => Ok(record(&mut self.update.mode, mode)),

            (command, reply) => Err(Hc12Error::UnexpectedReply {
                command: command.to_string(),
                reply: format!("{reply:?}"),
            }),
        }
    }

    fn confirm<T: PartialEq + Debug>(&self, requested: T, confirmed: T) -> Hc12Result<()> {
        if requested == confirmed {
            Ok(())
        } else {
            Err(Hc12Error::Mismatch {
                command: self.command.to_string(),
                requested: format!("{requested:?}"),
                confirmed: format!("{confirmed:?}"),
            })
        }
    }
}

fn record<T>(slot: &mut Option<T>, value: T) -> usize {
    let added = usize::from(slot.is_none());
    *slot = Some(value);
    added
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::decode_line;

    fn active(command: AtCommand) -> Exchange {
        let mut exchange = Exchange::new(command);
        exchange.request();
        exchange.mark_written();
        exchange
    }

    #[test]
    fn lifecycle_to_done() {
        let mut exchange = Exchange::new(AtCommand::Test);
        assert_eq!(exchange.outcome(), Outcome::Idle);
        assert_eq!(exchange.request(), "AT\n");
        assert_eq!(exchange.outcome(), Outcome::Requested);
        exchange.mark_written();
        assert_eq!(exchange.outcome(), Outcome::Active);
        assert_eq!(exchange.accept(decode_line("OK")), Progress::Complete);
        assert_eq!(exchange.outcome(), Outcome::Done);
        assert!(exchange.finish().is_ok());
        assert_eq!(exchange.outcome(), Outcome::Idle);
    }

    #[test]
    fn set_baud_confirmed() {
        let mut exchange = active(AtCommand::set_baud(19_200).unwrap());
        assert_eq!(
            exchange.accept(decode_line("OK+B19200")),
            Progress::Complete
        );
        let update = exchange.finish().unwrap();
        assert_eq!(update.baud, Some(BaudRate::B19200));
    }

    #[test]
    fn set_baud_echo_differs_is_mismatch() {
        let mut exchange = active(AtCommand::set_baud(9_600).unwrap());
        assert_eq!(exchange.accept(decode_line("OK+B19200")), Progress::Abort);
        assert_eq!(exchange.outcome(), Outcome::Failed);
        assert!(matches!(exchange.finish(), Err(Hc12Error::Mismatch { .. })));
    }

    #[test]
    fn unrecognized_is_sticky() {
        let mut exchange = active(AtCommand::GetAll);
        assert_eq!(exchange.accept(decode_line("OK+B9600")), Progress::TryMore);
        assert_eq!(exchange.accept(decode_line("garbage")), Progress::Abort);
        assert_eq!(exchange.outcome(), Outcome::Unknown);
        // later good lines do not revive it
        assert_eq!(exchange.accept(decode_line("OK+RC001")), Progress::Abort);
        assert_eq!(
            exchange.accept(decode_line("OK+RP:+20dBm")),
            Progress::Abort
        );
        assert_eq!(exchange.accept(decode_line("OK+FU3")), Progress::Abort);
        assert!(matches!(exchange.finish(), Err(Hc12Error::Unrecognized(_))));
    }

    #[test]
    fn get_all_accumulates_four_fields() {
        let mut exchange = active(AtCommand::GetAll);
        assert_eq!(exchange.accept(decode_line("OK+B9600")), Progress::TryMore);
        assert_eq!(exchange.accept(decode_line("OK+RC001")), Progress::TryMore);
        // a repeated line does not advance the count
        assert_eq!(exchange.accept(decode_line("OK+RC001")), Progress::TryMore);
        assert_eq!(
            exchange.accept(decode_line("OK+RP:20dBm")),
            Progress::TryMore
        );
        assert_eq!(exchange.fields(), 3);
        assert_eq!(exchange.accept(decode_line("OK+FU3")), Progress::Complete);
        let update = exchange.finish().unwrap();
        assert_eq!(update.baud, Some(BaudRate::B9600));
        assert_eq!(update.channel, Some(Channel::new(1).unwrap()));
        assert_eq!(update.power, Some(PowerLevel::new(8).unwrap()));
        assert_eq!(update.mode, Some(TransmissionMode::Fu3));
    }

    #[test]
    fn get_all_cut_short_is_field_count_error() {
        let mut exchange = active(AtCommand::GetAll);
        exchange.accept(decode_line("OK+B9600"));
        exchange.accept(decode_line("OK+RC001"));
        match exchange.finish() {
            Err(Hc12Error::FieldCount {
                expected, decoded, ..
            }) => {
                assert_eq!(expected, 4);
                assert_eq!(decoded, 2);
            }
            other => panic!("expected FieldCount, got {other:?}"),
        }
    }

    #[test]
    fn silence_is_timeout() {
        let mut exchange = active(AtCommand::GetBaud);
        assert!(matches!(exchange.finish(), Err(Hc12Error::ReadTimeout)));
    }

    #[test]
    fn version_banner_only_completes_version_query() {
        let mut exchange = active(AtCommand::GetVersion);
        assert_eq!(
            exchange.accept(decode_line("HC-12_V2.4")),
            Progress::Complete
        );
        assert_eq!(
            exchange.finish().unwrap().firmware,
            Some(FirmwareVersion { major: 2, minor: 4 })
        );

        let mut exchange = active(AtCommand::GetBaud);
        assert_eq!(exchange.accept(decode_line("HC-12_V2.4")), Progress::Abort);
        assert!(matches!(
            exchange.finish(),
            Err(Hc12Error::UnexpectedReply { .. })
        ));
    }

    #[test]
    fn get_power_maps_dbm_through_table() {
        let mut exchange = active(AtCommand::GetPower);
        exchange.accept(decode_line("OK+RP:+11dBm"));
        assert_eq!(
            exchange.finish().unwrap().power,
            Some(PowerLevel::new(5).unwrap())
        );

        let mut exchange = active(AtCommand::GetPower);
        assert_eq!(
            exchange.accept(decode_line("OK+RP:+12dBm")),
            Progress::Abort
        );
        assert!(matches!(exchange.finish(), Err(Hc12Error::UnknownDbm(12))));
    }

    #[test]
    fn malformed_confirmation_fails() {
        let mut exchange = active(AtCommand::GetBaud);
        assert_eq!(exchange.accept(decode_line("OK+B96x0")), Progress::Abort);
        assert_eq!(exchange.outcome(), Outcome::Failed);
        assert!(matches!(exchange.finish(), Err(Hc12Error::BadReply(_))));
    }

    #[test]
    fn firmware_update_done_on_write() {
        let mut exchange = active(AtCommand::FirmwareUpdate);
        assert_eq!(exchange.outcome(), Outcome::Done);
        assert_eq!(exchange.finish().unwrap(), ConfigUpdate::default());
    }

    #[test]
    fn apply_restore_defaults_keeps_firmware() {
        let mut config = ModuleConfiguration::factory_default();
        config.channel = Channel::new(42).unwrap();
        config.firmware = FirmwareVersion { major: 2, minor: 4 };
        let update = ConfigUpdate {
            restore_defaults: true,
            ..ConfigUpdate::default()
        };
        update.apply_to(&mut config);
        assert_eq!(config.channel.number(), 1);
        assert_eq!(config.firmware, FirmwareVersion { major: 2, minor: 4 });
    }
}
