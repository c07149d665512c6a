//! HC-12 driver facade
//!
//! `Hc12Radio` ties the AT engine to the injected capabilities, a serial
//! transport plus optional SET and supply lines, and keeps the configuration
//! shadow. The shadow only ever holds values the module confirmed: every
//! operation either commits its whole `ConfigUpdate` or nothing.
//!
//! Operations take `&mut self`, so one driver never has two exchanges in
//! flight. Share it across threads behind a `Mutex`.

use crate::domain::{
    BaudRate, Channel, DriverConfig, FirmwareVersion, Hc12Error, Hc12Result, ModuleConfiguration,
    OperatingMode, PowerLevel, SerialFraming, TransmissionMode,
};
use crate::ports::{OutputLine, SerialConnection};
use crate::protocol::{AtCommand, AtSession};

pub struct Hc12Radio {
    session: Option<AtSession>,
    mode_line: Option<Box<dyn OutputLine>>,
    power_line: Option<Box<dyn OutputLine>>,
    mode: OperatingMode,
    config: ModuleConfiguration,
    settings: DriverConfig,
}

impl Hc12Radio {
    /// A driver with factory-default shadow, no transport and no output lines.
    pub fn new(settings: DriverConfig) -> Self {
        Self {
            session: None,
            mode_line: None,
            power_line: None,
            mode: OperatingMode::Transparent,
            config: ModuleConfiguration::factory_default(),
            settings,
        }
    }

    /// Drive the SET pin through `line` instead of tracking mode in software only.
    pub fn with_mode_line(mut self, line: Box<dyn OutputLine>) -> Self {
        self.mode_line = Some(line);
        self
    }

    /// Switch the module's supply through `line`, enabling `power_cycle`.
    pub fn with_power_line(mut self, line: Box<dyn OutputLine>) -> Self {
        self.power_line = Some(line);
        self
    }

    pub fn settings(&self) -> &DriverConfig {
        &self.settings
    }

    /// Bind a transport. A previously bound one is dropped.
    pub fn attach(&mut self, serial: Box<dyn SerialConnection>) {
        if self.session.is_some() {
            log::debug!("replacing bound transport");
        }
        self.session = Some(AtSession::new(serial, self.settings.session.clone()));
    }

    /// Close and release the bound transport, if any.
    pub fn detach(&mut self) -> Hc12Result<Option<Box<dyn SerialConnection>>> {
        match self.session.take() {
            Some(session) => session.close().map(Some),
            None => Ok(None),
        }
    }

    pub fn is_attached(&self) -> bool {
        self.session.as_ref().is_some_and(AtSession::is_connected)
    }

    pub fn operating_mode(&self) -> OperatingMode {
        self.mode
    }

    /// Snapshot of the confirmed module configuration.
    pub fn config(&self) -> ModuleConfiguration {
        self.config
    }

    /// Pull SET low and wait for the module to accept AT commands.
    pub fn enter_command_mode(&mut self) -> Hc12Result<()> {
        if let Some(line) = self.mode_line.as_mut() {
            line.set_low()?;
            log::debug!(
                "SET low, settling {:?}",
                self.settings.command_mode_settle()
            );
            std::thread::sleep(self.settings.command_mode_settle());
        }
        self.mode = OperatingMode::Command;
        Ok(())
    }

    /// Release SET and return to transparent pass-through.
    pub fn leave_command_mode(&mut self) -> Hc12Result<()> {
        if let Some(line) = self.mode_line.as_mut() {
            line.set_high()?;
            log::debug!(
                "SET high, settling {:?}",
                self.settings.transparent_settle()
            );
            std::thread::sleep(self.settings.transparent_settle());
        }
        self.mode = OperatingMode::Transparent;
        Ok(())
    }

    /// Power the module up. SET is released first so it boots transparent.
    pub fn power_on(&mut self) -> Hc12Result<()> {
        let line = self.power_line.as_mut().ok_or(Hc12Error::NoPowerLine)?;
        if let Some(set) = self.mode_line.as_mut() {
            set.set_high()?;
        }
        line.set_high()?;
        log::debug!("supply on, settling {:?}", self.settings.power_up_settle());
        std::thread::sleep(self.settings.power_up_settle());
        self.mode = OperatingMode::Transparent;
        Ok(())
    }

    pub fn power_off(&mut self) -> Hc12Result<()> {
        let line = self.power_line.as_mut().ok_or(Hc12Error::NoPowerLine)?;
        line.set_low()?;
        log::debug!("supply off");
        Ok(())
    }

    /// Cut and restore the supply. This is the only way out of
    /// `OperatingMode::FirmwareUpdate`; saved settings survive it.
    pub fn power_cycle(&mut self) -> Hc12Result<()> {
        self.power_off()?;
        std::thread::sleep(self.settings.power_off());
        self.power_on()
    }

    // --- Device operations ---

    /// `AT`: liveness check.
    pub fn test(&mut self) -> Hc12Result<()> {
        self.run(AtCommand::Test)
    }

    /// `AT+DEFAULT`: factory reset. The shadow resets once the module confirms.
    pub fn restore_defaults(&mut self) -> Hc12Result<()> {
        self.run(AtCommand::RestoreDefaults)
    }

    pub fn sleep(&mut self) -> Hc12Result<()> {
        self.run(AtCommand::Sleep)
    }

    /// `AT+UPDATE`: the module goes silent and waits for new firmware. AT
    /// traffic is refused until command mode is entered again.
    pub fn firmware_update_mode(&mut self) -> Hc12Result<()> {
        self.run(AtCommand::FirmwareUpdate)?;
        self.mode = OperatingMode::FirmwareUpdate;
        log::info!("module is waiting for a firmware image");
        Ok(())
    }

    pub fn set_baud(&mut self, bps: u32) -> Hc12Result<()> {
        self.run(AtCommand::set_baud(bps)?)
    }

    pub fn set_channel(&mut self, channel: u16) -> Hc12Result<()> {
        self.run(AtCommand::set_channel(channel)?)
    }

    pub fn set_transmission_mode(&mut self, mode: u8) -> Hc12Result<()> {
        self.run(AtCommand::set_transmission_mode(mode)?)
    }

    pub fn set_power(&mut self, index: u8) -> Hc12Result<()> {
        self.run(AtCommand::set_power(index)?)
    }

    /// Set power by dBm; only the eight table values are accepted.
    pub fn set_power_dbm(&mut self, dbm: i16) -> Hc12Result<()> {
        self.run(AtCommand::set_power_dbm(dbm)?)
    }

    pub fn set_serial_framing(
        &mut self,
        data_bits: u8,
        parity: char,
        stop_bits: f32,
    ) -> Hc12Result<()> {
        self.run(AtCommand::set_serial_framing(data_bits, parity, stop_bits)?)
    }

    pub fn get_baud(&mut self) -> Hc12Result<BaudRate> {
        self.run(AtCommand::GetBaud)?;
        Ok(self.config.baud)
    }

    pub fn get_channel(&mut self) -> Hc12Result<Channel> {
        self.run(AtCommand::GetChannel)?;
        Ok(self.config.channel)
    }

    pub fn get_transmission_mode(&mut self) -> Hc12Result<TransmissionMode> {
        self.run(AtCommand::GetTransmissionMode)?;
        Ok(self.config.mode)
    }

    pub fn get_power(&mut self) -> Hc12Result<PowerLevel> {
        self.run(AtCommand::GetPower)?;
        Ok(self.config.power)
    }

    /// `AT+RX`: baud, channel, power and mode in one exchange, committed together.
    pub fn get_all(&mut self) -> Hc12Result<ModuleConfiguration> {
        self.run(AtCommand::GetAll)?;
        Ok(self.config)
    }

    pub fn get_version(&mut self) -> Hc12Result<FirmwareVersion> {
        self.run(AtCommand::GetVersion)?;
        Ok(self.config.firmware)
    }

    // --- Local queries (no I/O) ---

    pub fn serial_framing(&self) -> SerialFraming {
        self.config.framing
    }

    pub fn channel_frequency_khz(&self) -> u32 {
        self.config.channel.frequency_khz()
    }

    pub fn power_dbm(&self) -> i8 {
        self.config.power.dbm()
    }

    /// Mode check, transport check, exchange, commit.
    fn run(&mut self, cmd: AtCommand) -> Hc12Result<()> {
        if self.mode != OperatingMode::Command {
            return Err(Hc12Error::NotInCommandMode(self.mode));
        }
        let session = self.session.as_mut().ok_or(Hc12Error::NotConnected)?;
        let update = session.execute(&cmd)?;
        update.apply_to(&mut self.config);
        log::debug!("{cmd} committed");
        Ok(())
    }
}

impl Default for Hc12Radio {
    fn default() -> Self {
        Self::new(DriverConfig::default())
    }
}
