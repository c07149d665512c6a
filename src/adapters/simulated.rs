//! In-memory HC-12 for development and testing without hardware.
//!
//! `SimulatedHc12` is the module side of the AT protocol behind a
//! `SerialConnection`: requests written to it are parsed as they complete,
//! replies queue up as `\r\n` terminated lines and are handed out in
//! fragments of a configurable size.
//!
//! Every request is logged at INFO level so you can see exactly what a real
//! module would have received:
//!
//!   RUST_LOG=hc12_radio=info cargo test --test at_integration

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use crate::domain::{
    BaudRate, Channel, FirmwareVersion, Hc12Error, Hc12Result, ModuleConfiguration, PowerLevel,
    SerialFraming, TransmissionMode,
};
use crate::ports::SerialConnection;

/// Vendor prefix some firmware prints before the version banner
const BANNER_PREFIX: &str = "www.hc01.com  ";

/// Firmware the simulated module reports
const FIRMWARE: FirmwareVersion = FirmwareVersion { major: 2, minor: 4 };

/// Reply to any request the module cannot act on
const ERROR_REPLY: &str = "ERROR";

pub struct SimulatedHc12 {
    config: ModuleConfiguration,
    pending: Vec<u8>,
    outbox: VecDeque<u8>,
    fragment_size: usize,
    echo: bool,
    updating: bool,
    connected: bool,
    requests: Arc<Mutex<Vec<String>>>,
}

impl SimulatedHc12 {
    pub fn new() -> Self {
        let config = ModuleConfiguration {
            firmware: FIRMWARE,
            ..ModuleConfiguration::factory_default()
        };
        log::info!("[SIM HC-12] Initialized: {}", describe(&config));
        Self {
            config,
            pending: Vec::new(),
            outbox: VecDeque::new(),
            fragment_size: usize::MAX,
            echo: false,
            updating: false,
            connected: true,
            requests: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Hand out at most `size` bytes per read.
    pub fn with_fragment_size(mut self, size: usize) -> Self {
        self.fragment_size = size.max(1);
        self
    }

    /// Loop every request line back before its reply.
    pub fn with_echo(mut self) -> Self {
        self.echo = true;
        self
    }

    /// Start from a configuration other than factory defaults.
    pub fn with_config(mut self, config: ModuleConfiguration) -> Self {
        self.config = config;
        self
    }

    /// Shared handle to every request line received, newest last.
    pub fn request_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.requests)
    }

    /// The module's actual settings.
    pub fn config(&self) -> ModuleConfiguration {
        self.config
    }

    /// Queue unsolicited bytes, e.g. line noise or a late reply.
    pub fn inject(&mut self, bytes: &[u8]) {
        self.outbox.extend(bytes);
    }

    fn queue_line(&mut self, line: &str) {
        self.outbox.extend(line.as_bytes());
        self.outbox.extend(b"\r\n");
    }

    fn handle(&mut self, request: &str) {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.to_string());
        }
        if self.updating {
            log::info!("[SIM HC-12] {request} → (updating, ignored)");
            return;
        }
        if self.echo {
            self.queue_line(request);
        }
        let replies = self.respond(request);
        log::info!("[SIM HC-12] {request} → {}", replies.join(" | "));
        for reply in &replies {
            self.queue_line(reply);
        }
    }

    fn respond(&mut self, request: &str) -> Vec<String> {
        let Some(body) = request.strip_prefix("AT") else {
            return Vec::new();
        };
        let config = self.config;
        match body {
            "" => vec!["OK".to_string()],
            "+DEFAULT" => {
                self.config = ModuleConfiguration {
                    firmware: config.firmware,
                    ..ModuleConfiguration::factory_default()
                };
                vec!["OK+DEFAULT".to_string()]
            }
            "+SLEEP" => vec!["OK+SLEEP".to_string()],
            "+UPDATE" => {
                self.updating = true;
                Vec::new()
            }
            "+RB" => vec![format!("OK+B{}", config.baud.bps())],
            "+RC" => vec![format!("OK+RC{:03}", config.channel.number())],
            "+RF" => vec![format!("OK+FU{}", config.mode.number())],
            "+RP" => vec![power_report(config.power)],
            "+RX" => vec![
                format!("OK+B{}", config.baud.bps()),
                format!("OK+RC{:03}", config.channel.number()),
                power_report(config.power),
                format!("OK+FU{}", config.mode.number()),
            ],
            "+V" => vec![format!("{BANNER_PREFIX}HC-12_{}", config.firmware)],
            setting => vec![self
                .apply_setting(setting)
                .unwrap_or_else(|| ERROR_REPLY.to_string())],
        }
    }

    /// Apply a `+B`, `+C`, `+FU`, `+P` or `+U` request; `None` if it is
    /// malformed or out of range.
    fn apply_setting(&mut self, body: &str) -> Option<String> {
        if let Some(arg) = body.strip_prefix("+FU") {
            let mode = TransmissionMode::try_from(arg.parse::<u8>().ok()?).ok()?;
            self.config.mode = mode;
            Some(format!("OK+FU{}", mode.number()))
        } else if let Some(arg) = body.strip_prefix("+B") {
            let baud = BaudRate::try_from(arg.parse::<u32>().ok()?).ok()?;
            self.config.baud = baud;
            Some(format!("OK+B{}", baud.bps()))
        } else if let Some(arg) = body.strip_prefix("+C") {
            let channel = Channel::new(arg.parse::<u16>().ok()?).ok()?;
            self.config.channel = channel;
            Some(format!("OK+C{:03}", channel.number()))
        } else if let Some(arg) = body.strip_prefix("+P") {
            let power = PowerLevel::new(arg.parse::<u8>().ok()?).ok()?;
            self.config.power = power;
            Some(format!("OK+P{}", power.index()))
        } else if let Some(arg) = body.strip_prefix("+U") {
            let framing = parse_framing(arg)?;
            self.config.framing = framing;
            Some(format!("OK+U{framing}"))
        } else {
            None
        }
    }
}

impl Default for SimulatedHc12 {
    fn default() -> Self {
        Self::new()
    }
}

impl SerialConnection for SimulatedHc12 {
    fn write(&mut self, data: &[u8]) -> Hc12Result<usize> {
        if !self.connected {
            return Err(Hc12Error::NotConnected);
        }
        self.pending.extend_from_slice(data);
        while let Some(end) = self.pending.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=end).collect();
            let request = String::from_utf8_lossy(&line).trim().to_string();
            if !request.is_empty() {
                self.handle(&request);
            }
        }
        Ok(data.len())
    }

    fn read(&mut self, buffer: &mut [u8]) -> Hc12Result<usize> {
        if !self.connected {
            return Err(Hc12Error::NotConnected);
        }
        if self.outbox.is_empty() {
            return Err(Hc12Error::ReadTimeout);
        }
        let n = self.outbox.len().min(buffer.len()).min(self.fragment_size);
        for (slot, byte) in buffer.iter_mut().zip(self.outbox.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    fn close(&mut self) -> Hc12Result<()> {
        self.connected = false;
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}

fn power_report(power: PowerLevel) -> String {
    format!("OK+RP:{:+}dBm", power.dbm())
}

/// `8N1` style argument; stop bit code '3' means 1.5.
fn parse_framing(arg: &str) -> Option<SerialFraming> {
    let mut chars = arg.chars();
    let data_bits = u8::try_from(chars.next()?.to_digit(10)?).ok()?;
    let parity = chars.next()?;
    let stop_bits = match chars.next()? {
        '1' => 1.0,
        '2' => 2.0,
        '3' => 1.5,
        _ => return None,
    };
    if chars.next().is_some() {
        return None;
    }
    SerialFraming::new(data_bits, parity, stop_bits).ok()
}

fn describe(config: &ModuleConfiguration) -> String {
    format!(
        "{} bps, CH{}, {} dBm, {}, {}, {}",
        config.baud,
        config.channel,
        config.power.dbm(),
        config.mode,
        config.framing,
        config.firmware
    )
}
