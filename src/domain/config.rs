//! Driver settings
//!
//! A `DriverConfig` is a saved profile for one HC-12 hookup: which host port
//! it hangs off, how patient the read loop is, and how long the module needs
//! to settle after the SET line changes.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::SerialFraming;

/// Timing and bounds for one AT exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Bytes requested per transport read
    pub read_chunk_size: usize,
    /// Wall-clock cap on reading one reply while fragments keep arriving
    pub reply_window_ms: u64,
    /// Pause between writing a request and the first read
    pub reply_delay_ms: u64,
    /// Minimum gap between two consecutive requests
    pub command_gap_ms: u64,
    /// Reads allowed when flushing stale bytes after a protocol error
    pub drain_max_reads: usize,
    /// Wall-clock cap on the same flush
    pub drain_window_ms: u64,
}

impl SessionConfig {
    pub fn reply_delay(&self) -> Duration {
        Duration::from_millis(self.reply_delay_ms)
    }

    pub fn reply_window(&self) -> Duration {
        Duration::from_millis(self.reply_window_ms)
    }

    pub fn command_gap(&self) -> Duration {
        Duration::from_millis(self.command_gap_ms)
    }

    pub fn drain_window(&self) -> Duration {
        Duration::from_millis(self.drain_window_ms)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            read_chunk_size: 64,
            reply_window_ms: 2000,
            reply_delay_ms: 100,
            command_gap_ms: 0,
            drain_max_reads: 16,
            drain_window_ms: 500,
        }
    }
}

/// Host side of the serial link.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostSerial {
    /// Device path, e.g. "/dev/ttyUSB0" or "COM3"
    pub device: String,
    pub baud_rate: u32,
    pub framing: SerialFraming,
    /// Per-read timeout of the host port
    pub read_timeout_ms: u64,
}

impl Default for HostSerial {
    fn default() -> Self {
        Self {
            device: "/dev/ttyUSB0".to_string(),
            baud_rate: 9600,
            framing: SerialFraming::default(),
            read_timeout_ms: 100,
        }
    }
}

/// A saved driver profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriverConfig {
    /// Profile name (e.g., "Default", "Balloon uplink")
    pub name: String,
    pub serial: HostSerial,
    pub session: SessionConfig,
    /// Wait after pulling SET low before the first AT command (datasheet: 40 ms)
    pub command_mode_settle_ms: u64,
    /// Wait after releasing SET before pass-through resumes (datasheet: 80 ms)
    pub transparent_settle_ms: u64,
    /// How long the supply stays cut during a power cycle
    pub power_off_ms: u64,
    /// Boot time after the supply comes back
    pub power_up_settle_ms: u64,
}

impl DriverConfig {
    pub fn command_mode_settle(&self) -> Duration {
        Duration::from_millis(self.command_mode_settle_ms)
    }

    pub fn transparent_settle(&self) -> Duration {
        Duration::from_millis(self.transparent_settle_ms)
    }

    pub fn power_off(&self) -> Duration {
        Duration::from_millis(self.power_off_ms)
    }

    pub fn power_up_settle(&self) -> Duration {
        Duration::from_millis(self.power_up_settle_ms)
    }
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            name: "Default".to_string(),
            serial: HostSerial::default(),
            session: SessionConfig::default(),
            command_mode_settle_ms: 40,
            transparent_settle_ms: 80,
            power_off_ms: 200,
            power_up_settle_ms: 100,
        }
    }
}
