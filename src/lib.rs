//! HC-12 radio driver
//!
//! Configures an HC-12 433 MHz serial transceiver over its AT command set:
//! validate, send, read the reply back in fragments, and keep a shadow of
//! the module configuration that only ever holds confirmed values.
//!
//! ## Architecture (Hexagonal / Ports & Adapters)
//!
//! - `domain/` - Pure domain types, settings and the crate error, no I/O
//! - `ports/` - Trait definitions for the transport and the SET/supply output lines
//! - `protocol/` - AT engine (catalog, power table, encode, decode,
//!   exchange state machine, session read loop)
//! - `adapters/` - Implementations of ports (serialport, simulated module)
//!   and JSON profile storage
//! - `radio` - `Hc12Radio`, the driver callers hold
//!
//! ```no_run
//! use hc12_radio::adapters::SerialPortFactory;
//! use hc12_radio::domain::DriverConfig;
//! use hc12_radio::ports::SerialFactory;
//! use hc12_radio::Hc12Radio;
//!
//! # fn main() -> hc12_radio::domain::Hc12Result<()> {
//! let settings = DriverConfig::default();
//! let serial = SerialPortFactory::open(&settings.serial)?;
//! let mut radio = Hc12Radio::new(settings);
//! radio.attach(serial);
//! radio.enter_command_mode()?;
//! radio.set_channel(21)?;
//! let all = radio.get_all()?;
//! println!("channel {} at {} dBm", all.channel, all.power.dbm());
//! # Ok(())
//! # }
//! ```

// Core domain (pure, no I/O)
pub mod domain;
pub mod ports;
pub mod protocol;

// Adapters (external I/O)
pub mod adapters;

// Driver facade
pub mod radio;

pub use radio::Hc12Radio;
