//! Serial port traits
//!
//! Split into two traits:
//! - `SerialFactory`: associated functions for listing and opening ports
//! - `SerialConnection`: instance methods for reading/writing data

use crate::domain::{Hc12Result, HostSerial, SerialPortInfo};

/// Factory for creating serial connections.
pub trait SerialFactory {
    /// List available serial ports on the system
    fn list_ports() -> Hc12Result<Vec<SerialPortInfo>>;

    /// Open the host port described by `settings`, returning a boxed connection
    fn open(settings: &HostSerial) -> Hc12Result<Box<dyn SerialConnection>>;
}

/// Trait for an open serial port connection.
/// Only requires `Send` (not `Sync`); a connection has a single owner.
pub trait SerialConnection: Send {
    /// Write bytes to the port, returning how many were accepted
    fn write(&mut self, data: &[u8]) -> Hc12Result<usize>;

    /// Read whatever is available into `buffer`.
    ///
    /// `Ok(0)` means nothing is available right now. A read that waited the
    /// port's full timeout without data returns `Err(Hc12Error::ReadTimeout)`.
    fn read(&mut self, buffer: &mut [u8]) -> Hc12Result<usize>;

    /// Close the connection
    fn close(&mut self) -> Hc12Result<()>;

    /// Check if the port is still connected
    fn is_connected(&self) -> bool;
}
