//! Adapters: implementations of the port traits plus profile persistence.

pub mod profile_store;
pub mod serial_port;
pub mod simulated;

pub use profile_store::ProfileStore;
pub use serial_port::{SerialPortConnection, SerialPortFactory};
pub use simulated::SimulatedHc12;
