//! Port traits (interfaces)
//!
//! These traits define the boundaries between the protocol engine and
//! external I/O. Adapters implement these traits to connect to real hardware.

pub mod output_line;
pub mod serial;

pub use output_line::*;
pub use serial::*;
