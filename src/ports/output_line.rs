//! Discrete output line port (the module's SET pin, its supply switch)

use crate::domain::Hc12Result;

/// A single digital output.
///
/// As SET: the HC-12 enters command mode while the line is low and returns
/// to transparent mode once it is released high. As the supply switch: high
/// powers the module, low cuts it.
pub trait OutputLine: Send {
    fn set_high(&mut self) -> Hc12Result<()>;

    fn set_low(&mut self) -> Hc12Result<()>;
}
