//! Transmit power table: index 1–8 ↔ dBm ↔ mW.
//!
//! Every 6 dB drop roughly halves the usable range. Values not in the table
//! are rejected, never rounded to a neighbouring level.

use crate::domain::{Hc12Error, Hc12Result, PowerLevel};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PowerLevelEntry {
    pub index: u8,
    pub dbm: i8,
    pub milliwatts: f32,
}

pub const POWER_TABLE: [PowerLevelEntry; 8] = [
    PowerLevelEntry {
        index: 1,
        dbm: -1,
        milliwatts: 0.8,
    },
    PowerLevelEntry {
        index: 2,
        dbm: 2,
        milliwatts: 1.6,
    },
    PowerLevelEntry {
        index: 3,
        dbm: 5,
        milliwatts: 3.2,
    },
    PowerLevelEntry {
        index: 4,
        dbm: 8,
        milliwatts: 6.3,
    },
    PowerLevelEntry {
        index: 5,
        dbm: 11,
        milliwatts: 12.0,
    },
    PowerLevelEntry {
        index: 6,
        dbm: 14,
        milliwatts: 25.0,
    },
    PowerLevelEntry {
        index: 7,
        dbm: 17,
        milliwatts: 50.0,
    },
    PowerLevelEntry {
        index: 8,
        dbm: 20,
        milliwatts: 100.0,
    },
];

/// Look up the table entry for a power index.
pub fn entry(index: u8) -> Hc12Result<&'static PowerLevelEntry> {
    POWER_TABLE
        .get(usize::from(index).wrapping_sub(1))
        .ok_or(Hc12Error::InvalidPower(index))
}

pub fn index_to_dbm(index: u8) -> Hc12Result<i8> {
    entry(index).map(|e| e.dbm)
}

pub fn dbm_to_index(dbm: i16) -> Hc12Result<u8> {
    POWER_TABLE
        .iter()
        .find(|e| i16::from(e.dbm) == dbm)
        .map(|e| e.index)
        .ok_or(Hc12Error::UnknownDbm(dbm))
}

impl PowerLevel {
    pub fn dbm(self) -> i8 {
        POWER_TABLE[usize::from(self.index() - 1)].dbm
    }

    pub fn milliwatts(self) -> f32 {
        POWER_TABLE[usize::from(self.index() - 1)].milliwatts
    }

    pub fn from_dbm(dbm: i16) -> Hc12Result<Self> {
        PowerLevel::new(dbm_to_index(dbm)?)
    }
}
