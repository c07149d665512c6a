//! Core domain types
//!
//! Pure types with no I/O dependencies: module settings, the configuration
//! shadow, driver profiles, and the crate error.

pub mod config;
pub mod error;
pub mod types;

pub use config::*;
pub use error::*;
pub use types::*;
