//! IO modules - external system interfaces
//!
//! This module contains all external IO operations:
//! - `sensor` - `RangeSource` trait plus the scripted source used by tests and the simulator
//! - `vl53l0x` - Thin I2C adapter for the VL53L0X ToF sensor (behind the `hardware` feature)
//! - `traffic_log` - Daily CSV traffic log (`EventSink` implementation)

pub mod sensor;
pub mod traffic_log;
#[cfg(feature = "hardware")]
pub mod vl53l0x;

// Re-export commonly used types
pub use sensor::{RangeSource, ScriptedRange};
pub use traffic_log::{CsvTrafficLog, EventSink};
#[cfg(feature = "hardware")]
pub use vl53l0x::Vl53l0xRange;
