//! Domain models - core traffic counting types
//!
//! This module contains the canonical data types used throughout the system:
//! - `TdtWindow` - the calibrated traffic distance threshold range
//! - `SensorBaseline` - per-sensor unobstructed range floor
//! - `TrafficEvent` - a resolved, timestamped crossing
//! - `TrafficCounts` - owned entry/exit aggregate
//! - `SensorError` / `SinkError` - error taxonomy

pub mod types;

pub use types::{
    EventKind, SensorBaseline, SensorError, SensorId, SinkError, TdtWindow, TrafficCounts,
    TrafficEvent,
};
