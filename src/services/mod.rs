//! Services - business logic and state management
//!
//! This module contains the core counting logic:
//! - `resolver` - Two-sensor direction resolution state machine and its poll loop
//! - `calibration` - Guided TDT and baseline calibration procedures
//! - `delta_vote` - Single-sensor majority-vote fallback classifier

pub mod calibration;
pub mod delta_vote;
pub mod resolver;

// Re-export commonly used types
pub use calibration::{AutoReady, CalibrationEngine, PromptGate, ReadyGate};
pub use resolver::{DirectionResolver, ResolverState, TrafficMonitor};
