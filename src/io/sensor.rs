//! Range source abstraction over a single time-of-flight sensor
//!
//! The resolver and calibration engine only ever see this trait; the physical
//! VL53L0X adapter lives in `vl53l0x` behind the `hardware` feature, and the
//! scripted source here drives tests and the simulator.

use crate::domain::{SensorError, SensorId};
use async_trait::async_trait;
use std::collections::VecDeque;

/// Distance the VL53L0X reports when nothing is in range (its ceiling).
/// Also used as the scripted source's idle reading unless overridden.
pub const RANGE_CEILING_MM: u16 = 8190;

/// One time-of-flight sensor. A read is a bounded, short I/O call with no
/// side effects beyond the physical measurement.
#[async_trait]
pub trait RangeSource: Send {
    /// Which doorway position this sensor occupies
    fn id(&self) -> SensorId;

    /// Take one instantaneous distance sample, in millimeters
    async fn read_range(&mut self) -> Result<u16, SensorError>;
}

/// Deterministic range source backed by a tape of scripted readings.
///
/// `None` entries simulate a failed read. Once the tape runs out the source
/// keeps returning its idle distance, like an unobstructed sensor would.
pub struct ScriptedRange {
    sensor: SensorId,
    tape: VecDeque<Option<u16>>,
    idle_mm: u16,
}

impl ScriptedRange {
    pub fn new(sensor: SensorId) -> Self {
        Self { sensor, tape: VecDeque::new(), idle_mm: RANGE_CEILING_MM }
    }

    /// Replace the idle distance returned after the tape is exhausted
    pub fn with_idle(mut self, idle_mm: u16) -> Self {
        self.idle_mm = idle_mm;
        self
    }

    /// Append good readings to the tape
    pub fn with_readings(mut self, readings: &[u16]) -> Self {
        self.tape.extend(readings.iter().copied().map(Some));
        self
    }

    /// Append a failed read to the tape
    pub fn with_failure(mut self) -> Self {
        self.tape.push_back(None);
        self
    }

    /// Readings still queued on the tape
    pub fn remaining(&self) -> usize {
        self.tape.len()
    }
}

#[async_trait]
impl RangeSource for ScriptedRange {
    fn id(&self) -> SensorId {
        self.sensor
    }

    async fn read_range(&mut self) -> Result<u16, SensorError> {
        match self.tape.pop_front() {
            Some(Some(distance)) => Ok(distance),
            Some(None) => Err(SensorError::Bus {
                sensor: self.sensor,
                message: "scripted read failure".to_string(),
            }),
            None => Ok(self.idle_mm),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_scripted_tape_then_idle() {
        let mut source =
            ScriptedRange::new(SensorId::Entry).with_readings(&[150, 160]).with_idle(8000);

        assert_eq!(source.read_range().await.unwrap(), 150);
        assert_eq!(source.read_range().await.unwrap(), 160);
        assert_eq!(source.read_range().await.unwrap(), 8000);
        assert_eq!(source.read_range().await.unwrap(), 8000);
    }

    #[tokio::test]
    async fn test_scripted_failure_entry() {
        let mut source = ScriptedRange::new(SensorId::Exit)
            .with_readings(&[200])
            .with_failure()
            .with_readings(&[210]);

        assert_eq!(source.read_range().await.unwrap(), 200);
        assert!(source.read_range().await.is_err());
        assert_eq!(source.read_range().await.unwrap(), 210);
    }
}
