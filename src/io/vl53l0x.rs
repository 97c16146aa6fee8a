//! VL53L0X single-shot ranging over Linux I2C
//!
//! Thin adapter only: the sensor is assumed booted and re-addressed already
//! (XSHUT sequencing and address assignment happen outside this process).
//! One `read_range` call triggers a single-shot measurement and reads the
//! result register, matching the vendor driver's simple ranging flow.

use crate::domain::{SensorError, SensorId};
use crate::io::sensor::RangeSource;
use async_trait::async_trait;
use i2cdev::core::I2CDevice;
use i2cdev::linux::LinuxI2CDevice;

// VL53L0X register map (subset)
const SYSRANGE_START: u8 = 0x00;
const RESULT_INTERRUPT_STATUS: u8 = 0x13;
const RESULT_RANGE_MM_HIGH: u8 = 0x1E;
const RESULT_RANGE_MM_LOW: u8 = 0x1F;
const SYSTEM_INTERRUPT_CLEAR: u8 = 0x0B;

/// Polls of the interrupt status register before a measurement is abandoned
const MAX_MEASUREMENT_POLLS: u32 = 100;

pub struct Vl53l0xRange {
    sensor: SensorId,
    device: LinuxI2CDevice,
}

impl Vl53l0xRange {
    /// Open the sensor at `address` on the given I2C bus device node
    pub fn open(sensor: SensorId, bus_path: &str, address: u8) -> Result<Self, SensorError> {
        let device = LinuxI2CDevice::new(bus_path, address as u16)
            .map_err(|e| SensorError::Bus { sensor, message: e.to_string() })?;
        Ok(Self { sensor, device })
    }

    fn bus_err(&self, e: impl std::fmt::Display) -> SensorError {
        SensorError::Bus { sensor: self.sensor, message: e.to_string() }
    }

    fn read_once(&mut self) -> Result<u16, SensorError> {
        // Trigger a single-shot measurement
        self.device
            .smbus_write_byte_data(SYSRANGE_START, 0x01)
            .map_err(|e| self.bus_err(e))?;

        // Wait for the data-ready interrupt flag
        let mut ready = false;
        for _ in 0..MAX_MEASUREMENT_POLLS {
            let status = self
                .device
                .smbus_read_byte_data(RESULT_INTERRUPT_STATUS)
                .map_err(|e| self.bus_err(e))?;
            if status & 0x07 != 0 {
                ready = true;
                break;
            }
            std::thread::sleep(std::time::Duration::from_micros(500));
        }
        if !ready {
            return Err(SensorError::Timeout { sensor: self.sensor });
        }

        let high = self
            .device
            .smbus_read_byte_data(RESULT_RANGE_MM_HIGH)
            .map_err(|e| self.bus_err(e))?;
        let low = self
            .device
            .smbus_read_byte_data(RESULT_RANGE_MM_LOW)
            .map_err(|e| self.bus_err(e))?;

        self.device
            .smbus_write_byte_data(SYSTEM_INTERRUPT_CLEAR, 0x01)
            .map_err(|e| self.bus_err(e))?;

        Ok(u16::from_be_bytes([high, low]))
    }
}

#[async_trait]
impl RangeSource for Vl53l0xRange {
    fn id(&self) -> SensorId {
        self.sensor
    }

    async fn read_range(&mut self) -> Result<u16, SensorError> {
        // Bounded blocking I2C transaction; short enough to run inline on the
        // poll loop (single-shot ranging completes within a few ms)
        self.read_once()
    }
}
