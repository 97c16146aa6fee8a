//! Guided calibration of the TDT window and sensor baselines
//!
//! Both procedures sample at a fast micro-poll cadence over a short window and
//! keep the minimum distance observed. The minimum, not the mean: ToF readings
//! jitter by up to ±20 mm even against a static target, and biasing toward the
//! closest noise floor means the in-window test has no false negatives near
//! the boundary.
//!
//! Each window is bracketed by an operator-confirmation gate (place the
//! obstruction, confirm ready). The gate is a trait so automated tests can
//! pre-satisfy it. Calibration never fails hard: an interrupt ends the current
//! window early and whatever minimum has been observed is still returned, with
//! the interruption flagged for the caller to decide on.

use crate::domain::{SensorBaseline, TdtWindow};
use crate::io::sensor::{RangeSource, RANGE_CEILING_MM};
use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{info, warn};

/// Default micro-poll interval during calibration sampling
pub const CALIBRATION_POLL_INTERVAL: Duration = Duration::from_millis(10);
/// Default length of one calibration sampling window
pub const CALIBRATION_WINDOW: Duration = Duration::from_secs(3);

/// Operator readiness gate bracketing each sampling window.
///
/// Returns false to abort the pending window (the operator walked away, the
/// process is shutting down, stdin closed).
#[async_trait]
pub trait ReadyGate: Send {
    async fn wait_ready(&mut self, prompt: &str) -> bool;
}

/// Interactive gate: prints the prompt and waits for Enter on stdin
pub struct PromptGate;

#[async_trait]
impl ReadyGate for PromptGate {
    async fn wait_ready(&mut self, prompt: &str) -> bool {
        println!("{}", prompt);
        println!("Press Enter to start.");
        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        matches!(reader.read_line(&mut line).await, Ok(n) if n > 0)
    }
}

/// Always-ready gate for automated runs and tests
pub struct AutoReady;

#[async_trait]
impl ReadyGate for AutoReady {
    async fn wait_ready(&mut self, _prompt: &str) -> bool {
        true
    }
}

/// Outcome of one calibration procedure. Partial results are still results;
/// `interrupted` tells the caller the window was cut short.
#[derive(Debug, Clone, Copy)]
pub struct TdtCalibration {
    pub window: TdtWindow,
    pub interrupted: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct BaselineCalibration {
    pub baseline: SensorBaseline,
    pub interrupted: bool,
}

pub struct CalibrationEngine {
    poll_interval: Duration,
    window: Duration,
}

impl CalibrationEngine {
    pub fn new() -> Self {
        Self { poll_interval: CALIBRATION_POLL_INTERVAL, window: CALIBRATION_WINDOW }
    }

    /// Override the sampling cadence, for tests
    pub fn with_timing(window: Duration, poll_interval: Duration) -> Self {
        Self { poll_interval, window }
    }

    /// Sample every listed sensor for one window and return the minimum
    /// distance seen across all of them. Read errors skip the sample; an
    /// external shutdown ends the window early.
    async fn window_min(
        &self,
        sensors: &mut [&mut dyn RangeSource],
        shutdown: &mut watch::Receiver<bool>,
    ) -> (u16, bool) {
        let deadline = Instant::now() + self.window;
        let mut min_mm = RANGE_CEILING_MM;
        let mut interrupted = false;

        while Instant::now() < deadline {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        warn!("calibration_window_interrupted");
                        interrupted = true;
                        break;
                    }
                }
                _ = tokio::time::sleep(self.poll_interval) => {}
            }

            for sensor in sensors.iter_mut() {
                match sensor.read_range().await {
                    Ok(distance) => min_mm = min_mm.min(distance),
                    Err(e) => warn!(error = %e, "calibration_read_skipped"),
                }
            }
        }

        (min_mm, interrupted)
    }

    /// Calibrate the traffic distance threshold window.
    ///
    /// Two operator-gated windows: an obstruction at the near edge of the
    /// doorway gives `min_mm`, one at the far edge gives `max_mm`. A declined
    /// gate or an interrupt leaves that bound at the sensor ceiling and flags
    /// the result.
    pub async fn calibrate_tdt(
        &self,
        entry: &mut dyn RangeSource,
        exit: &mut dyn RangeSource,
        gate: &mut dyn ReadyGate,
        shutdown: &mut watch::Receiver<bool>,
    ) -> TdtCalibration {
        let mut interrupted = false;

        let min_mm = if gate
            .wait_ready(
                "Place an obstruction at the edge of the pathway closest to the sensors.",
            )
            .await
        {
            let (min_mm, cut_short) =
                self.window_min(&mut [&mut *entry, &mut *exit], shutdown).await;
            interrupted |= cut_short;
            min_mm
        } else {
            interrupted = true;
            RANGE_CEILING_MM
        };
        info!(min_mm, "tdt_near_edge_calibrated");

        let max_mm = if gate
            .wait_ready(
                "Place an obstruction at the edge of the pathway furthest from the sensors.",
            )
            .await
        {
            let (max_mm, cut_short) =
                self.window_min(&mut [&mut *entry, &mut *exit], shutdown).await;
            interrupted |= cut_short;
            max_mm
        } else {
            interrupted = true;
            RANGE_CEILING_MM
        };
        info!(max_mm, "tdt_far_edge_calibrated");

        TdtCalibration { window: TdtWindow::new(min_mm, max_mm), interrupted }
    }

    /// Calibrate per-sensor baselines against an unobstructed scene.
    ///
    /// Each sensor gets its own independent window; the order does not affect
    /// the other's result.
    pub async fn calibrate_baselines(
        &self,
        entry: &mut dyn RangeSource,
        exit: &mut dyn RangeSource,
        gate: &mut dyn ReadyGate,
        shutdown: &mut watch::Receiver<bool>,
    ) -> BaselineCalibration {
        if !gate
            .wait_ready("Clear any obstructions from the sensors' line of sight.")
            .await
        {
            return BaselineCalibration {
                baseline: SensorBaseline { entry_mm: RANGE_CEILING_MM, exit_mm: RANGE_CEILING_MM },
                interrupted: true,
            };
        }

        let (entry_mm, entry_cut) = self.window_min(&mut [&mut *entry], shutdown).await;
        info!(entry_mm, "entry_baseline_calibrated");

        let (exit_mm, exit_cut) = self.window_min(&mut [&mut *exit], shutdown).await;
        info!(exit_mm, "exit_baseline_calibrated");

        BaselineCalibration {
            baseline: SensorBaseline { entry_mm, exit_mm },
            interrupted: entry_cut || exit_cut,
        }
    }
}

impl Default for CalibrationEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SensorId;
    use crate::io::sensor::ScriptedRange;

    fn shutdown_channel() -> (watch::Sender<bool>, watch::Receiver<bool>) {
        watch::channel(false)
    }

    #[tokio::test(start_paused = true)]
    async fn test_tdt_takes_minimum_across_both_sensors() {
        // 50ms window at 10ms cadence: five reads per sensor per window
        let engine =
            CalibrationEngine::with_timing(Duration::from_millis(50), Duration::from_millis(10));
        let mut entry = ScriptedRange::new(SensorId::Entry)
            .with_readings(&[120, 95, 130, 95, 140]) // near edge window
            .with_readings(&[400, 410, 395, 400, 410]) // far edge window
            .with_idle(8000);
        let mut exit = ScriptedRange::new(SensorId::Exit)
            .with_readings(&[125, 110, 120, 115, 118])
            .with_readings(&[420, 405, 430, 415, 425])
            .with_idle(8000);
        let mut gate = AutoReady;
        let (_tx, mut shutdown) = shutdown_channel();

        let result = engine
            .calibrate_tdt(&mut entry, &mut exit, &mut gate, &mut shutdown)
            .await;

        assert!(!result.interrupted);
        assert_eq!(result.window.min_mm, 95);
        assert_eq!(result.window.max_mm, 395);
    }

    #[tokio::test(start_paused = true)]
    async fn test_baselines_are_independent_minima() {
        let engine =
            CalibrationEngine::with_timing(Duration::from_millis(30), Duration::from_millis(10));
        let mut entry = ScriptedRange::new(SensorId::Entry)
            .with_readings(&[820, 805, 815])
            .with_idle(8000);
        let mut exit = ScriptedRange::new(SensorId::Exit)
            .with_readings(&[790, 810, 800])
            .with_idle(8000);
        let mut gate = AutoReady;
        let (_tx, mut shutdown) = shutdown_channel();

        let result = engine
            .calibrate_baselines(&mut entry, &mut exit, &mut gate, &mut shutdown)
            .await;

        assert!(!result.interrupted);
        assert_eq!(result.baseline.entry_mm, 805);
        assert_eq!(result.baseline.exit_mm, 790);
    }

    #[tokio::test(start_paused = true)]
    async fn test_read_errors_are_skipped() {
        let engine =
            CalibrationEngine::with_timing(Duration::from_millis(30), Duration::from_millis(10));
        let mut entry = ScriptedRange::new(SensorId::Entry)
            .with_readings(&[500])
            .with_failure()
            .with_readings(&[480])
            .with_idle(8000);
        let mut exit = ScriptedRange::new(SensorId::Exit).with_idle(8000);
        let mut gate = AutoReady;
        let (_tx, mut shutdown) = shutdown_channel();

        let result = engine
            .calibrate_baselines(&mut entry, &mut exit, &mut gate, &mut shutdown)
            .await;

        assert_eq!(result.baseline.entry_mm, 480);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interrupt_returns_partial_result() {
        let engine =
            CalibrationEngine::with_timing(Duration::from_secs(60), Duration::from_millis(10));
        let mut entry =
            ScriptedRange::new(SensorId::Entry).with_readings(&[120, 95]).with_idle(8000);
        let mut exit = ScriptedRange::new(SensorId::Exit).with_readings(&[130, 118]).with_idle(8000);
        let mut gate = AutoReady;

        let (tx, mut shutdown) = watch::channel(false);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(25)).await;
            let _ = tx.send(true);
        });

        let result = engine
            .calibrate_tdt(&mut entry, &mut exit, &mut gate, &mut shutdown)
            .await;

        // Window cut short, but the minimum observed so far is kept
        assert!(result.interrupted);
        assert_eq!(result.window.min_mm, 95);
    }

    #[tokio::test(start_paused = true)]
    async fn test_declined_gate_degrades_to_ceiling() {
        struct NeverReady;
        #[async_trait]
        impl ReadyGate for NeverReady {
            async fn wait_ready(&mut self, _prompt: &str) -> bool {
                false
            }
        }

        let engine =
            CalibrationEngine::with_timing(Duration::from_millis(30), Duration::from_millis(10));
        let mut entry = ScriptedRange::new(SensorId::Entry).with_idle(8000);
        let mut exit = ScriptedRange::new(SensorId::Exit).with_idle(8000);
        let mut gate = NeverReady;
        let (_tx, mut shutdown) = shutdown_channel();

        let result = engine
            .calibrate_tdt(&mut entry, &mut exit, &mut gate, &mut shutdown)
            .await;

        assert!(result.interrupted);
        assert_eq!(result.window.min_mm, RANGE_CEILING_MM);
        assert_eq!(result.window.max_mm, RANGE_CEILING_MM);
    }
}
