//! Shared types for the trafficmeter core

use chrono::{Local, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Which of the two sensors a reading came from.
///
/// The entry sensor is mounted nearer the doorway, the exit sensor farther
/// from it; their relative activation order determines crossing direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SensorId {
    Entry,
    Exit,
}

impl SensorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            SensorId::Entry => "entry",
            SensorId::Exit => "exit",
        }
    }
}

impl std::fmt::Display for SensorId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Calibrated traffic distance threshold window.
///
/// The inclusive distance range, in the sensors' line of sight, that covers
/// the physical doorway aperture. A reading inside the window means something
/// is standing in the pathway. Produced by calibration, read-only afterwards;
/// recalibration replaces the whole window at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TdtWindow {
    pub min_mm: u16,
    pub max_mm: u16,
}

impl TdtWindow {
    /// Build a window, normalizing bound order so `min_mm <= max_mm` always holds.
    pub fn new(min_mm: u16, max_mm: u16) -> Self {
        if min_mm <= max_mm {
            Self { min_mm, max_mm }
        } else {
            Self { min_mm: max_mm, max_mm: min_mm }
        }
    }

    /// Inclusive membership test, both ends.
    #[inline]
    pub fn contains(&self, distance_mm: u16) -> bool {
        self.min_mm <= distance_mm && distance_mm <= self.max_mm
    }

    /// Strict "has cleared the doorway" test. Entering the window is
    /// inclusive, but leaving it must be unambiguous.
    #[inline]
    pub fn cleared(&self, distance_mm: u16) -> bool {
        distance_mm > self.max_mm
    }
}

/// Per-sensor minimum stable range with an unobstructed scene.
///
/// Used only to sanity-bound calibration; the live decision path works off
/// [`TdtWindow`] exclusively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorBaseline {
    pub entry_mm: u16,
    pub exit_mm: u16,
}

/// Direction of a resolved crossing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum EventKind {
    Entry,
    Exit,
}

impl EventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Entry => "entry",
            EventKind::Exit => "exit",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A completed, directioned crossing. Handed to the sink once, then dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrafficEvent {
    pub kind: EventKind,
    pub date: NaiveDate,
    pub time: NaiveTime,
}

impl TrafficEvent {
    /// Stamp an event with the local wall clock.
    pub fn now(kind: EventKind) -> Self {
        let now = Local::now();
        Self { kind, date: now.date_naive(), time: now.time() }
    }

    /// Date key used by the sink for daily rotation (e.g. `2025-04-30`).
    pub fn date_key(&self) -> String {
        self.date.format("%Y-%m-%d").to_string()
    }
}

/// Owned entry/exit aggregate, returned from the run loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TrafficCounts {
    pub entries: u64,
    pub exits: u64,
}

impl TrafficCounts {
    pub fn record(&mut self, kind: EventKind) {
        match kind {
            EventKind::Entry => self.entries += 1,
            EventKind::Exit => self.exits += 1,
        }
    }

    pub fn total(&self) -> u64 {
        self.entries + self.exits
    }
}

/// A single range read failed. Aborts the current tick only; the resolver
/// state is left untouched and the read is retried next tick.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("{sensor} sensor bus error: {message}")]
    Bus { sensor: SensorId, message: String },
    #[error("{sensor} sensor measurement timed out")]
    Timeout { sensor: SensorId },
}

/// A resolved event could not be durably recorded. Propagated out of the run
/// loop; the event is neither silently dropped nor re-emitted.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("traffic log write failed: {0}")]
    Io(#[from] std::io::Error),
}
