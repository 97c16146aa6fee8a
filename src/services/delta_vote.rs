//! Single-sensor direction heuristic (fallback)
//!
//! With only one angled sensor, direction can be estimated from the shape of
//! a pass's distance trace: someone walking in appears far away and closes in
//! on the sensor, someone walking out pops up close and recedes. Rounding to
//! centimeters washes out millimeter jitter; a majority vote over consecutive
//! deltas then picks the direction.
//!
//! This is a documented fallback for single-sensor deployments. The two-sensor
//! TDT-ordering resolver is authoritative and does not use it.

use crate::domain::EventKind;

/// Classify one tracked pass from its millimeter distance trace.
///
/// Returns `None` when the trace is too short or the vote ties (as many
/// approach deltas as departure deltas).
pub fn classify(distances_mm: &[u16]) -> Option<EventKind> {
    if distances_mm.len() < 2 {
        return None;
    }

    // mm -> cm, rounded: sub-centimeter wobble must not cast votes
    let cm: Vec<i32> = distances_mm.iter().map(|d| (i32::from(*d) + 5) / 10).collect();

    let mut approach = 0u32;
    let mut departure = 0u32;
    for pair in cm.windows(2) {
        let delta = pair[1] - pair[0];
        if delta < 0 {
            approach += 1;
        } else if delta > 0 {
            departure += 1;
        }
    }

    match approach.cmp(&departure) {
        std::cmp::Ordering::Greater => Some(EventKind::Entry),
        std::cmp::Ordering::Less => Some(EventKind::Exit),
        std::cmp::Ordering::Equal => None,
    }
}
