//! Two-sensor direction resolution
//!
//! The resolver turns per-tick range readings from the entry and exit sensors
//! into directioned crossing events. A single sensor firing is never enough:
//! the sensor that activates first proposes a direction, and only a later
//! in-window reading from the *other* sensor confirms it. That two-step
//! requirement rejects people loitering in the hotzone between doorway and
//! sensors, and a decision is only made once the subject has left the window,
//! so dwell time cannot double-trigger.
//!
//! Everything is expressed as a single `step` transition function driven at
//! one fixed cadence by [`TrafficMonitor`]; there are no nested confirmation
//! loops, so shutdown and recalibration only ever observe a quiescent machine.

use crate::domain::{EventKind, SinkError, TdtWindow, TrafficCounts, TrafficEvent};
use crate::infra::Metrics;
use crate::io::sensor::RangeSource;
use crate::io::traffic_log::EventSink;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, info, trace, warn};

/// Resolver state. The deadline is armed when a candidate direction is
/// proposed and bounds how long confirmation may take.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Idle,
    AwaitingEntryConfirm { deadline: Instant },
    AwaitingExitConfirm { deadline: Instant },
}

impl ResolverState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolverState::Idle => "idle",
            ResolverState::AwaitingEntryConfirm { .. } => "awaiting_entry_confirm",
            ResolverState::AwaitingExitConfirm { .. } => "awaiting_exit_confirm",
        }
    }
}

/// The core state machine. Owns the only mutable state on the decision path;
/// every transition happens inside one `step` call, all-or-nothing.
#[derive(Debug)]
pub struct DirectionResolver {
    tdt: TdtWindow,
    event_timeout: Duration,
    reset_time: Duration,
    state: ResolverState,
    /// Dead-time gate after an emitted event; Idle accepts no new candidate
    /// until this instant has passed (one body, many limbs)
    reset_until: Option<Instant>,
}

impl DirectionResolver {
    pub fn new(tdt: TdtWindow, event_timeout: Duration, reset_time: Duration) -> Self {
        Self { tdt, event_timeout, reset_time, state: ResolverState::Idle, reset_until: None }
    }

    pub fn state(&self) -> ResolverState {
        self.state
    }

    pub fn tdt(&self) -> TdtWindow {
        self.tdt
    }

    /// Install a recalibrated window. Only valid while Idle; the whole window
    /// is swapped at once, never field by field.
    pub fn install_window(&mut self, tdt: TdtWindow) -> bool {
        if self.state == ResolverState::Idle {
            info!(min_mm = tdt.min_mm, max_mm = tdt.max_mm, "tdt_window_installed");
            self.tdt = tdt;
            true
        } else {
            warn!(state = self.state.as_str(), "tdt_window_rejected_not_idle");
            false
        }
    }

    /// Evaluate one tick. Both samples must already be captured; they are
    /// treated as logically simultaneous. Returns the emitted crossing, if any.
    pub fn step(&mut self, entry_mm: u16, exit_mm: u16, now: Instant) -> Option<EventKind> {
        match self.state {
            ResolverState::Idle => {
                if let Some(until) = self.reset_until {
                    if now < until {
                        return None;
                    }
                    self.reset_until = None;
                }

                // Entry takes priority when both fire in the same tick: the
                // sensor closest to the door activates first on a real entry
                if self.tdt.contains(entry_mm) {
                    let deadline = now + self.event_timeout;
                    self.state = ResolverState::AwaitingEntryConfirm { deadline };
                    debug!(entry_mm, "candidate_entry_armed");
                } else if self.tdt.contains(exit_mm) {
                    let deadline = now + self.event_timeout;
                    self.state = ResolverState::AwaitingExitConfirm { deadline };
                    debug!(exit_mm, "candidate_exit_armed");
                }
                None
            }
            ResolverState::AwaitingEntryConfirm { deadline } => {
                if self.tdt.contains(exit_mm) {
                    debug!(exit_mm, "entry_confirmed");
                    self.finish_event(now);
                    return Some(EventKind::Entry);
                }
                if now >= deadline && self.tdt.cleared(entry_mm) && self.tdt.cleared(exit_mm) {
                    // Stepped into the hotzone and back out without crossing
                    debug!(entry_mm, exit_mm, "candidate_entry_timed_out");
                    self.state = ResolverState::Idle;
                }
                None
            }
            ResolverState::AwaitingExitConfirm { deadline } => {
                if self.tdt.contains(entry_mm) {
                    debug!(entry_mm, "exit_confirmed");
                    self.finish_event(now);
                    return Some(EventKind::Exit);
                }
                if now >= deadline && self.tdt.cleared(entry_mm) && self.tdt.cleared(exit_mm) {
                    debug!(entry_mm, exit_mm, "candidate_exit_timed_out");
                    self.state = ResolverState::Idle;
                }
                None
            }
        }
    }

    fn finish_event(&mut self, now: Instant) {
        self.state = ResolverState::Idle;
        self.reset_until = Some(now + self.reset_time);
    }
}

/// Monitor loop failure: the sink refused a resolved event. The event is not
/// re-emitted; surfacing the loss is the caller's call.
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("failed to record {kind} event: {source}")]
    SinkWrite {
        kind: EventKind,
        #[source]
        source: SinkError,
    },
}

/// Fixed-cadence poll loop driving the resolver against two live sensors.
///
/// Single logical thread of control; one tick is fully evaluated before the
/// next starts, and shutdown is honored between ticks only.
pub struct TrafficMonitor<S: EventSink> {
    resolver: DirectionResolver,
    entry: Box<dyn RangeSource>,
    exit: Box<dyn RangeSource>,
    sink: S,
    poll_interval: Duration,
    counts: TrafficCounts,
    metrics: Arc<Metrics>,
}

impl<S: EventSink> TrafficMonitor<S> {
    pub fn new(
        resolver: DirectionResolver,
        entry: Box<dyn RangeSource>,
        exit: Box<dyn RangeSource>,
        sink: S,
        poll_interval: Duration,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { resolver, entry, exit, sink, poll_interval, counts: TrafficCounts::default(), metrics }
    }

    pub fn counts(&self) -> TrafficCounts {
        self.counts
    }

    /// Run until shutdown. Returns the final counts; a sink write failure
    /// aborts the loop with the event's identity in the error.
    pub async fn run(
        mut self,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<TrafficCounts, MonitorError> {
        info!(
            poll_interval_ms = %self.poll_interval.as_millis(),
            min_tdt_mm = self.resolver.tdt().min_mm,
            max_tdt_mm = self.resolver.tdt().max_mm,
            "traffic_monitor_started"
        );

        let mut poll_timer = interval(self.poll_interval);

        loop {
            tokio::select! {
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!(
                            entries = self.counts.entries,
                            exits = self.counts.exits,
                            "traffic_monitor_shutdown"
                        );
                        return Ok(self.counts);
                    }
                }
                _ = poll_timer.tick() => {}
            }

            self.metrics.record_tick();

            // Capture both samples before any transition decision. A failed
            // read degrades to "no decision this tick", never to a guessed
            // distance; state is untouched and the read retries next tick.
            let entry_mm = match self.entry.read_range().await {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "sensor_read_failed");
                    self.metrics.record_read_error();
                    continue;
                }
            };
            let exit_mm = match self.exit.read_range().await {
                Ok(d) => d,
                Err(e) => {
                    warn!(error = %e, "sensor_read_failed");
                    self.metrics.record_read_error();
                    continue;
                }
            };

            trace!(entry_mm, exit_mm, state = self.resolver.state().as_str(), "tick");

            let before = self.resolver.state();
            let now = Instant::now();
            let emitted = self.resolver.step(entry_mm, exit_mm, now);

            match emitted {
                Some(kind) => {
                    let event = TrafficEvent::now(kind);
                    // Durable before the loop proceeds; failure propagates
                    self.sink
                        .record(&event)
                        .await
                        .map_err(|source| MonitorError::SinkWrite { kind, source })?;
                    self.counts.record(kind);
                    match kind {
                        EventKind::Entry => self.metrics.record_entry(),
                        EventKind::Exit => self.metrics.record_exit(),
                    }
                    info!(
                        kind = %kind,
                        entries = self.counts.entries,
                        exits = self.counts.exits,
                        "crossing_recorded"
                    );
                }
                None => {
                    // Abandoned candidate: was awaiting, back to idle, nothing emitted
                    if before != ResolverState::Idle
                        && self.resolver.state() == ResolverState::Idle
                    {
                        self.metrics.record_timeout();
                    }
                }
            }
        }
    }
}
