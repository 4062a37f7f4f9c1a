//! Engine cycle counters.
//!
//! Fed by `ProcessCycleCompleted` and `WorkerCycleCompleted` events. Counting
//! only happens when diagnostics are enabled in the session config.

use std::time::{Duration, Instant};

use image_ar_core::TrackingEvent;
use log::debug;
use serde::Serialize;

const RATE_WINDOW: Duration = Duration::from_secs(1);

/// Running count and rate of one kind of cycle.
#[derive(Clone, Debug, Default)]
pub struct CycleCounter {
    total: u64,
    window_start: Option<Instant>,
    window_count: u64,
    rate_hz: f64,
}

impl CycleCounter {
    /// Record one cycle. Returns `true` when a rate window just closed.
    pub fn tick(&mut self, now: Instant) -> bool {
        self.total += 1;
        let start = *self.window_start.get_or_insert(now);
        self.window_count += 1;

        let elapsed = now.saturating_duration_since(start);
        if elapsed < RATE_WINDOW {
            return false;
        }
        self.rate_hz = self.window_count as f64 / elapsed.as_secs_f64();
        self.window_start = Some(now);
        self.window_count = 0;
        true
    }

    #[inline]
    pub fn total(&self) -> u64 {
        self.total
    }

    /// Rate over the last closed window, zero until one closes.
    #[inline]
    pub fn rate_hz(&self) -> f64 {
        self.rate_hz
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct DiagnosticsSnapshot {
    pub process_cycles: u64,
    pub worker_cycles: u64,
    pub process_rate_hz: f64,
    pub worker_rate_hz: f64,
}

#[derive(Clone, Debug, Default)]
pub struct Diagnostics {
    enabled: bool,
    process: CycleCounter,
    worker: CycleCounter,
}

impl Diagnostics {
    pub fn new(enabled: bool) -> Self {
        Self {
            enabled,
            ..Self::default()
        }
    }

    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn record(&mut self, event: &TrackingEvent) {
        self.record_at(event, Instant::now());
    }

    pub fn record_at(&mut self, event: &TrackingEvent, now: Instant) {
        if !self.enabled {
            return;
        }
        match event {
            TrackingEvent::ProcessCycleCompleted => {
                if self.process.tick(now) {
                    debug!(
                        "engine: {:.1} frames/s main, {:.1} frames/s worker",
                        self.process.rate_hz(),
                        self.worker.rate_hz()
                    );
                }
            }
            TrackingEvent::WorkerCycleCompleted => {
                self.worker.tick(now);
            }
            TrackingEvent::PoseUpdate { .. } => {}
        }
    }

    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            process_cycles: self.process.total(),
            worker_cycles: self.worker.total(),
            process_rate_hz: self.process.rate_hz(),
            worker_rate_hz: self.worker.rate_hz(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn disabled_diagnostics_count_nothing() {
        let mut diag = Diagnostics::new(false);
        diag.record(&TrackingEvent::ProcessCycleCompleted);
        assert_eq!(diag.snapshot(), DiagnosticsSnapshot::default());
    }

    #[test]
    fn rates_are_computed_per_window() {
        let mut diag = Diagnostics::new(true);
        let t0 = Instant::now();
        for i in 0..=30 {
            let now = t0 + Duration::from_millis(i * 50);
            diag.record_at(&TrackingEvent::ProcessCycleCompleted, now);
            if i % 3 == 0 {
                diag.record_at(&TrackingEvent::WorkerCycleCompleted, now);
            }
        }
        diag.record_at(&TrackingEvent::pose(0, None), t0);

        let snap = diag.snapshot();
        assert_eq!(snap.process_cycles, 31);
        assert_eq!(snap.worker_cycles, 11);
        // 21 cycles in the first 1 s window, 10 more after it closed
        assert_relative_eq!(snap.process_rate_hz, 21.0);
        // worker window closes on its 8th cycle, at 1.05 s
        assert_relative_eq!(snap.worker_rate_hz, 8.0 / 1.05, epsilon = 1e-9);
    }
}
